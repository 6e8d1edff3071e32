//! # cheat-triage
//!
//! Host-based forensic triage scanner that hunts for evidence of
//! third-party cheat software on a Windows machine, for use by
//! game-server moderators during player audits.
//!
//! ## Overview
//!
//! A scan runs ~a dozen independent probes (filesystem walks, registry
//! exports, the live process table, browser history databases,
//! execution-history caches and virtualization indicators) and
//! aggregates their findings into one report. Probes run concurrently in
//! bounded groups, each wrapped with a deadline; a failing, timing-out or
//! cancelled probe yields a failed result without disturbing its
//! siblings. Each invocation is stateless: nothing is persisted between
//! runs except the reports written at the end.
//!
//! ## Usage
//!
//! ```no_run
//! use cheat_triage::config::ScanConfig;
//! use cheat_triage::scan::orchestrator::{run_scan_to_completion, ScanEngine};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = ScanEngine::new(ScanConfig::default());
//! let results = run_scan_to_completion(&engine, None).await?;
//! println!("{} probes finished", results.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Core data models (findings, results, progress events)
//! - [`keywords`]: Word-boundary keyword matching engine
//! - [`exec`]: Bounded external command execution
//! - [`decode`]: Artifact decoders (FILETIME, VDF, browser epochs,
//!   device paths, DNS cache text, registry exports, CSV)
//! - [`scan`]: Probe contract, concrete probes and the orchestrator
//! - [`config`]: Configuration loading, validation and defaults
//! - [`utils`]: Report rendering and locked-file snapshots
//! - [`error`]: Scan error taxonomy
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models used throughout the application
pub mod models;

/// Word-boundary keyword matching engine
pub mod keywords;

/// Bounded execution of external OS commands
pub mod exec;

/// Artifact decoders for binary and proprietary text formats
pub mod decode;

/// Probe contract, concrete probes and scan orchestration
pub mod scan;

/// Configuration management and defaults
pub mod config;

/// Report rendering and file snapshot helpers
pub mod utils;

/// Scan error taxonomy
pub mod error;

/// Application constants and configuration values
pub mod constants;
