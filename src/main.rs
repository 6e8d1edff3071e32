use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod cli;
mod config;
mod constants;
mod decode;
mod error;
mod exec;
mod keywords;
mod models;
mod scan;
mod utils;

use cli::Args;
use config::ScanConfig;
use scan::probes::probe_catalog;
use scan::ScanEngine;
use utils::report;

fn main() -> Result<()> {
    let args = Args::parse();
    initialize_logging(args.verbose)?;

    if args.list_probes {
        return list_probes();
    }
    if let Some(path) = &args.init_config {
        info!("Writing default configuration to {}", path.display());
        ScanConfig::default().save_to_yaml_file(path)?;
        return Ok(());
    }

    info!("Starting cheat triage scan");
    let config = ScanConfig::load_or_default(args.config.as_deref());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    let results = runtime.block_on(run_scan(&args, config))?;

    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let timestamp = Utc::now().to_rfc3339();

    if args.json {
        println!("{}", report::create_json_report(&hostname, &timestamp, &results)?);
    } else {
        let output_dir = output_directory(&args, &hostname);
        let (text_path, json_path) =
            report::write_reports(&output_dir, &hostname, &timestamp, &results)?;
        info!("Report written to {}", text_path.display());
        info!("JSON mirror written to {}", json_path.display());
    }

    let findings: usize = results.iter().map(|r| r.finding_count).sum();
    let failed = results.iter().filter(|r| !r.success).count();
    info!(
        "Scan complete: {} probe(s), {} failed, {} finding(s)",
        results.len(),
        failed,
        findings
    );
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

fn list_probes() -> Result<()> {
    println!("Available probes:");
    for (name, group) in probe_catalog() {
        println!("  {name:<16} {group:?} group");
    }
    Ok(())
}

/// Drive one scan run, printing progress as it streams in.
async fn run_scan(args: &Args, config: ScanConfig) -> Result<Vec<models::ScanResult>> {
    let engine = ScanEngine::new(config);
    let filter = args.probe_filter();
    let mut handle = engine
        .start(filter.as_deref())
        .context("Failed to start scan")?;

    // Ctrl-C maps onto the same cooperative cancellation the UI uses
    let cancel_token = handle.cancel_token();
    let mut cancel_requested = false;

    loop {
        tokio::select! {
            event = handle.progress.recv() => {
                match event {
                    Some(p) => {
                        if !p.current_item.is_empty() {
                            info!("[{:>3}%] {} {}", p.percent, p.probe, p.current_item);
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                warn!("Cancellation requested, stopping in-flight probes");
                cancel_token.cancel();
                cancel_requested = true;
            }
        }
    }

    Ok(handle.join().await)
}

fn output_directory(args: &Args, hostname: &str) -> PathBuf {
    if let Some(dir) = &args.output {
        return dir.clone();
    }
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    std::env::temp_dir().join(format!("triage-{hostname}-{stamp}"))
}
