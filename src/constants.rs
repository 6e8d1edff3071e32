//! Global constants for the cheat-triage scanner.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Process executor constants
/// Maximum OS child processes in flight across the whole scan
pub const MAX_CONCURRENT_PROCESSES: usize = 15;

/// Default per-command timeout in seconds
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 20;

/// Default cap on captured command output (4MB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 4 * 1024 * 1024;

// Snapshot retry constants
/// Maximum attempts when copying a possibly-locked database
pub const SNAPSHOT_MAX_ATTEMPTS: usize = 3;

/// Base backoff delay between snapshot attempts in milliseconds (doubles each retry)
pub const SNAPSHOT_BASE_DELAY_MS: u64 = 100;

// Orchestration constants
/// Concurrency cap for the filesystem-bound probe group
pub const FILESYSTEM_GROUP_CONCURRENCY: usize = 5;

/// Concurrency cap for the registry-bound probe group
pub const REGISTRY_GROUP_CONCURRENCY: usize = 4;

/// Concurrency cap for the process/browser-bound probe group
pub const PROCESS_GROUP_CONCURRENCY: usize = 2;

/// Deadline for a single filesystem-bound probe in seconds
pub const FILESYSTEM_PROBE_DEADLINE_SECS: u64 = 60;

/// Deadline for a single registry-bound probe in seconds
pub const REGISTRY_PROBE_DEADLINE_SECS: u64 = 30;

/// Deadline for a single process/browser-bound probe in seconds
pub const PROCESS_PROBE_DEADLINE_SECS: u64 = 45;

/// Minimum interval between progress events for one probe in milliseconds
pub const PROGRESS_MIN_INTERVAL_MS: u64 = 200;

/// Capacity of the progress event channel; events beyond this are dropped
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Directory entries walked between progress emissions
pub const WALK_PROGRESS_STRIDE: usize = 64;

// Timestamp constants
/// FILETIME ticks (100ns) between 1601-01-01 and 1970-01-01
pub const FILETIME_UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

/// Microseconds between 1601-01-01 and 1970-01-01 (Chromium epoch offset)
pub const CHROMIUM_UNIX_EPOCH_MICROS: i64 = 11_644_473_600_000_000;

/// Lower bound of the timestamp sanity window (2000-01-01 UTC, Unix ms)
pub const TIMESTAMP_SANITY_MIN_MS: i64 = 946_684_800_000;

/// Upper bound of the timestamp sanity window (2100-01-01 UTC, Unix ms)
pub const TIMESTAMP_SANITY_MAX_MS: i64 = 4_102_444_800_000;

// Steam constants
/// Fixed prefix of a 64-bit Steam community id
pub const STEAM_ID_PREFIX: &str = "7656";

/// Digit count of a 64-bit Steam community id
pub const STEAM_ID_LEN: usize = 17;

// Evidence scoring constants
/// Independent indicator categories required before a virtualization
/// product is reported
pub const VM_MIN_INDICATOR_CATEGORIES: usize = 2;

// Default scan settings
/// Default recency window for time-bearing findings in days
pub const DEFAULT_RECENCY_DAYS: i64 = 30;

/// Directory names skipped by the walker regardless of configuration
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "windows.old",
    "winsxs",
    "$recycle.bin",
    "system volume information",
    "node_modules",
];

/// Extensions considered executable artifacts during filesystem walks
pub const DEFAULT_EXECUTABLE_EXTENSIONS: &[&str] =
    &["exe", "dll", "bat", "cmd", "ps1", "jar", "ahk", "lua"];

// Report constants
/// Name of the flat human-readable report file
pub const REPORT_TEXT_NAME: &str = "triage-report.txt";

/// Name of the structured JSON mirror of the report
pub const REPORT_JSON_NAME: &str = "triage-report.json";
