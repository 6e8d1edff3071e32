//! Core data models shared between probes, orchestrator and report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single piece of evidence, tagged with the probe that produced it.
///
/// Findings are terminal, display-only artifacts: created by a probe,
/// owned by the run's `ScanResult`, never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Finding(String);

impl Finding {
    /// Build a `[Source] detail` finding.
    pub fn new(source: &str, detail: impl AsRef<str>) -> Self {
        Finding(format!("[{}] {}", source, detail.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Concurrency group a probe is scheduled in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanGroup {
    /// Disk-walking probes (filesystem, prefetch, recent items, Steam).
    Filesystem,
    /// Probes driven by `reg query` and similar registry exports.
    Registry,
    /// Process-table, browser-database and DNS-cache probes.
    Process,
}

impl ScanGroup {
    pub const ALL: [ScanGroup; 3] = [ScanGroup::Filesystem, ScanGroup::Registry, ScanGroup::Process];
}

/// Terminal outcome of one probe invocation.
///
/// Created once when the probe completes (success, failure, cancellation
/// or timeout) and immutable thereafter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScanResult {
    pub probe: String,
    pub success: bool,
    pub findings: Vec<Finding>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub finding_count: usize,
}

impl ScanResult {
    /// Assemble a result from a finished probe invocation.
    pub fn finished(
        probe: &str,
        findings: Vec<Finding>,
        error: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let ended_at = Utc::now();
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        let finding_count = findings.len();
        ScanResult {
            probe: probe.to_string(),
            success: error.is_none(),
            findings,
            error,
            started_at,
            ended_at,
            duration_ms,
            finding_count,
        }
    }
}

/// Ephemeral, high-frequency progress event. Forwarded, never persisted.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScanProgress {
    pub probe: String,
    pub current: usize,
    pub total: usize,
    pub current_item: String,
    pub percent: u8,
}

impl ScanProgress {
    pub fn new(probe: &str, current: usize, total: usize, current_item: impl Into<String>) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((current.min(total) * 100) / total) as u8
        };
        ScanProgress {
            probe: probe.to_string(),
            current,
            total,
            current_item: current_item.into(),
            percent,
        }
    }
}
