//! Scan report generation.
//!
//! Two derived views of the same result list: a flat human-readable
//! report grouping findings by probe, and a structured JSON mirror for
//! tooling. Neither is authoritative; the `ScanResult` list is.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::constants::{REPORT_JSON_NAME, REPORT_TEXT_NAME};
use crate::models::ScanResult;

/// Render the flat human-readable report.
pub fn create_text_report(hostname: &str, timestamp: &str, results: &[ScanResult]) -> String {
    let total_findings: usize = results.iter().map(|r| r.finding_count).sum();
    let failed: usize = results.iter().filter(|r| !r.success).count();

    let mut out = String::new();
    out.push_str(&format!("Cheat triage report for {hostname}\n"));
    out.push_str(&format!("Generated: {timestamp}\n"));
    out.push_str(&format!(
        "Probes: {} ({} failed)    Findings: {}\n",
        results.len(),
        failed,
        total_findings
    ));
    out.push_str(&"=".repeat(60));
    out.push('\n');

    for result in results {
        out.push_str(&format!(
            "\n{}: {} finding(s), {} ms{}\n",
            result.probe,
            result.finding_count,
            result.duration_ms,
            if result.success { "" } else { " [FAILED]" }
        ));
        if let Some(error) = &result.error {
            out.push_str(&format!("  error: {error}\n"));
        }
        for finding in &result.findings {
            out.push_str(&format!("  {finding}\n"));
        }
        if result.findings.is_empty() && result.success {
            out.push_str("  (nothing found)\n");
        }
    }
    out
}

/// Render the structured JSON mirror of the report.
pub fn create_json_report(hostname: &str, timestamp: &str, results: &[ScanResult]) -> Result<String> {
    let summary = json!({
        "scan_id": Uuid::new_v4().to_string(),
        "hostname": hostname,
        "generated_at": timestamp,
        "scanner_version": env!("CARGO_PKG_VERSION"),
        "probe_count": results.len(),
        "finding_count": results.iter().map(|r| r.finding_count).sum::<usize>(),
        "results": results,
    });
    serde_json::to_string_pretty(&summary).context("Failed to serialize scan report to JSON")
}

/// Write both report forms into `dir`, returning their paths.
pub fn write_reports(
    dir: &Path,
    hostname: &str,
    timestamp: &str,
    results: &[ScanResult],
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).context("Failed to create report directory")?;

    let text_path = dir.join(REPORT_TEXT_NAME);
    std::fs::write(&text_path, create_text_report(hostname, timestamp, results))
        .context(format!("Failed to write {}", text_path.display()))?;

    let json_path = dir.join(REPORT_JSON_NAME);
    std::fs::write(&json_path, create_json_report(hostname, timestamp, results)?)
        .context(format!("Failed to write {}", json_path.display()))?;

    Ok((text_path, json_path))
}
