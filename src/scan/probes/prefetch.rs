//! Prefetch probe.
//!
//! Windows records one `NAME-HASH.pf` file per executed binary under
//! `C:\Windows\Prefetch`. The executable name is recovered from the
//! filename convention; the file's modified time approximates the last
//! run and is checked against the recency window.

use std::path::Path;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::decode::filetime::format_unix_ms;
use crate::error::ScanError;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

const PREFETCH_DIR: &str = "C:\\Windows\\Prefetch";

lazy_static! {
    /// `NAME-HASH.pf` with an 8-hex-digit hash.
    static ref PF_NAME: Regex =
        Regex::new(r"^(?P<exe>.+)-(?P<hash>[0-9A-Fa-f]{8})$").expect("static regex");
}

/// Executable name encoded in a prefetch file stem, if it follows the
/// convention.
pub fn executable_from_pf_stem(stem: &str) -> Option<&str> {
    PF_NAME
        .captures(stem)
        .and_then(|c| c.name("exe"))
        .map(|m| m.as_str())
}

pub struct PrefetchProbe;

impl PrefetchProbe {
    async fn scan_dir(
        &self,
        ctx: &ScanContext,
        out: &mut FindingSink,
        dir: &Path,
    ) -> Result<(), ScanError> {
        if !dir.is_dir() {
            debug!("prefetch directory {} not readable, skipping", dir.display());
            return Ok(());
        }
        let entries =
            std::fs::read_dir(dir).map_err(|e| ScanError::io(dir.display().to_string(), e))?;
        let cutoff = ctx.settings.recency_cutoff_ms();

        for (i, entry) in entries.flatten().enumerate() {
            ctx.check_cancelled()?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            out.progress(i, 0, &name);

            if !name.to_lowercase().ends_with(".pf") {
                continue;
            }
            let stem = &name[..name.len() - 3];
            let Some(exe) = executable_from_pf_stem(stem) else {
                continue;
            };
            let Some(keyword) = ctx.matcher.find_keyword(exe) else {
                continue;
            };

            let last_run_ms = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64);

            match last_run_ms {
                Some(ms) if ms < cutoff => continue,
                Some(ms) => out.push(format!(
                    "{} last run {} (keyword: {})",
                    path.display(),
                    format_unix_ms(ms),
                    keyword
                )),
                None => out.push(format!("{} (keyword: {})", path.display(), keyword)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Scanner for PrefetchProbe {
    fn name(&self) -> &'static str {
        "Prefetch"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Filesystem
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        self.scan_dir(ctx, out, Path::new(PREFETCH_DIR)).await
    }
}
