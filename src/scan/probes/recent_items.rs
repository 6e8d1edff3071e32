//! Recent-items probe.
//!
//! Explorer keeps one `.lnk` shortcut per recently opened item under
//! `%APPDATA%\Microsoft\Windows\Recent`. The shortcut stem carries the
//! target's name (often with its extension), which is enough for
//! keyword matching without parsing the shortcut binary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::config::expand_windows_env_vars;
use crate::error::ScanError;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

const RECENT_DIR: &str = "%APPDATA%\\Microsoft\\Windows\\Recent";

pub struct RecentItemsProbe;

impl RecentItemsProbe {
    fn recent_dir() -> PathBuf {
        PathBuf::from(expand_windows_env_vars(RECENT_DIR))
    }

    async fn scan_dir(
        &self,
        ctx: &ScanContext,
        out: &mut FindingSink,
        dir: &Path,
    ) -> Result<(), ScanError> {
        if !dir.is_dir() {
            debug!("recent items directory {} not readable, skipping", dir.display());
            return Ok(());
        }
        let entries =
            std::fs::read_dir(dir).map_err(|e| ScanError::io(dir.display().to_string(), e))?;

        for (i, entry) in entries.flatten().enumerate() {
            ctx.check_cancelled()?;
            let name = entry.file_name().to_string_lossy().to_string();
            out.progress(i, 0, &name);

            let lower = name.to_lowercase();
            if !lower.ends_with(".lnk") {
                continue;
            }
            // "cheat.exe.lnk" -> "cheat.exe"
            let stem = &name[..name.len() - 4];
            if let Some(keyword) = ctx.matcher.find_keyword(stem) {
                out.push(format!(
                    "{} (keyword: {})",
                    entry.path().display(),
                    keyword
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Scanner for RecentItemsProbe {
    fn name(&self) -> &'static str {
        "RecentItems"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Filesystem
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        self.scan_dir(ctx, out, &Self::recent_dir()).await
    }
}
