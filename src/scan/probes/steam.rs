//! Steam probe.
//!
//! Three artifacts: the known accounts in `loginusers.vdf`, the library
//! roots in `libraryfolders.vdf`, and a keyword walk over each library's
//! `steamapps\common` directory. The Steam root comes from the registry,
//! with the stock install paths as fallback.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::debug;

use crate::decode::reg_text::parse_reg_query;
use crate::decode::vdf::{parse_library_folders, parse_login_users};
use crate::error::ScanError;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::walker::{walk_matches, WalkSpec};
use crate::scan::Scanner;

const STEAM_REG_KEY: &str = "HKCU\\Software\\Valve\\Steam";
const STEAM_DEFAULT_ROOTS: &[&str] = &[
    "C:\\Program Files (x86)\\Steam",
    "C:\\Program Files\\Steam",
];
const LIBRARY_WALK_DEPTH: usize = 3;

pub struct SteamProbe;

impl SteamProbe {
    /// Locate the Steam root via `HKCU\Software\Valve\Steam\SteamPath`,
    /// falling back to the stock install locations.
    async fn discover_root(&self, ctx: &ScanContext) -> Option<PathBuf> {
        match ctx.executor.run("reg", &["query", STEAM_REG_KEY, "/v", "SteamPath"]).await {
            Ok(output) => {
                for value in parse_reg_query(&output) {
                    if value.name.eq_ignore_ascii_case("SteamPath") && !value.data.is_empty() {
                        let path = PathBuf::from(value.data.replace('/', "\\"));
                        if path.is_dir() {
                            return Some(path);
                        }
                    }
                }
            }
            Err(e) => debug!("steam registry lookup failed: {e}"),
        }
        STEAM_DEFAULT_ROOTS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_dir())
    }

    async fn scan_root(
        &self,
        ctx: &ScanContext,
        out: &mut FindingSink,
        root: &Path,
    ) -> Result<(), ScanError> {
        ctx.check_cancelled()?;
        out.progress(0, 0, &root.display().to_string());

        self.report_accounts(out, root);
        let libraries = self.library_paths(root);

        for (i, library) in libraries.iter().enumerate() {
            ctx.check_cancelled()?;
            out.progress(i, libraries.len(), &library.display().to_string());

            let common = library.join("steamapps").join("common");
            if !common.is_dir() {
                continue;
            }
            let spec = WalkSpec::from_settings(ctx, common, LIBRARY_WALK_DEPTH);
            walk_matches(&spec, ctx, out).await?;
        }
        Ok(())
    }

    /// Emit one finding per account recorded in `loginusers.vdf`.
    fn report_accounts(&self, out: &mut FindingSink, root: &Path) {
        let login_path = root.join("config").join("loginusers.vdf");
        let Ok(text) = std::fs::read_to_string(&login_path) else {
            debug!("no loginusers.vdf under {}", root.display());
            return;
        };
        for account in parse_login_users(&text) {
            let persona = account
                .persona_name
                .as_deref()
                .map(|p| format!(" \"{p}\""))
                .unwrap_or_default();
            let last_login = account
                .timestamp
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .map(|dt| format!(", last login {}", dt.format("%Y-%m-%d")))
                .unwrap_or_default();
            out.push(format!(
                "account {} ({}){}{}{}",
                account.account_name,
                account.steam_id,
                persona,
                last_login,
                if account.remember_password {
                    ", password remembered"
                } else {
                    ""
                }
            ));
        }
    }

    /// Library roots from `libraryfolders.vdf`, always including the
    /// Steam root itself.
    fn library_paths(&self, root: &Path) -> Vec<PathBuf> {
        let mut paths = vec![root.to_path_buf()];
        for candidate in [
            root.join("config").join("libraryfolders.vdf"),
            root.join("steamapps").join("libraryfolders.vdf"),
        ] {
            if let Ok(text) = std::fs::read_to_string(&candidate) {
                for p in parse_library_folders(&text) {
                    let path = PathBuf::from(p);
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
                break;
            }
        }
        paths
    }
}

#[async_trait]
impl Scanner for SteamProbe {
    fn name(&self) -> &'static str {
        "Steam"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Filesystem
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        let Some(root) = self.discover_root(ctx).await else {
            debug!("no Steam installation found");
            return Ok(());
        };
        self.scan_root(ctx, out, &root).await
    }
}
