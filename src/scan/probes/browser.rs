//! Browser history probe.
//!
//! Chrome/Edge (Chromium schema) and Firefox (places schema) keep their
//! history in SQLite databases that are locked while the browser runs.
//! Each database is snapshotted with the retrying copy, opened read-only,
//! and its history and downloads rows keyword-matched within the recency
//! window. A database that cannot be snapshotted or read is logged and
//! skipped; one broken browser must not cost the findings from the
//! others.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use rusqlite::{Connection, OpenFlags};
use uuid::Uuid;

use crate::config::expand_windows_env_vars;
use crate::decode::browser_time::{chromium_us_to_unix_ms, firefox_us_to_unix_ms};
use crate::decode::filetime::format_unix_ms;
use crate::error::ScanError;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;
use crate::utils::snapshot::snapshot_file;

const HISTORY_ROW_LIMIT: usize = 5000;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chromium,
    Firefox,
}

struct BrowserDb {
    label: &'static str,
    kind: BrowserKind,
    path: PathBuf,
}

/// One matched row ready for display.
#[derive(Debug)]
pub struct HistoryHit {
    pub text: String,
    pub keyword: String,
    pub time_ms: Option<i64>,
}

fn candidate_dbs() -> Vec<BrowserDb> {
    let mut dbs = vec![
        BrowserDb {
            label: "Chrome",
            kind: BrowserKind::Chromium,
            path: PathBuf::from(expand_windows_env_vars(
                "%LOCALAPPDATA%\\Google\\Chrome\\User Data\\Default\\History",
            )),
        },
        BrowserDb {
            label: "Edge",
            kind: BrowserKind::Chromium,
            path: PathBuf::from(expand_windows_env_vars(
                "%LOCALAPPDATA%\\Microsoft\\Edge\\User Data\\Default\\History",
            )),
        },
    ];

    // Firefox: one places.sqlite per profile directory
    let profiles = PathBuf::from(expand_windows_env_vars(
        "%APPDATA%\\Mozilla\\Firefox\\Profiles",
    ));
    if let Ok(entries) = std::fs::read_dir(&profiles) {
        for entry in entries.flatten() {
            let places = entry.path().join("places.sqlite");
            if places.is_file() {
                dbs.push(BrowserDb {
                    label: "Firefox",
                    kind: BrowserKind::Firefox,
                    path: places,
                });
            }
        }
    }
    dbs
}

/// Scan one database snapshot for keyword hits.
///
/// Rows without a decodable timestamp are kept; rows older than `cutoff`
/// are dropped.
pub fn scan_history_db(
    path: &Path,
    kind: BrowserKind,
    ctx: &ScanContext,
    cutoff_ms: i64,
) -> Result<Vec<HistoryHit>, ScanError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| ScanError::parse(path.display().to_string(), e.to_string()))?;

    let mut hits = Vec::new();
    match kind {
        BrowserKind::Chromium => {
            collect_rows(
                &conn,
                "SELECT url, title, last_visit_time FROM urls ORDER BY last_visit_time DESC",
                chromium_us_to_unix_ms,
                ctx,
                cutoff_ms,
                &mut hits,
            )?;
            // Old snapshots may predate the downloads table; absence is
            // not an error
            if let Err(e) = collect_rows(
                &conn,
                "SELECT target_path, tab_url, start_time FROM downloads ORDER BY start_time DESC",
                chromium_us_to_unix_ms,
                ctx,
                cutoff_ms,
                &mut hits,
            ) {
                debug!("downloads table unavailable in {}: {e}", path.display());
            }
        }
        BrowserKind::Firefox => {
            collect_rows(
                &conn,
                "SELECT url, title, last_visit_date FROM moz_places WHERE url IS NOT NULL ORDER BY last_visit_date DESC",
                firefox_us_to_unix_ms,
                ctx,
                cutoff_ms,
                &mut hits,
            )?;
        }
    }
    Ok(hits)
}

fn collect_rows(
    conn: &Connection,
    sql: &str,
    to_unix_ms: fn(i64) -> Option<i64>,
    ctx: &ScanContext,
    cutoff_ms: i64,
    hits: &mut Vec<HistoryHit>,
) -> Result<(), ScanError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ScanError::parse("browser db", e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let primary: Option<String> = row.get(0)?;
            let secondary: Option<String> = row.get(1)?;
            let raw_time: Option<i64> = row.get(2)?;
            Ok((primary, secondary, raw_time))
        })
        .map_err(|e| ScanError::parse("browser db", e.to_string()))?;

    for row in rows.take(HISTORY_ROW_LIMIT) {
        let Ok((primary, secondary, raw_time)) = row else {
            continue;
        };
        let primary = primary.unwrap_or_default();
        let secondary = secondary.unwrap_or_default();

        let keyword = ctx
            .matcher
            .find_keyword(&primary)
            .or_else(|| ctx.matcher.find_keyword(&secondary));
        let Some(keyword) = keyword else { continue };

        let time_ms = raw_time.and_then(to_unix_ms);
        if let Some(ms) = time_ms {
            if ms < cutoff_ms {
                continue;
            }
        }
        hits.push(HistoryHit {
            text: if secondary.is_empty() {
                primary
            } else {
                format!("{primary} ({secondary})")
            },
            keyword: keyword.to_string(),
            time_ms,
        });
    }
    Ok(())
}

pub struct BrowserHistoryProbe;

#[async_trait]
impl Scanner for BrowserHistoryProbe {
    fn name(&self) -> &'static str {
        "BrowserHistory"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Process
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        let dbs = candidate_dbs();
        let cutoff = ctx.settings.recency_cutoff_ms();
        let total = dbs.len();

        for (i, db) in dbs.iter().enumerate() {
            ctx.check_cancelled()?;
            out.progress(i, total, &db.path.display().to_string());

            if !db.path.is_file() {
                continue;
            }
            let snapshot = std::env::temp_dir().join(format!("triage-{}.sqlite", Uuid::new_v4()));
            if let Err(e) = snapshot_file(&db.path, &snapshot).await {
                warn!("could not snapshot {} history: {e}", db.label);
                continue;
            }

            match scan_history_db(&snapshot, db.kind, ctx, cutoff) {
                Ok(hits) => {
                    for hit in hits {
                        let when = hit
                            .time_ms
                            .map(|ms| format!(" at {}", format_unix_ms(ms)))
                            .unwrap_or_default();
                        out.push(format!(
                            "{}: {}{} (keyword: {})",
                            db.label, hit.text, when, hit.keyword
                        ));
                    }
                }
                Err(e) => warn!("could not read {} history: {e}", db.label),
            }
            let _ = std::fs::remove_file(&snapshot);
            tokio::task::yield_now().await;
        }
        out.progress(total, total, "");
        Ok(())
    }
}
