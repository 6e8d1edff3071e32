//! Per-run orchestration context.
//!
//! One `ScanContext` is constructed at scan start and passed to every
//! probe. It carries the read-only settings and keyword matcher, the
//! shared process executor, the cancellation token, and the only piece
//! of lazily-built shared state: the drive map. A fresh context per run
//! replaces any module-level singletons and resets probe state between
//! runs.

use log::debug;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::config::{RegistryTarget, ScanConfig, ScanSettings};
use crate::decode::device_path::{DriveMap, DRIVE_QUERY_SCRIPT};
use crate::error::ScanError;
use crate::exec::BoundedExecutor;
use crate::keywords::KeywordMatcher;

pub struct ScanContext {
    pub settings: ScanSettings,
    pub matcher: KeywordMatcher,
    pub registry_targets: Vec<RegistryTarget>,
    pub executor: BoundedExecutor,
    cancel: CancellationToken,
    drive_map: OnceCell<DriveMap>,
}

impl ScanContext {
    pub fn new(config: &ScanConfig) -> Self {
        let matcher = KeywordMatcher::new(&config.keywords.substrings, &config.keywords.exact);
        ScanContext {
            settings: config.settings.clone(),
            matcher,
            registry_targets: config.registry_targets.clone(),
            executor: BoundedExecutor::default(),
            cancel: CancellationToken::new(),
            drive_map: OnceCell::new(),
        }
    }

    /// Ask every in-flight probe to stop at its next polling point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Loop-boundary cancellation check.
    pub fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancelled() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Volume→letter map, built on first use and cached for the run.
    pub async fn drive_map(&self) -> &DriveMap {
        self.drive_map
            .get_or_init(|| async { build_drive_map(&self.executor).await })
            .await
    }

    /// Test hook: preload the drive map so probes resolve without an OS
    /// query.
    #[cfg(test)]
    pub fn set_drive_map(&self, map: DriveMap) {
        let _ = self.drive_map.set(map);
    }
}

/// Run the QueryDosDevice enumeration under Windows PowerShell, falling
/// back to `pwsh`. Both unavailable leaves the map empty and device
/// paths pass through unresolved.
async fn build_drive_map(executor: &BoundedExecutor) -> DriveMap {
    for shell in ["powershell", "pwsh"] {
        match executor
            .run(shell, &["-NoProfile", "-Command", DRIVE_QUERY_SCRIPT])
            .await
        {
            Ok(output) => {
                let map = DriveMap::from_query_output(&output);
                if !map.is_empty() {
                    return map;
                }
            }
            Err(e) => debug!("drive map query via {shell} failed: {e}"),
        }
    }
    debug!("drive map unavailable, device paths will pass through unresolved");
    DriveMap::empty()
}
