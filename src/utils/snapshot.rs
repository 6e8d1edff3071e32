//! Snapshot copies of possibly-locked files.
//!
//! Browser databases are held open with sharing restrictions while the
//! browser runs. Copying retries a few times with exponential backoff,
//! but only for sharing-violation-class errors; everything else fails
//! immediately.

use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::constants::{SNAPSHOT_BASE_DELAY_MS, SNAPSHOT_MAX_ATTEMPTS};
use crate::error::ScanError;

/// Windows sharing-violation and lock-violation codes.
const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_LOCK_VIOLATION: i32 = 33;

fn is_sharing_violation(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION))
        || err.kind() == std::io::ErrorKind::PermissionDenied
}

/// Copy `src` to `dst`, retrying up to 3 times (100/200/400 ms backoff)
/// when the source is locked by another process.
pub async fn snapshot_file(src: &Path, dst: &Path) -> Result<(), ScanError> {
    let mut attempt = 0;
    loop {
        match tokio::fs::copy(src, dst).await {
            Ok(_) => return Ok(()),
            Err(e) if is_sharing_violation(&e) && attempt + 1 < SNAPSHOT_MAX_ATTEMPTS => {
                let delay = SNAPSHOT_BASE_DELAY_MS << attempt;
                debug!(
                    "snapshot of {} hit a sharing violation, retrying in {}ms",
                    src.display(),
                    delay
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(e) => return Err(ScanError::io(src.display().to_string(), e)),
        }
    }
}
