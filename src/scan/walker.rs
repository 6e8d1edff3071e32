//! Shared recursive filesystem walker.
//!
//! All filesystem-bound probes use this one walker: it honors a depth
//! limit, an excluded-directory set and an extension allow-list, never
//! follows symbolic links, applies the keyword matcher to names only
//! (directories and files, not content), and checks the cancellation
//! token every stride so a deadline or cancel takes effect promptly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::constants::WALK_PROGRESS_STRIDE;
use crate::error::ScanError;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;

/// Parameters for one walk.
pub struct WalkSpec {
    pub root: PathBuf,
    pub max_depth: usize,
    /// Lower-cased extensions a file must carry to be name-checked.
    pub extensions: HashSet<String>,
    /// Lower-cased directory names that are skipped entirely.
    pub excluded_dirs: HashSet<String>,
}

impl WalkSpec {
    /// Spec for a configured scan root, taking extensions and exclusions
    /// from the run's settings.
    pub fn from_settings(ctx: &ScanContext, root: impl Into<PathBuf>, max_depth: usize) -> Self {
        WalkSpec {
            root: root.into(),
            max_depth,
            extensions: ctx
                .settings
                .executable_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            excluded_dirs: ctx.settings.excluded_dir_set(),
        }
    }
}

fn file_extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Walk `spec.root` and push a finding for every directory or file whose
/// name matches a keyword.
pub async fn walk_matches(
    spec: &WalkSpec,
    ctx: &ScanContext,
    out: &mut FindingSink,
) -> Result<(), ScanError> {
    if !spec.root.exists() {
        debug!("walk root {} does not exist, skipping", spec.root.display());
        return Ok(());
    }

    let excluded = spec.excluded_dirs.clone();
    let walker = WalkDir::new(&spec.root)
        .max_depth(spec.max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| {
            if entry.path_is_symlink() {
                return false;
            }
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                return !excluded.contains(&name);
            }
            true
        });

    let mut visited = 0usize;
    for entry in walker {
        visited += 1;
        if visited % WALK_PROGRESS_STRIDE == 0 {
            ctx.check_cancelled()?;
            out.progress(visited, 0, &spec.root.display().to_string());
            // Yield so deadlines can fire against a long blocking walk
            tokio::task::yield_now().await;
        }

        let entry = match entry {
            Ok(e) => e,
            // Unreadable subtrees are skipped, not fatal
            Err(e) => {
                debug!("walk error under {}: {e}", spec.root.display());
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            if let Some(keyword) = ctx.matcher.find_keyword(&name) {
                out.push(format!("{} (keyword: {})", entry.path().display(), keyword));
            }
        } else if entry.file_type().is_file() {
            let allowed = match file_extension_lower(entry.path()) {
                Some(ext) => spec.extensions.contains(&ext),
                None => false,
            };
            if !allowed {
                continue;
            }
            if let Some(keyword) = ctx.matcher.find_keyword(&name) {
                out.push(format!("{} (keyword: {})", entry.path().display(), keyword));
            }
        }
    }

    Ok(())
}
