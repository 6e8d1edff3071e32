//! Filesystem probe: walks the configured roots looking for keyword
//! matches in directory and file names.

use async_trait::async_trait;

use crate::error::ScanError;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::walker::{walk_matches, WalkSpec};
use crate::scan::Scanner;

pub struct FileSystemProbe;

#[async_trait]
impl Scanner for FileSystemProbe {
    fn name(&self) -> &'static str {
        "FileSystem"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Filesystem
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        let roots = ctx.settings.expanded_roots();
        let total = roots.len();
        for (i, root) in roots.iter().enumerate() {
            ctx.check_cancelled()?;
            out.progress(i, total, &root.path);

            // A root whose %VAR% did not resolve cannot exist on disk
            if root.path.contains('%') {
                continue;
            }
            let spec = WalkSpec::from_settings(ctx, &root.path, root.max_depth);
            walk_matches(&spec, ctx, out).await?;
        }
        out.progress(total, total, "");
        Ok(())
    }
}
