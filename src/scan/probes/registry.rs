//! Registry probe.
//!
//! Exports each configured target with `reg query /s` and keyword-matches
//! the value *data* only; key paths repeat hive vocabulary ("run",
//! "shell") that would drown the report in false positives.

use async_trait::async_trait;
use log::debug;

use crate::config::RegistryTarget;
use crate::decode::reg_text::parse_reg_query;
use crate::error::{ExecError, ScanError};
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

pub struct RegistryProbe;

impl RegistryProbe {
    /// Match one target's export text into findings.
    fn process_export(
        &self,
        ctx: &ScanContext,
        out: &mut FindingSink,
        target: &RegistryTarget,
        export: &str,
    ) {
        for value in parse_reg_query(export) {
            if let Some(keyword) = ctx.matcher.find_keyword(&value.data) {
                out.push(format!(
                    "{}: {}\\{} = {} (keyword: {})",
                    target.name, value.key_path, value.name, value.data, keyword
                ));
            }
        }
    }
}

#[async_trait]
impl Scanner for RegistryProbe {
    fn name(&self) -> &'static str {
        "Registry"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Registry
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        let targets = ctx.registry_targets.clone();
        let total = targets.len();

        for (i, target) in targets.iter().enumerate() {
            ctx.check_cancelled()?;
            out.progress(i, total, &target.path);

            match ctx.executor.run("reg", &["query", &target.path, "/s"]).await {
                Ok(export) => self.process_export(ctx, out, target, &export),
                // An absent key exits non-zero; that is data, not failure
                Err(ExecError::NonZeroExit { .. }) => {
                    debug!("registry target {} not present", target.path);
                }
                Err(e) => return Err(e.into()),
            }
        }
        out.progress(total, total, "");
        Ok(())
    }
}
