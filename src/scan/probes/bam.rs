//! BAM/DAM probe.
//!
//! The Background and Desktop Activity Moderators keep one value per
//! executed binary under each user SID, named by kernel device path,
//! with a REG_BINARY blob whose first 8 bytes are the last-execution
//! FILETIME. The probe resolves device paths through the run's drive
//! map, decodes the timestamp, applies the recency window and
//! keyword-matches the resolved path.

use async_trait::async_trait;
use log::debug;

use crate::decode::filetime::{filetime_bytes_to_unix_ms, format_unix_ms};
use crate::decode::reg_text::{hex_to_bytes, parse_reg_query};
use crate::error::{ExecError, ScanError};
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

const BAM_KEYS: &[&str] = &[
    "HKLM\\SYSTEM\\CurrentControlSet\\Services\\bam\\State\\UserSettings",
    "HKLM\\SYSTEM\\CurrentControlSet\\Services\\dam\\State\\UserSettings",
];

pub struct BamProbe;

impl BamProbe {
    async fn process_export(
        &self,
        ctx: &ScanContext,
        out: &mut FindingSink,
        export: &str,
    ) -> Result<(), ScanError> {
        let drive_map = ctx.drive_map().await;
        let cutoff = ctx.settings.recency_cutoff_ms();

        for value in parse_reg_query(export) {
            ctx.check_cancelled()?;
            // Execution entries are device-path-named binary blobs;
            // bookkeeping values (Version, SequenceNumber) are not.
            if value.value_type != "REG_BINARY" || !value.name.starts_with('\\') {
                continue;
            }

            let resolved = drive_map.resolve(&value.name);
            let Some(keyword) = ctx.matcher.find_keyword(&resolved) else {
                continue;
            };

            let last_run = hex_to_bytes(&value.data).and_then(|b| filetime_bytes_to_unix_ms(&b));
            let sid = value
                .key_path
                .rsplit('\\')
                .next()
                .unwrap_or("")
                .to_string();

            match last_run {
                Some(ms) if ms < cutoff => continue,
                Some(ms) => out.push(format!(
                    "{} last executed {} [{}] (keyword: {})",
                    resolved,
                    format_unix_ms(ms),
                    sid,
                    keyword
                )),
                // Malformed timestamp: the path itself is still evidence
                None => out.push(format!("{resolved} [{sid}] (keyword: {keyword})")),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Scanner for BamProbe {
    fn name(&self) -> &'static str {
        "Bam"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Registry
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        for (i, key) in BAM_KEYS.iter().enumerate() {
            ctx.check_cancelled()?;
            out.progress(i, BAM_KEYS.len(), key);

            match ctx.executor.run("reg", &["query", key, "/s"]).await {
                Ok(export) => self.process_export(ctx, out, &export).await?,
                // DAM is absent on desktop SKUs; BAM absent pre-1709
                Err(ExecError::NonZeroExit { .. }) => debug!("{key} not present"),
                Err(e) => return Err(e.into()),
            }
        }
        out.progress(BAM_KEYS.len(), BAM_KEYS.len(), "");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::decode::device_path::DriveMap;
    use crate::decode::filetime::{now_unix_ms, unix_ms_to_filetime};

    fn hex_filetime(ms: i64) -> String {
        unix_ms_to_filetime(ms)
            .to_le_bytes()
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect()
    }

    fn export_with(path: &str, data_hex: &str) -> String {
        format!(
            "HKEY_LOCAL_MACHINE\\SYSTEM\\CurrentControlSet\\Services\\bam\\State\\UserSettings\\S-1-5-21-1111\n    {path}    REG_BINARY    {data_hex}\n    Version    REG_DWORD    0x1\n"
        )
    }

    fn test_ctx() -> ScanContext {
        let ctx = ScanContext::new(&ScanConfig::default());
        ctx.set_drive_map(DriveMap::from_query_output("C=\\Device\\HarddiskVolume3"));
        ctx
    }

    #[tokio::test]
    async fn test_recent_execution_is_reported_with_resolved_path() {
        let ctx = test_ctx();
        let recent = now_unix_ms() - 60_000;
        let export = export_with(
            "\\Device\\HarddiskVolume3\\Users\\bob\\Downloads\\cheat.exe",
            &hex_filetime(recent),
        );

        let mut sink = FindingSink::new("Bam", None);
        BamProbe.process_export(&ctx, &mut sink, &export).await.unwrap();

        let findings = sink.into_findings();
        assert_eq!(findings.len(), 1);
        let text = findings[0].as_str();
        assert!(text.contains("C:\\Users\\bob\\Downloads\\cheat.exe"));
        assert!(text.contains("S-1-5-21-1111"));
        assert!(text.contains("last executed"));
    }

    #[tokio::test]
    async fn test_old_execution_is_dropped_by_recency_window() {
        let ctx = test_ctx();
        // Well before any plausible window, inside the sanity range
        let export = export_with(
            "\\Device\\HarddiskVolume3\\old\\cheat.exe",
            &hex_filetime(1_262_304_000_000), // 2010-01-01
        );

        let mut sink = FindingSink::new("Bam", None);
        BamProbe.process_export(&ctx, &mut sink, &export).await.unwrap();
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_timestamp_keeps_path_evidence() {
        let ctx = test_ctx();
        let export = export_with("\\Device\\HarddiskVolume3\\x\\aimbot.exe", "00000000");

        let mut sink = FindingSink::new("Bam", None);
        BamProbe.process_export(&ctx, &mut sink, &export).await.unwrap();

        let findings = sink.into_findings();
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].as_str().contains("last executed"));
    }

    #[tokio::test]
    async fn test_unresolvable_volume_still_matches_filename() {
        let ctx = test_ctx();
        let recent = now_unix_ms() - 60_000;
        let export = export_with(
            "\\Device\\HarddiskVolume9\\tools\\wallhack.exe",
            &hex_filetime(recent),
        );

        let mut sink = FindingSink::new("Bam", None);
        BamProbe.process_export(&ctx, &mut sink, &export).await.unwrap();

        let findings = sink.into_findings();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].as_str().contains("\\Device\\HarddiskVolume9\\tools\\wallhack.exe"));
    }

    #[tokio::test]
    async fn test_non_binary_values_are_ignored() {
        let ctx = test_ctx();
        let export = "HKEY_LOCAL_MACHINE\\...\\UserSettings\\S-1-5-18\n    \\Device\\HarddiskVolume3\\cheat.exe    REG_SZ    notablob\n";

        let mut sink = FindingSink::new("Bam", None);
        BamProbe.process_export(&ctx, &mut sink, export).await.unwrap();
        assert_eq!(sink.count(), 0);
    }
}
