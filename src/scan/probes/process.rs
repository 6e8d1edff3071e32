//! Process probe: keyword-matches the live process table.

use async_trait::async_trait;
use sysinfo::{PidExt, ProcessExt, System, SystemExt};

use crate::error::ScanError;
use crate::keywords::KeywordMatcher;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

/// Entries checked per cancellation poll.
const PROCESS_CHECK_STRIDE: usize = 50;

pub struct ProcessProbe;

/// Match one process against the keyword set: the image name first, then
/// the executable path, then the command line.
pub fn match_process<'a>(
    matcher: &'a KeywordMatcher,
    name: &str,
    exe: &str,
    cmdline: &str,
) -> Option<&'a str> {
    matcher
        .find_keyword(name)
        .or_else(|| matcher.find_keyword(exe))
        .or_else(|| matcher.find_keyword(cmdline))
}

#[async_trait]
impl Scanner for ProcessProbe {
    fn name(&self) -> &'static str {
        "Process"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Process
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        // Refreshing the table is blocking work; keep it off the async
        // worker so sibling probes stay responsive.
        let system = tokio::task::spawn_blocking(|| System::new_all())
            .await
            .map_err(|e| ScanError::parse("process table", e.to_string()))?;

        let total = system.processes().len();
        for (i, (pid, process)) in system.processes().iter().enumerate() {
            if i % PROCESS_CHECK_STRIDE == 0 {
                ctx.check_cancelled()?;
                out.progress(i, total, process.name());
                tokio::task::yield_now().await;
            }

            let exe = process.exe().to_string_lossy();
            let cmdline = process.cmd().join(" ");
            if let Some(keyword) = match_process(&ctx.matcher, process.name(), &exe, &cmdline) {
                out.push(format!(
                    "{} (pid {}) {} (keyword: {})",
                    process.name(),
                    pid.as_u32(),
                    exe,
                    keyword
                ));
            }
        }
        out.progress(total, total, "");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;

    fn matcher() -> KeywordMatcher {
        let config = ScanConfig::default();
        KeywordMatcher::new(&config.keywords.substrings, &config.keywords.exact)
    }

    #[test]
    fn test_match_on_image_name() {
        let m = matcher();
        assert_eq!(
            match_process(&m, "aimbot.exe", "C:\\x\\aimbot.exe", ""),
            Some("aimbot")
        );
    }

    #[test]
    fn test_match_on_path_when_name_is_clean() {
        let m = matcher();
        assert_eq!(
            match_process(&m, "loader.exe", "C:\\cheat\\loader.exe", ""),
            Some("cheat")
        );
    }

    #[test]
    fn test_match_on_command_line_only() {
        let m = matcher();
        assert_eq!(
            match_process(
                &m,
                "javaw.exe",
                "C:\\java\\javaw.exe",
                "-jar C:\\mods\\wallhack.jar"
            ),
            Some("wallhack")
        );
    }

    #[test]
    fn test_clean_process_does_not_match() {
        let m = matcher();
        assert_eq!(
            match_process(
                &m,
                "svchost.exe",
                "C:\\Windows\\System32\\svchost.exe",
                "-k netsvcs"
            ),
            None
        );
    }

    #[tokio::test]
    async fn test_scan_runs_against_live_table() {
        let ctx = ScanContext::new(&ScanConfig::default());
        let mut sink = FindingSink::new("Process", None);
        // The live table should scan cleanly whatever is running
        assert!(ProcessProbe.scan(&ctx, &mut sink).await.is_ok());
    }
}
