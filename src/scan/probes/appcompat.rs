//! AppCompat probe.
//!
//! Two per-user execution-history stores where the value *names* are
//! executable paths: the Compatibility Assistant store and MuiCache.
//! MuiCache names carry a `.FriendlyAppName` / `.ApplicationCompany`
//! suffix that is stripped before matching.

use async_trait::async_trait;
use log::debug;

use crate::decode::reg_text::parse_reg_query;
use crate::error::{ExecError, ScanError};
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

const APPCOMPAT_TARGETS: &[(&str, &str)] = &[
    (
        "Compatibility Assistant",
        "HKCU\\Software\\Microsoft\\Windows NT\\CurrentVersion\\AppCompatFlags\\Compatibility Assistant\\Store",
    ),
    (
        "MuiCache",
        "HKCU\\Software\\Classes\\Local Settings\\Software\\Microsoft\\Windows\\Shell\\MuiCache",
    ),
];

const MUICACHE_SUFFIXES: &[&str] = &[".FriendlyAppName", ".ApplicationCompany"];

/// Strip the MuiCache metadata suffix from a value name, if present.
pub fn strip_muicache_suffix(name: &str) -> &str {
    for suffix in MUICACHE_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped;
        }
    }
    name
}

pub struct AppCompatProbe;

impl AppCompatProbe {
    fn process_export(&self, ctx: &ScanContext, out: &mut FindingSink, label: &str, export: &str) {
        for value in parse_reg_query(export) {
            let path = strip_muicache_suffix(&value.name);
            // Only path-valued names are execution evidence
            if !path.contains('\\') {
                continue;
            }
            if let Some(keyword) = ctx.matcher.find_keyword(path) {
                out.push(format!("{label}: {path} (keyword: {keyword})"));
            }
        }
    }
}

#[async_trait]
impl Scanner for AppCompatProbe {
    fn name(&self) -> &'static str {
        "AppCompat"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Registry
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        for (i, (label, key)) in APPCOMPAT_TARGETS.iter().enumerate() {
            ctx.check_cancelled()?;
            out.progress(i, APPCOMPAT_TARGETS.len(), key);

            match ctx.executor.run("reg", &["query", key, "/s"]).await {
                Ok(export) => self.process_export(ctx, out, label, &export),
                Err(ExecError::NonZeroExit { .. }) => debug!("{label} store not present"),
                Err(e) => return Err(e.into()),
            }
        }
        out.progress(APPCOMPAT_TARGETS.len(), APPCOMPAT_TARGETS.len(), "");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;

    #[test]
    fn test_strip_muicache_suffix() {
        assert_eq!(
            strip_muicache_suffix("C:\\x\\tool.exe.FriendlyAppName"),
            "C:\\x\\tool.exe"
        );
        assert_eq!(
            strip_muicache_suffix("C:\\x\\tool.exe.ApplicationCompany"),
            "C:\\x\\tool.exe"
        );
        assert_eq!(strip_muicache_suffix("C:\\x\\tool.exe"), "C:\\x\\tool.exe");
    }

    #[test]
    fn test_path_valued_names_are_matched() {
        let ctx = ScanContext::new(&ScanConfig::default());
        let export = "\
HKEY_CURRENT_USER\\Software\\Microsoft\\Windows NT\\CurrentVersion\\AppCompatFlags\\Compatibility Assistant\\Store
    C:\\Downloads\\esp-overlay.exe    REG_BINARY    0102030405060708
    C:\\Program Files\\Sane App\\sane.exe    REG_BINARY    0102030405060708
    SignOfLife    REG_DWORD    0x1
";
        let mut sink = FindingSink::new("AppCompat", None);
        AppCompatProbe.process_export(&ctx, &mut sink, "Compatibility Assistant", export);

        let findings = sink.into_findings();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].as_str().contains("esp-overlay.exe"));
    }

    #[test]
    fn test_muicache_suffix_does_not_block_match() {
        let ctx = ScanContext::new(&ScanConfig::default());
        let export = "\
HKEY_CURRENT_USER\\Software\\Classes\\Local Settings\\Software\\Microsoft\\Windows\\Shell\\MuiCache
    C:\\Tools\\wallhack.exe.FriendlyAppName    REG_SZ    Wall Hack Pro
";
        let mut sink = FindingSink::new("AppCompat", None);
        AppCompatProbe.process_export(&ctx, &mut sink, "MuiCache", export);

        let findings = sink.into_findings();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].as_str().contains("C:\\Tools\\wallhack.exe"));
        assert!(!findings[0].as_str().contains("FriendlyAppName"));
    }
}
