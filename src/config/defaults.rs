//! Compiled-in default configuration.
//!
//! Used when no config file is supplied and as the fallback when a
//! supplied file fails validation.

use crate::config::scan_config::{KeywordConfig, RegistryTarget, ScanConfig, ScanRoot, ScanSettings};
use crate::constants::{DEFAULT_EXCLUDED_DIRS, DEFAULT_EXECUTABLE_EXTENSIONS, DEFAULT_RECENCY_DAYS};

/// Substring patterns matched with word-boundary semantics.
const DEFAULT_SUBSTRINGS: &[&str] = &[
    "cheat",
    "aimbot",
    "wallhack",
    "triggerbot",
    "silentaim",
    "norecoil",
    "injector",
    "unlocker",
    "spoofer",
    "hwid",
    "esp",
    "bhop",
];

/// Exact-match basenames (extension stripped before comparison).
const DEFAULT_EXACT: &[&str] = &[
    "x22cheats",
    "onetap",
    "skeet",
    "gamesense",
    "aimware",
    "neverlose",
    "fatality",
    "osiris",
    "goesp",
    "ezfrags",
    "interwebz",
];

fn default_scan_roots() -> Vec<ScanRoot> {
    [
        ("%USERPROFILE%\\Downloads", 5),
        ("%USERPROFILE%\\Desktop", 5),
        ("%USERPROFILE%\\Documents", 5),
        ("%TEMP%", 3),
        ("%APPDATA%", 4),
        ("%LOCALAPPDATA%", 4),
    ]
    .iter()
    .map(|(path, depth)| ScanRoot {
        path: (*path).to_string(),
        max_depth: *depth,
    })
    .collect()
}

fn default_registry_targets() -> Vec<RegistryTarget> {
    [
        (
            "Run (user)",
            "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Run",
        ),
        (
            "Run (machine)",
            "HKLM\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Run",
        ),
        (
            "RunOnce (user)",
            "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\RunOnce",
        ),
        (
            "Uninstall (machine)",
            "HKLM\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
        ),
        (
            "Uninstall (user)",
            "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Uninstall",
        ),
    ]
    .iter()
    .map(|(name, path)| RegistryTarget {
        name: (*name).to_string(),
        path: (*path).to_string(),
    })
    .collect()
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            scan_roots: default_scan_roots(),
            recency_days: DEFAULT_RECENCY_DAYS,
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            executable_extensions: DEFAULT_EXECUTABLE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        KeywordConfig {
            substrings: DEFAULT_SUBSTRINGS.iter().map(|s| s.to_string()).collect(),
            exact: DEFAULT_EXACT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            version: "1".to_string(),
            settings: ScanSettings::default(),
            keywords: KeywordConfig::default(),
            registry_targets: default_registry_targets(),
        }
    }
}
