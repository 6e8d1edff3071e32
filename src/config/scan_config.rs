//! Scan configuration: settings, keyword set and registry targets.
//!
//! Loaded once from YAML, validated against the schema below, and
//! immutable for the lifetime of a scan run. Invalid configuration falls
//! back to the compiled-in defaults rather than failing the run.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_windows_env_vars;
use crate::error::ScanError;

/// One filesystem root to walk, with its own depth limit.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScanRoot {
    pub path: String,
    pub max_depth: usize,
}

/// Immutable per-run scan settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScanSettings {
    pub scan_roots: Vec<ScanRoot>,
    /// Findings older than this many days are dropped where a timestamp
    /// is available.
    pub recency_days: i64,
    pub excluded_dirs: Vec<String>,
    pub executable_extensions: Vec<String>,
}

impl ScanSettings {
    /// Excluded directory names as a lower-cased lookup set.
    pub fn excluded_dir_set(&self) -> HashSet<String> {
        self.excluded_dirs.iter().map(|d| d.to_lowercase()).collect()
    }

    /// Scan roots with `%VAR%` references expanded.
    pub fn expanded_roots(&self) -> Vec<ScanRoot> {
        self.scan_roots
            .iter()
            .map(|r| ScanRoot {
                path: expand_windows_env_vars(&r.path),
                max_depth: r.max_depth,
            })
            .collect()
    }

    /// Recency cutoff in Unix milliseconds, relative to now.
    pub fn recency_cutoff_ms(&self) -> i64 {
        crate::decode::filetime::now_unix_ms() - self.recency_days * 24 * 60 * 60 * 1000
    }
}

/// Keyword set as configured; case-folding happens in `KeywordMatcher`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeywordConfig {
    pub substrings: Vec<String>,
    pub exact: Vec<String>,
}

/// One registry path probed via `reg query /s`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryTarget {
    pub name: String,
    pub path: String,
}

/// Top-level configuration document.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScanConfig {
    pub version: String,
    pub settings: ScanSettings,
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub registry_targets: Vec<RegistryTarget>,
}

impl ScanConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: ScanConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file (used by `--init-config`).
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;
        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Validate the schema constraints the scanner relies on.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.version.trim().is_empty() {
            return Err(ScanError::Config("version must not be empty".to_string()));
        }
        if self.keywords.substrings.is_empty() && self.keywords.exact.is_empty() {
            return Err(ScanError::Config(
                "keyword set must contain at least one pattern".to_string(),
            ));
        }
        if self.settings.scan_roots.is_empty() {
            return Err(ScanError::Config("scan_roots must not be empty".to_string()));
        }
        for root in &self.settings.scan_roots {
            if root.path.trim().is_empty() {
                return Err(ScanError::Config("scan root path must not be empty".to_string()));
            }
            if !(1..=32).contains(&root.max_depth) {
                return Err(ScanError::Config(format!(
                    "scan root {} depth {} outside 1..=32",
                    root.path, root.max_depth
                )));
            }
        }
        if !(1..=3650).contains(&self.settings.recency_days) {
            return Err(ScanError::Config(format!(
                "recency_days {} outside 1..=3650",
                self.settings.recency_days
            )));
        }
        if self.settings.executable_extensions.is_empty() {
            return Err(ScanError::Config(
                "executable_extensions must not be empty".to_string(),
            ));
        }
        for target in &self.registry_targets {
            let upper = target.path.to_uppercase();
            if !(upper.starts_with("HKLM") || upper.starts_with("HKCU") || upper.starts_with("HKEY_"))
            {
                return Err(ScanError::Config(format!(
                    "registry target {} must start with a hive name",
                    target.path
                )));
            }
        }
        Ok(())
    }

    /// Load and validate a config file, falling back to the compiled-in
    /// defaults on any failure.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("No config file supplied, using defaults");
            return ScanConfig::default();
        };
        match ScanConfig::from_yaml_file(path) {
            Ok(config) => match config.validate() {
                Ok(()) => config,
                Err(e) => {
                    warn!("Config {} failed validation ({e}), using defaults", path.display());
                    ScanConfig::default()
                }
            },
            Err(e) => {
                warn!("Could not load config {} ({e:#}), using defaults", path.display());
                ScanConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.keywords.substrings.is_empty());
        assert!(!config.registry_targets.is_empty());
    }

    #[test]
    fn test_yaml_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");

        let config = ScanConfig::default();
        config.save_to_yaml_file(&path).unwrap();

        let loaded = ScanConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.version, config.version);
        assert_eq!(loaded.keywords.substrings, config.keywords.substrings);
        assert_eq!(loaded.settings.scan_roots.len(), config.settings.scan_roots.len());
    }

    #[test]
    fn test_validation_rejects_empty_keywords() {
        let mut config = ScanConfig::default();
        config.keywords.substrings.clear();
        config.keywords.exact.clear();
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_validation_rejects_bad_depth() {
        let mut config = ScanConfig::default();
        config.settings.scan_roots[0].max_depth = 0;
        assert!(config.validate().is_err());

        config.settings.scan_roots[0].max_depth = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_registry_target() {
        let mut config = ScanConfig::default();
        config.registry_targets.push(RegistryTarget {
            name: "bogus".to_string(),
            path: "C:\\not\\a\\hive".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.yaml");
        fs::write(&path, "version: [not, a, string").unwrap();

        let config = ScanConfig::load_or_default(Some(&path));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_schema_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yaml");
        let mut config = ScanConfig::default();
        config.settings.recency_days = -4;
        config.save_to_yaml_file(&path).unwrap();

        let loaded = ScanConfig::load_or_default(Some(&path));
        assert_eq!(loaded.settings.recency_days, ScanConfig::default().settings.recency_days);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ScanConfig::load_or_default(Some(Path::new("/no/such/file.yaml")));
        assert!(config.validate().is_ok());
    }
}
