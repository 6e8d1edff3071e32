//! Error taxonomy for scan execution.
//!
//! Every probe-local failure is converted into a non-throwing
//! `ScanResult { success: false, .. }` by the orchestrator; these types
//! classify what went wrong so the report can say so.

use thiserror::Error;

/// Failure classes for external command execution.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exceeded its {timeout_secs}s deadline")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("{program} exited with status {code:?}")]
    NonZeroExit { program: String, code: Option<i32> },

    #[error("{program} produced more than {limit} bytes of output")]
    OutputLimit { program: String, limit: usize },
}

/// Failure classes for a single probe invocation.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Cooperative, user-initiated stop.
    #[error("scan cancelled")]
    Cancelled,

    /// Probe deadline exceeded; partial findings are kept.
    #[error("probe exceeded its {0}s deadline")]
    Timeout(u64),

    /// An external command failed, was missing, or was denied.
    #[error("execution failure: {0}")]
    Execution(#[from] ExecError),

    /// A malformed artifact: absent registry key, bad VDF, locked or
    /// corrupt database.
    #[error("parse failure in {source_name}: {detail}")]
    Parse { source_name: String, detail: String },

    /// Configuration failed validation; recoverable via defaults.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A scan run is already active on this engine.
    #[error("a scan is already running")]
    Busy,

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Shorthand for parse failures.
    pub fn parse(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        ScanError::Parse {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }

    /// Shorthand for i/o failures carrying the offending path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error means the user asked us to stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_error_display() {
        let err = ExecError::Timeout {
            program: "reg".to_string(),
            timeout_secs: 20,
        };
        assert_eq!(err.to_string(), "reg exceeded its 20s deadline");

        let err = ExecError::NonZeroExit {
            program: "ipconfig".to_string(),
            code: Some(1),
        };
        assert!(err.to_string().contains("ipconfig"));
        assert!(err.to_string().contains("1"));
    }

    #[test]
    fn test_scan_error_from_exec_error() {
        let exec = ExecError::OutputLimit {
            program: "tasklist".to_string(),
            limit: 1024,
        };
        let scan: ScanError = exec.into();
        assert!(matches!(scan, ScanError::Execution(_)));
        assert!(scan.to_string().contains("tasklist"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(ScanError::Cancelled.is_cancelled());
        assert!(!ScanError::Busy.is_cancelled());
        assert!(!ScanError::parse("vdf", "bad token").is_cancelled());
    }
}
