//! Bounded execution of external OS commands.
//!
//! Every forensic query that shells out (`reg query`, `ipconfig`,
//! `tasklist`, PowerShell one-liners) goes through [`BoundedExecutor`]:
//! a global counting semaphore caps how many child processes are in
//! flight system-wide, each command gets a deadline and an output-size
//! cap, and violations kill the child rather than letting it run on.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_MAX_OUTPUT_BYTES, MAX_CONCURRENT_PROCESSES,
};
use crate::error::ExecError;

/// Per-command resource limits.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        ExecOptions {
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Executor shared by all probes of one scan run.
///
/// Cheap to clone; clones share the same process-count semaphore.
#[derive(Clone)]
pub struct BoundedExecutor {
    permits: Arc<Semaphore>,
}

impl BoundedExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        BoundedExecutor {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run a command with the default limits and return its stdout.
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<String, ExecError> {
        self.run_with(program, args, &ExecOptions::default()).await
    }

    /// Run a command with explicit limits and return its stdout.
    ///
    /// Stdout is decoded lossily: console tools emit OEM code pages and a
    /// replacement character is better than losing the line.
    pub async fn run_with(
        &self,
        program: &str,
        args: &[&str],
        opts: &ExecOptions,
    ) -> Result<String, ExecError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("process semaphore closed");

        debug!("exec: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let mut stdout = child.stdout.take().expect("stdout was piped");
        let limit = opts.max_output_bytes;

        let outcome = tokio::time::timeout(opts.timeout, async {
            let mut buf: Vec<u8> = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = stdout
                    .read(&mut chunk)
                    .await
                    .map_err(|source| ExecError::Spawn {
                        program: program.to_string(),
                        source,
                    })?;
                if n == 0 {
                    break;
                }
                if buf.len() + n > limit {
                    return Err(ExecError::OutputLimit {
                        program: program.to_string(),
                        limit,
                    });
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let status = child.wait().await.map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;
            if !status.success() {
                return Err(ExecError::NonZeroExit {
                    program: program.to_string(),
                    code: status.code(),
                });
            }
            Ok(buf)
        })
        .await;

        match outcome {
            Ok(Ok(buf)) => Ok(String::from_utf8_lossy(&buf).into_owned()),
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Err(e)
            }
            Err(_elapsed) => {
                let _ = child.kill().await;
                Err(ExecError::Timeout {
                    program: program.to_string(),
                    timeout_secs: opts.timeout.as_secs(),
                })
            }
        }
    }
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        BoundedExecutor::new(MAX_CONCURRENT_PROCESSES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_stdout() {
        let exec = BoundedExecutor::new(2);
        let out = exec.run("sh", &["-c", "printf 'hello world'"]).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_classified() {
        let exec = BoundedExecutor::new(2);
        let err = exec.run("sh", &["-c", "exit 3"]).await.unwrap_err();
        match err {
            ExecError::NonZeroExit { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let exec = BoundedExecutor::new(2);
        let err = exec
            .run("definitely-not-a-real-binary-4711", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_and_classifies() {
        let exec = BoundedExecutor::new(2);
        let opts = ExecOptions {
            timeout: Duration::from_millis(100),
            max_output_bytes: 1024,
        };
        let started = Instant::now();
        let err = exec
            .run_with("sh", &["-c", "sleep 5"], &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        // The wrapper must come back near the deadline, not after the sleep
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_cap_kills_and_classifies() {
        let exec = BoundedExecutor::new(2);
        let opts = ExecOptions {
            timeout: Duration::from_secs(10),
            max_output_bytes: 1024,
        };
        let err = exec
            .run_with("sh", &["-c", "head -c 65536 /dev/zero"], &opts)
            .await
            .unwrap_err();
        match err {
            ExecError::OutputLimit { limit, .. } => assert_eq!(limit, 1024),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_global_ceiling_serializes_children() {
        let exec = BoundedExecutor::new(1);
        let started = Instant::now();
        let a = exec.run("sh", &["-c", "sleep 0.2"]);
        let b = exec.run("sh", &["-c", "sleep 0.2"]);
        let (ra, rb) = tokio::join!(a, b);
        ra.unwrap();
        rb.unwrap();
        // With one permit the sleeps cannot overlap
        assert!(started.elapsed() >= Duration::from_millis(380));
    }
}
