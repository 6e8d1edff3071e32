//! Finding accumulation and throttled progress emission.
//!
//! The sink is owned by the orchestrator's per-probe wrapper and lent to
//! the probe future; when a deadline fires and the future is dropped,
//! whatever the probe pushed so far survives as partial findings.
//!
//! Progress events are rate-limited to one per minimum interval, with
//! forced emission at 0% and 100%, so a chatty walker cannot flood the
//! UI/IPC channel. Events are sent with `try_send`: a slow consumer
//! loses events, never stalls the scan.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::constants::PROGRESS_MIN_INTERVAL_MS;
use crate::models::{Finding, ScanProgress};

pub struct FindingSink {
    probe: &'static str,
    findings: Vec<Finding>,
    tx: Option<mpsc::Sender<ScanProgress>>,
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl FindingSink {
    pub fn new(probe: &'static str, tx: Option<mpsc::Sender<ScanProgress>>) -> Self {
        FindingSink {
            probe,
            findings: Vec::new(),
            tx,
            min_interval: Duration::from_millis(PROGRESS_MIN_INTERVAL_MS),
            last_emit: None,
        }
    }

    #[cfg(test)]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Record one finding tagged with this probe's name.
    pub fn push(&mut self, detail: impl AsRef<str>) {
        self.findings.push(Finding::new(self.probe, detail));
    }

    pub fn count(&self) -> usize {
        self.findings.len()
    }

    /// Throttled progress report from inside a probe loop.
    pub fn progress(&mut self, current: usize, total: usize, item: &str) {
        let forced = current == 0 || (total > 0 && current >= total);
        if !forced {
            if let Some(last) = self.last_emit {
                if last.elapsed() < self.min_interval {
                    return;
                }
            }
        }
        self.emit(ScanProgress::new(self.probe, current, total, item));
    }

    /// Forced 0% event at probe start.
    pub fn begin(&mut self) {
        self.emit(ScanProgress::new(self.probe, 0, 0, "starting"));
    }

    /// Forced 100% event at probe completion.
    pub fn complete(&mut self) {
        self.emit(ScanProgress::new(self.probe, 1, 1, "done"));
    }

    fn emit(&mut self, event: ScanProgress) {
        self.last_emit = Some(Instant::now());
        if let Some(tx) = &self.tx {
            // Drop on full rather than blocking the probe
            let _ = tx.try_send(event);
        }
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_tags_findings() {
        let mut sink = FindingSink::new("Prefetch", None);
        sink.push("CHEAT.EXE-12345678.pf");
        assert_eq!(sink.count(), 1);
        let findings = sink.into_findings();
        assert_eq!(findings[0].as_str(), "[Prefetch] CHEAT.EXE-12345678.pf");
    }

    #[tokio::test]
    async fn test_intermediate_events_are_throttled() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut sink =
            FindingSink::new("Walk", Some(tx)).with_interval(Duration::from_secs(3600));

        sink.progress(0, 100, "a"); // forced (0%)
        sink.progress(10, 100, "b"); // throttled away
        sink.progress(20, 100, "c"); // throttled away
        sink.progress(100, 100, "d"); // forced (100%)

        let mut received = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            received.push(ev);
        }
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].percent, 0);
        assert_eq!(received[1].percent, 100);
    }

    #[tokio::test]
    async fn test_interval_elapse_allows_emission() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut sink = FindingSink::new("Walk", Some(tx)).with_interval(Duration::ZERO);

        sink.progress(10, 100, "a");
        sink.progress(11, 100, "b");
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        assert_eq!(n, 2);
    }

    #[tokio::test]
    async fn test_full_channel_drops_instead_of_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let mut sink = FindingSink::new("Walk", Some(tx)).with_interval(Duration::ZERO);
        // Far more events than capacity; must not block or panic
        for i in 0..100 {
            sink.progress(i, 0, "x");
        }
    }
}
