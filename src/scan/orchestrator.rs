//! Scan orchestration.
//!
//! Probes are grouped (filesystem / registry / process) and each group
//! runs as a semaphore-bounded worker pool feeding one results channel.
//! Every probe invocation is wrapped with its group deadline; expiry
//! synthesizes a failed result that keeps the partial findings rather
//! than blocking the batch. A single engine-level flag guarantees only
//! one scan run is active at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::config::ScanConfig;
use crate::constants::{
    FILESYSTEM_GROUP_CONCURRENCY, FILESYSTEM_PROBE_DEADLINE_SECS, PROCESS_GROUP_CONCURRENCY,
    PROCESS_PROBE_DEADLINE_SECS, PROGRESS_CHANNEL_CAPACITY, REGISTRY_GROUP_CONCURRENCY,
    REGISTRY_PROBE_DEADLINE_SECS,
};
use crate::error::ScanError;
use crate::models::{ScanGroup, ScanProgress, ScanResult};
use crate::scan::context::ScanContext;
use crate::scan::probes;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

impl ScanGroup {
    /// Worker-pool size for this group.
    pub fn concurrency(&self) -> usize {
        match self {
            ScanGroup::Filesystem => FILESYSTEM_GROUP_CONCURRENCY,
            ScanGroup::Registry => REGISTRY_GROUP_CONCURRENCY,
            ScanGroup::Process => PROCESS_GROUP_CONCURRENCY,
        }
    }

    /// Deadline applied to each probe invocation in this group.
    pub fn deadline(&self) -> Duration {
        let secs = match self {
            ScanGroup::Filesystem => FILESYSTEM_PROBE_DEADLINE_SECS,
            ScanGroup::Registry => REGISTRY_PROBE_DEADLINE_SECS,
            ScanGroup::Process => PROCESS_PROBE_DEADLINE_SECS,
        };
        Duration::from_secs(secs)
    }
}

/// Handle to one in-flight scan run.
pub struct ScanHandle {
    /// Streamed, rate-limited progress events.
    pub progress: mpsc::Receiver<ScanProgress>,
    ctx: Arc<ScanContext>,
    driver: JoinHandle<Vec<ScanResult>>,
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle").finish_non_exhaustive()
    }
}

impl ScanHandle {
    /// Cooperatively cancel the run; in-flight probes stop at their next
    /// polling point.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Token that cancels this run, for callers that need to signal
    /// cancellation while the handle's receiver is borrowed.
    pub fn cancel_token(&self) -> tokio_util::sync::CancellationToken {
        self.ctx.cancel_token()
    }

    /// Wait for every probe to reach a terminal state and collect the
    /// results in probe-registration order.
    pub async fn join(self) -> Vec<ScanResult> {
        match self.driver.await {
            Ok(results) => results,
            Err(e) => {
                warn!("scan driver task failed: {e}");
                Vec::new()
            }
        }
    }
}

/// Entry point the UI/IPC layer drives: `start` + `cancel`.
pub struct ScanEngine {
    config: ScanConfig,
    running: Arc<AtomicBool>,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Self {
        ScanEngine {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a scan over all probes, or the named subset.
    ///
    /// Fails fast with `ScanError::Busy` while a previous run on this
    /// engine is still active.
    pub fn start(&self, probe_filter: Option<&[String]>) -> Result<ScanHandle, ScanError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScanError::Busy);
        }

        let ctx = Arc::new(ScanContext::new(&self.config));
        let probe_list = probes::build_probes(probe_filter);
        info!("starting scan with {} probe(s)", probe_list.len());

        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let running = Arc::clone(&self.running);
        let driver_ctx = Arc::clone(&ctx);

        let driver = tokio::spawn(async move {
            let results = drive_scan(driver_ctx, probe_list, progress_tx).await;
            running.store(false, Ordering::Release);
            results
        });

        Ok(ScanHandle {
            progress: progress_rx,
            ctx,
            driver,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Run all probes through their group pools and gather results.
async fn drive_scan(
    ctx: Arc<ScanContext>,
    probe_list: Vec<Box<dyn Scanner>>,
    progress_tx: mpsc::Sender<ScanProgress>,
) -> Vec<ScanResult> {
    let order: Vec<&'static str> = probe_list.iter().map(|p| p.name()).collect();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel();

    let group_semaphores: Vec<(ScanGroup, Arc<Semaphore>)> = ScanGroup::ALL
        .iter()
        .map(|g| (*g, Arc::new(Semaphore::new(g.concurrency()))))
        .collect();

    let mut tasks = Vec::new();
    for probe in probe_list {
        let semaphore = group_semaphores
            .iter()
            .find(|(g, _)| *g == probe.group())
            .map(|(_, s)| Arc::clone(s))
            .expect("every group has a semaphore");
        let ctx = Arc::clone(&ctx);
        let progress_tx = progress_tx.clone();
        let result_tx = result_tx.clone();
        let name = probe.name();

        let task = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("group pool closed");
            let result = run_probe(probe.as_ref(), &ctx, progress_tx).await;
            let _ = result_tx.send(result);
        });
        tasks.push((name, task));
    }
    drop(result_tx);

    // A panicking probe must not take down the scan; synthesize a failed
    // result for it instead.
    let joined = join_all(
        tasks
            .into_iter()
            .map(|(name, task)| async move { (name, task.await) }),
    )
    .await;
    let mut panicked = Vec::new();
    for (name, outcome) in joined {
        if let Err(e) = outcome {
            warn!("probe {name} panicked: {e}");
            panicked.push(ScanResult::finished(
                name,
                Vec::new(),
                Some(format!("probe panicked: {e}")),
                Utc::now(),
            ));
        }
    }

    let mut results = Vec::new();
    while let Some(result) = result_rx.recv().await {
        results.push(result);
    }
    results.extend(panicked);

    // Report in registration order regardless of completion order
    results.sort_by_key(|r| order.iter().position(|n| *n == r.probe).unwrap_or(usize::MAX));
    results
}

/// Execute one probe under its deadline and convert every outcome into a
/// terminal `ScanResult`.
async fn run_probe(
    probe: &dyn Scanner,
    ctx: &ScanContext,
    progress_tx: mpsc::Sender<ScanProgress>,
) -> ScanResult {
    let name = probe.name();
    let started = Utc::now();
    let mut sink = FindingSink::new(name, Some(progress_tx));

    if ctx.cancelled() {
        return ScanResult::finished(name, Vec::new(), Some(ScanError::Cancelled.to_string()), started);
    }

    sink.begin();
    let deadline = probe.group().deadline();
    let outcome = tokio::time::timeout(deadline, probe.scan(ctx, &mut sink)).await;

    let error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            if e.is_cancelled() {
                debug!("probe {name} cancelled");
            } else {
                warn!("probe {name} failed: {e}");
            }
            Some(e.to_string())
        }
        Err(_elapsed) => {
            warn!("probe {name} exceeded its {}s deadline", deadline.as_secs());
            Some(ScanError::Timeout(deadline.as_secs()).to_string())
        }
    };

    // No progress events after cancellation
    if !ctx.cancelled() {
        sink.complete();
    }
    ScanResult::finished(name, sink.into_findings(), error, started)
}

/// Convenience wrapper: run a full scan to completion, discarding
/// progress events. Used by tests and simple callers.
pub async fn run_scan_to_completion(
    engine: &ScanEngine,
    probe_filter: Option<&[String]>,
) -> Result<Vec<ScanResult>, ScanError> {
    let mut handle = engine.start(probe_filter)?;
    // Drain progress concurrently so the channel never backs up
    let drain = tokio::spawn(async move {
        while handle.progress.recv().await.is_some() {}
        handle
    });
    let handle = drain.await.expect("progress drain task");
    Ok(handle.join().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Instant;

    struct QuickProbe;

    #[async_trait]
    impl Scanner for QuickProbe {
        fn name(&self) -> &'static str {
            "Quick"
        }
        fn group(&self) -> ScanGroup {
            ScanGroup::Process
        }
        async fn scan(&self, _ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
            out.push("hit");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_probe_success() {
        let ctx = ScanContext::new(&ScanConfig::default());
        let (tx, mut rx) = mpsc::channel(16);
        let result = run_probe(&QuickProbe, &ctx, tx).await;

        assert!(result.success);
        assert_eq!(result.finding_count, 1);
        assert_eq!(result.probe, "Quick");

        // Forced 0% and 100% events
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert!(events.len() >= 2);
        assert_eq!(events.first().unwrap().percent, 0);
        assert_eq!(events.last().unwrap().percent, 100);
    }

    struct SlowProbe;

    #[async_trait]
    impl Scanner for SlowProbe {
        fn name(&self) -> &'static str {
            "Slow"
        }
        fn group(&self) -> ScanGroup {
            ScanGroup::Process
        }
        async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
            out.push("partial finding before stall");
            loop {
                ctx.check_cancelled()?;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_partial_findings() {
        let ctx = ScanContext::new(&ScanConfig::default());
        let (tx, _rx) = mpsc::channel(16);
        let result = run_probe(&SlowProbe, &ctx, tx).await;

        assert!(!result.success);
        assert!(result.error.as_ref().unwrap().contains("deadline"));
        // The finding pushed before the stall survives the timeout
        assert_eq!(result.finding_count, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let ctx = ScanContext::new(&ScanConfig::default());
        ctx.cancel();
        let (tx, mut rx) = mpsc::channel(16);
        let result = run_probe(&QuickProbe, &ctx, tx).await;

        assert!(!result.success);
        assert!(result.error.as_ref().unwrap().contains("cancelled"));
        // No progress events after cancellation
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_engine_busy_guard() {
        let engine = ScanEngine::new(ScanConfig::default());
        // Hold the flag manually to simulate an active run
        engine.running.store(true, Ordering::Release);
        let err = engine.start(None).unwrap_err();
        assert!(matches!(err, ScanError::Busy));
        engine.running.store(false, Ordering::Release);
    }

    #[tokio::test]
    async fn test_group_scheduling_does_not_block_other_groups() {
        // A probe stuck at its deadline in one group must not delay a
        // probe in another group.
        struct StuckProbe;
        #[async_trait]
        impl Scanner for StuckProbe {
            fn name(&self) -> &'static str {
                "Stuck"
            }
            fn group(&self) -> ScanGroup {
                ScanGroup::Registry
            }
            async fn scan(&self, ctx: &ScanContext, _out: &mut FindingSink) -> Result<(), ScanError> {
                loop {
                    ctx.check_cancelled()?;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }

        let ctx = Arc::new(ScanContext::new(&ScanConfig::default()));
        let (progress_tx, _progress_rx) = mpsc::channel(64);

        let started = Instant::now();
        let stuck = tokio::spawn({
            let ctx = Arc::clone(&ctx);
            let tx = progress_tx.clone();
            async move { run_probe(&StuckProbe, &ctx, tx).await }
        });

        let quick_result = run_probe(&QuickProbe, &ctx, progress_tx).await;
        assert!(quick_result.success);
        assert!(started.elapsed() < Duration::from_secs(5));

        // Release the stuck probe instead of waiting out its deadline
        ctx.cancel();
        let stuck_result = stuck.await.unwrap();
        assert!(!stuck_result.success);
    }
}
