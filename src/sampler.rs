//! Background sampler.
//!
//! Runs on its own blocking thread, repeatedly pulls a [`Snapshot`] from a
//! [`SnapshotSource`] and publishes it into the [`SharedSnapshot`]. A systemic
//! source failure is deposited into the fault channel and ends the loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::fault::{FaultReport, FaultSender};
use crate::snapshot::{Snapshot, SnapshotSource};
use crate::stats::SamplerStats;
use crate::store::SharedSnapshot;

/// Pause between two collection cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cooperative stop flag the sampler can sleep on.
#[derive(Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(|p| p.into_inner());
        *stopped = true;
        self.wake.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Sleeps up to `timeout`, returning early (with `true`) once stop is requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.stopped.lock().unwrap_or_else(|p| p.into_inner());
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(|p| p.into_inner());
        *guard
    }
}

/// How the sampler ended when it was asked to shut down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The thread exited within the timeout.
    Stopped,
    /// The thread did not exit in time and is left behind.
    TimedOut,
    /// The thread terminated abnormally.
    Failed(String),
}

/// Handle to a running background sampler.
pub struct BackgroundSampler {
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

impl BackgroundSampler {
    /// Starts the sampler thread. Must be called from within a tokio runtime.
    pub fn spawn<S: SnapshotSource>(
        source: S,
        store: SharedSnapshot,
        faults: FaultSender,
        stats: Arc<SamplerStats>,
        interval: Duration,
    ) -> Self {
        let stop = Arc::new(StopSignal::new());
        let worker = SamplerWorker {
            source,
            store,
            faults,
            stats,
            stop: stop.clone(),
            interval,
        };
        let handle = tokio::task::spawn_blocking(move || worker.run());
        Self { stop, handle }
    }

    /// Asks the sampler to stop without waiting for it.
    pub fn request_stop(&self) {
        self.stop.request();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Requests stop and waits up to `timeout` for the thread to exit.
    pub async fn shutdown(self, timeout: Duration) -> ShutdownOutcome {
        self.stop.request();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => {
                debug!("Background sampler stopped");
                ShutdownOutcome::Stopped
            }
            Ok(Err(e)) => {
                warn!("Background sampler terminated abnormally: {}", e);
                ShutdownOutcome::Failed(e.to_string())
            }
            Err(_) => {
                warn!(
                    "Background sampler did not stop within {:?}, leaving it behind",
                    timeout
                );
                ShutdownOutcome::TimedOut
            }
        }
    }
}

struct SamplerWorker<S> {
    source: S,
    store: SharedSnapshot,
    faults: FaultSender,
    stats: Arc<SamplerStats>,
    stop: Arc<StopSignal>,
    interval: Duration,
}

impl<S: SnapshotSource> SamplerWorker<S> {
    fn run(mut self) {
        info!("Background sampler started (interval {:?})", self.interval);

        while !self.stop.is_requested() {
            let started = Instant::now();
            let snapshot = match self.collect_once() {
                Ok(snapshot) => snapshot,
                Err(report) => {
                    error!("{}", report);
                    self.faults.report(report);
                    return;
                }
            };

            // A stop that arrived during a slow scan must not be followed by a write.
            if self.stop.is_requested() {
                break;
            }

            let names = snapshot.len();
            self.store.replace(snapshot);
            self.stats
                .record_cycle(names, started.elapsed().as_secs_f64() * 1000.0);

            if self.stop.wait_timeout(self.interval) {
                break;
            }
        }

        info!(
            "Background sampler exiting after {} cycles",
            self.stats.cycles()
        );
    }

    fn collect_once(&mut self) -> Result<Snapshot, FaultReport> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.source.collect())) {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(e)) => Err(FaultReport::new(e.to_string())),
            Err(payload) => {
                let what = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(FaultReport::new(format!("snapshot source panicked: {what}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::fault_channel;
    use crate::snapshot::SourceError;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counting_source(counter: Arc<AtomicU64>) -> impl SnapshotSource {
        move || -> Result<Snapshot, SourceError> {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Snapshot::from([("proc".to_string(), n * 100)]))
        }
    }

    #[test]
    fn test_stop_signal_wakes_waiter() {
        let stop = Arc::new(StopSignal::new());
        let waiter = {
            let stop = stop.clone();
            std::thread::spawn(move || {
                let started = Instant::now();
                let stopped = stop.wait_timeout(Duration::from_secs(10));
                (stopped, started.elapsed())
            })
        };
        std::thread::sleep(Duration::from_millis(20));
        stop.request();

        let (stopped, waited) = waiter.join().unwrap();
        assert!(stopped);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_stop_signal_times_out_when_not_requested() {
        let stop = StopSignal::new();
        assert!(!stop.wait_timeout(Duration::from_millis(5)));
        assert!(!stop.is_requested());
    }

    #[tokio::test]
    async fn test_sampler_publishes_snapshots() {
        let calls = Arc::new(AtomicU64::new(0));
        let store = SharedSnapshot::new();
        let (tx, mut rx) = fault_channel();
        let stats = Arc::new(SamplerStats::new());

        let sampler = BackgroundSampler::spawn(
            counting_source(calls.clone()),
            store.clone(),
            tx,
            stats.clone(),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(
            sampler.shutdown(Duration::from_secs(2)).await,
            ShutdownOutcome::Stopped
        );

        assert!(calls.load(Ordering::SeqCst) >= 2);
        assert!(store.copy()["proc"] >= 100);
        assert!(stats.cycles() >= 2);
        assert!(rx.check().is_ok());
    }

    #[tokio::test]
    async fn test_sampler_stops_writing_after_stop() {
        let calls = Arc::new(AtomicU64::new(0));
        let store = SharedSnapshot::new();
        let (tx, _rx) = fault_channel();

        let sampler = BackgroundSampler::spawn(
            counting_source(calls.clone()),
            store.clone(),
            tx,
            Arc::new(SamplerStats::new()),
            DEFAULT_POLL_INTERVAL,
        );
        tokio::time::sleep(Duration::from_millis(250)).await;

        sampler.request_stop();
        // Within one poll interval the thread must have noticed.
        tokio::time::sleep(DEFAULT_POLL_INTERVAL + Duration::from_millis(50)).await;
        assert!(sampler.is_finished());

        let frozen = store.copy();
        let frozen_calls = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.copy(), frozen);
        assert_eq!(calls.load(Ordering::SeqCst), frozen_calls);

        assert_eq!(
            sampler.shutdown(Duration::from_millis(100)).await,
            ShutdownOutcome::Stopped
        );
    }

    #[tokio::test]
    async fn test_systemic_failure_reaches_fault_channel() {
        let store = SharedSnapshot::new();
        let (tx, mut rx) = fault_channel();
        let source = || -> Result<Snapshot, SourceError> {
            Err(SourceError::Failed("proc root unmounted".into()))
        };

        let sampler = BackgroundSampler::spawn(
            source,
            store.clone(),
            tx,
            Arc::new(SamplerStats::new()),
            Duration::from_millis(10),
        );

        // The sampler exits on its own after the first failure.
        for _ in 0..100 {
            if sampler.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(sampler.is_finished());
        let outcome = sampler.shutdown(Duration::from_secs(2)).await;
        assert_eq!(outcome, ShutdownOutcome::Stopped);

        let report = rx.check().unwrap_err();
        assert!(report.message.contains("proc root unmounted"));
        assert!(rx.check().is_ok());
        assert!(store.copy().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_source_is_reported_as_fault() {
        let (tx, mut rx) = fault_channel();
        let source = || -> Result<Snapshot, SourceError> { panic!("counter table corrupted") };

        let sampler = BackgroundSampler::spawn(
            source,
            SharedSnapshot::new(),
            tx,
            Arc::new(SamplerStats::new()),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        sampler.shutdown(Duration::from_secs(2)).await;

        let report = rx.check().unwrap_err();
        assert!(report.message.contains("counter table corrupted"));
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_stuck_source() {
        let (tx, _rx) = fault_channel();
        let source = || -> Result<Snapshot, SourceError> {
            std::thread::sleep(Duration::from_millis(600));
            Ok(Snapshot::new())
        };

        let sampler = BackgroundSampler::spawn(
            source,
            SharedSnapshot::new(),
            tx,
            Arc::new(SamplerStats::new()),
            DEFAULT_POLL_INTERVAL,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            sampler.shutdown(Duration::from_millis(50)).await,
            ShutdownOutcome::TimedOut
        );
    }
}
