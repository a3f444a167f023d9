//! One complete measurement: sampler lifecycle around the sample loop.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::fault::fault_channel;
use crate::history::History;
use crate::sampler::{BackgroundSampler, ShutdownOutcome};
use crate::sampling::{LoopOutcome, SampleError, SampleLoop, TickRecord};
use crate::snapshot::SnapshotSource;
use crate::stats::SamplerStats;
use crate::store::SharedSnapshot;

/// Exit code after a clean user interruption (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;
/// Exit code for every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// Timing knobs of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub duration: usize,
    pub warmup: Duration,
    pub poll_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl From<&Config> for RunSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            duration: cfg.duration(),
            warmup: cfg.warmup(),
            poll_interval: cfg.poll_interval(),
            shutdown_timeout: cfg.shutdown_timeout(),
        }
    }
}

/// Everything a finished (or cleanly interrupted) run produced.
#[derive(Debug)]
pub struct RunReport {
    pub history: History,
    pub ticks: Vec<TickRecord>,
    pub started_at: Option<DateTime<Utc>>,
    pub outcome: LoopOutcome,
    pub shutdown: ShutdownOutcome,
    pub stats: Arc<SamplerStats>,
}

impl RunReport {
    pub fn interrupted(&self) -> bool {
        matches!(self.outcome, LoopOutcome::Interrupted { .. })
    }

    pub fn exit_code(&self) -> i32 {
        if self.interrupted() {
            EXIT_INTERRUPTED
        } else {
            0
        }
    }
}

/// Starts the sampler on `source`, runs the loop, and always stops the sampler
/// again before returning, whatever the loop's outcome.
///
/// `stats` should be the same instance the source records its skips into.
pub async fn run_measurement<S: SnapshotSource>(
    source: S,
    settings: RunSettings,
    stats: Arc<SamplerStats>,
    interrupt: watch::Receiver<bool>,
) -> Result<RunReport, SampleError> {
    let store = SharedSnapshot::new();
    let (faults_tx, faults_rx) = fault_channel();

    let sampler = BackgroundSampler::spawn(
        source,
        store.clone(),
        faults_tx,
        stats.clone(),
        settings.poll_interval,
    );

    let mut sample_loop = SampleLoop::new(settings.duration, store, faults_rx, interrupt);
    let result = drive(&mut sample_loop, settings.warmup).await;

    let shutdown = sampler.shutdown(settings.shutdown_timeout).await;
    if shutdown == ShutdownOutcome::TimedOut {
        warn!("Continuing without waiting for the background sampler");
    }

    let outcome = result?;
    let (history, ticks, started_at) = sample_loop.into_parts();
    let cycles = stats.summary();
    info!(
        "Run finished: {:?}, {} series, {} sampler cycles (scan avg {:.1} ms, max {:.1} ms), {} names last scan (peak {}), {} processes skipped",
        outcome,
        history.len(),
        cycles.cycles,
        cycles.mean_scan_ms(),
        cycles.slowest_scan_ms,
        cycles.last_names,
        cycles.peak_names,
        stats.skipped_total()
    );

    Ok(RunReport {
        history,
        ticks,
        started_at,
        outcome,
        shutdown,
        stats,
    })
}

async fn drive(sample_loop: &mut SampleLoop, warmup: Duration) -> Result<LoopOutcome, SampleError> {
    if !sample_loop.warm_up(warmup).await? {
        info!("Interrupted during warm-up");
        return Ok(LoopOutcome::Interrupted { completed_ticks: 0 });
    }
    sample_loop.run().await
}
