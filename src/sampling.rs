//! Drift-corrected sample loop.
//!
//! Tick `t` is scheduled at the absolute instant `t0 + t * tick`, never at
//! "last wake + tick". When an iteration overruns, the next target is already
//! in the past and the loop proceeds immediately; the lateness is recorded as
//! drift but not compensated for.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::fault::{FaultReceiver, FaultReport};
use crate::history::{History, TickSummary};
use crate::snapshot::Snapshot;
use crate::store::SharedSnapshot;

/// Nominal cadence of the loop.
pub const TICK: Duration = Duration::from_secs(1);

/// Errors that end a sampling run.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Collector(#[from] FaultReport),
}

/// How a sampling run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Completed,
    Interrupted { completed_ticks: usize },
}

/// Timing and volume of one recorded tick.
#[derive(Debug, Clone, Copy)]
pub struct TickRecord {
    pub tick: usize,
    pub target: Instant,
    pub woke: Instant,
    pub summary: TickSummary,
}

impl TickRecord {
    /// How late the tick was consumed relative to its target.
    pub fn drift(&self) -> Duration {
        self.woke.saturating_duration_since(self.target)
    }
}

/// Result of a single [`SampleLoop::step`].
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Recorded(TickRecord),
    Interrupted,
}

/// Orchestrates the per-second sampling of the shared snapshot.
pub struct SampleLoop {
    duration: usize,
    tick: Duration,
    store: SharedSnapshot,
    faults: FaultReceiver,
    interrupt: watch::Receiver<bool>,
    origin: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
    previous: Snapshot,
    history: History,
    ticks: Vec<TickRecord>,
}

impl SampleLoop {
    pub fn new(
        duration: usize,
        store: SharedSnapshot,
        faults: FaultReceiver,
        interrupt: watch::Receiver<bool>,
    ) -> Self {
        Self {
            duration,
            tick: TICK,
            store,
            faults,
            interrupt,
            origin: None,
            started_at: None,
            previous: Snapshot::new(),
            history: History::new(duration),
            ticks: Vec::with_capacity(duration),
        }
    }

    /// Overrides the nominal cadence.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn duration(&self) -> usize {
        self.duration
    }

    pub fn origin(&self) -> Option<Instant> {
        self.origin
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn ticks(&self) -> &[TickRecord] {
        &self.ticks
    }

    pub fn into_parts(self) -> (History, Vec<TickRecord>, Option<DateTime<Utc>>) {
        (self.history, self.ticks, self.started_at)
    }

    /// Non-blocking check of the fault channel.
    pub fn check_faults(&mut self) -> Result<(), SampleError> {
        self.faults.check().map_err(SampleError::from)
    }

    /// Gives the sampler time to publish its first snapshot, then checks for
    /// faults. Returns `false` when interrupted while waiting.
    pub async fn warm_up(&mut self, wait: Duration) -> Result<bool, SampleError> {
        debug!("Warming up for {:?}", wait);
        let deadline = Instant::now() + wait;
        if !self.wait_until(deadline).await {
            return Ok(false);
        }
        self.check_faults()?;
        Ok(true)
    }

    /// Takes the baseline snapshot and fixes `t0`.
    pub fn start(&mut self) {
        self.previous = self.store.copy();
        self.origin = Some(Instant::now());
        self.started_at = Some(Utc::now());
        info!(
            "Measuring for {} ticks of {:?} ({} processes in baseline)",
            self.duration,
            self.tick,
            self.previous.len()
        );
    }

    /// Absolute target instant of `tick`. Starts the loop if needed.
    pub fn target(&mut self, tick: usize) -> Instant {
        let origin = match self.origin {
            Some(origin) => origin,
            None => {
                self.start();
                self.origin.unwrap_or_else(Instant::now)
            }
        };
        origin + self.tick * u32::try_from(tick).unwrap_or(u32::MAX)
    }

    /// Waits for `tick`'s target, then records the deltas since the previous tick.
    pub async fn step(&mut self, tick: usize) -> Result<Step, SampleError> {
        let target = self.target(tick);
        if !self.wait_until(target).await {
            return Ok(Step::Interrupted);
        }
        let woke = Instant::now();

        self.check_faults()?;

        let current = self.store.copy();
        let summary = self.history.record_tick(tick, &self.previous, &current);
        self.previous = current;

        let record = TickRecord {
            tick,
            target,
            woke,
            summary,
        };
        self.ticks.push(record);

        info!(
            "{} s elapsed (drift: {:.4}s, {} processes, {} new)",
            tick,
            record.drift().as_secs_f64(),
            summary.names,
            summary.new_names
        );
        Ok(Step::Recorded(record))
    }

    /// Runs every remaining tick up to the configured duration.
    pub async fn run(&mut self) -> Result<LoopOutcome, SampleError> {
        if self.origin.is_none() {
            self.start();
        }
        let first = self.ticks.last().map(|r| r.tick + 1).unwrap_or(1);
        for tick in first..=self.duration {
            if let Step::Interrupted = self.step(tick).await? {
                let completed_ticks = self.ticks.len();
                info!("Interrupted after {} ticks", completed_ticks);
                return Ok(LoopOutcome::Interrupted { completed_ticks });
            }
        }
        Ok(LoopOutcome::Completed)
    }

    /// Sleeps until `deadline` unless interrupted first. A deadline already in
    /// the past returns immediately.
    async fn wait_until(&mut self, deadline: Instant) -> bool {
        if *self.interrupt.borrow() {
            return false;
        }
        if Instant::now() >= deadline {
            return true;
        }
        tokio::select! {
            _ = sleep_until(deadline) => true,
            _ = interrupted(&mut self.interrupt) => false,
        }
    }
}

/// Resolves once the interrupt flag turns true; never resolves if the sender
/// is dropped without raising it.
async fn interrupted(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|raised| *raised).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
