//! Herakles Traffic Sampler Library
//!
//! Measures per-process I/O traffic over a fixed window and renders the
//! busiest processes as a stacked area chart.
//!
//! Two units of execution cooperate:
//!
//! - a [`BackgroundSampler`] on its own blocking thread keeps replacing the
//!   [`SharedSnapshot`] with fresh cumulative counters, and reports a systemic
//!   failure once through the fault channel;
//! - the [`SampleLoop`] wakes at absolute one-second targets, copies the latest
//!   snapshot and records per-process deltas into a [`History`].
//!
//! The finished history is ranked by [`aggregate`] and drawn by
//! [`render_chart`].
//!
//! # Usage
//!
//! ```no_run
//! use herakles_traffic::{
//!     aggregate, render_chart, run_measurement, EmptySource, RenderOptions, RunSettings, SamplerStats,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let (_stop, interrupt) = tokio::sync::watch::channel(false);
//! let settings = RunSettings {
//!     duration: 5,
//!     warmup: Duration::from_millis(500),
//!     poll_interval: Duration::from_millis(100),
//!     shutdown_timeout: Duration::from_secs(1),
//! };
//! let stats = Arc::new(SamplerStats::new());
//! let report = run_measurement(EmptySource, settings, stats, interrupt).await?;
//! let chart = aggregate(&report.history, 5);
//! render_chart(&chart, Path::new("traffic.png"), &RenderOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod export;
pub mod fault;
pub mod history;
pub mod process;
pub mod render;
pub mod run;
pub mod sampler;
pub mod sampling;
pub mod snapshot;
pub mod startup_checks;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use aggregate::{aggregate, ChartData, RateUnit, Series, OTHERS_LABEL};
pub use config::Config;
pub use fault::{fault_channel, FaultReceiver, FaultReport, FaultSender};
pub use history::History;
pub use render::{render_chart, RenderError, RenderOptions};
pub use run::{run_measurement, RunReport, RunSettings};
pub use sampler::{BackgroundSampler, ShutdownOutcome};
pub use sampling::{LoopOutcome, SampleError, SampleLoop, TickRecord};
pub use snapshot::{EmptySource, ProcfsSource, Snapshot, SnapshotSource, SourceError};
pub use stats::SamplerStats;
pub use store::SharedSnapshot;
