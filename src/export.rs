//! JSON export of the aggregated chart and loop timing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

use crate::aggregate::ChartData;
use crate::sampling::TickRecord;

#[derive(Debug, Clone, Serialize)]
pub struct TickTiming {
    pub tick: usize,
    pub drift_ms: f64,
    pub processes: usize,
    pub new_processes: usize,
    pub bytes: u64,
}

impl From<&TickRecord> for TickTiming {
    fn from(r: &TickRecord) -> Self {
        Self {
            tick: r.tick,
            drift_ms: r.drift().as_secs_f64() * 1000.0,
            processes: r.summary.names,
            new_processes: r.summary.new_names,
            bytes: r.summary.total_bytes,
        }
    }
}

/// Serialized form of one measurement run.
#[derive(Debug, Clone, Serialize)]
pub struct RunExport<'a> {
    pub started_at: Option<DateTime<Utc>>,
    pub duration_secs: usize,
    pub completed_ticks: usize,
    pub interrupted: bool,
    pub chart: &'a ChartData,
    pub ticks: Vec<TickTiming>,
}

impl<'a> RunExport<'a> {
    pub fn new(
        chart: &'a ChartData,
        ticks: &[TickRecord],
        started_at: Option<DateTime<Utc>>,
        interrupted: bool,
    ) -> Self {
        Self {
            started_at,
            duration_secs: chart.duration,
            completed_ticks: ticks.len(),
            interrupted,
            chart,
            ticks: ticks.iter().map(TickTiming::from).collect(),
        }
    }

    pub fn max_drift_ms(&self) -> f64 {
        self.ticks.iter().map(|t| t.drift_ms).fold(0.0, f64::max)
    }
}

/// Writes `export` as pretty-printed JSON.
pub fn write_json(export: &RunExport<'_>, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(export).map_err(io::Error::other)?;
    fs::write(path, json)?;
    info!(
        "Run data exported to {} (max drift {:.1} ms)",
        path.display(),
        export.max_drift_ms()
    );
    Ok(())
}
