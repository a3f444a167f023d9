//! Counter snapshot sources.
//!
//! A [`Snapshot`] maps a process name to the cumulative I/O bytes of every live
//! process carrying that name. Distinct PIDs with the same name are summed into
//! one entry, so the map is not monotonic between cycles: processes exit, names
//! get reused, counters start over.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::Config;
use crate::process::{
    collect_proc_entries, read_block_io, read_process_name, should_include_process, SkipReason,
};
use crate::stats::SamplerStats;

/// Process name to cumulative I/O bytes (read + write).
///
/// Ordered by name so that processes first seen in the same tick are
/// registered in a stable order.
pub type Snapshot = BTreeMap<String, u64>;

/// Systemic collection failures. Per-process failures never show up here.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot enumerate processes under {}: {source}", root.display())]
    Enumeration {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot source failed: {0}")]
    Failed(String),
}

/// Something that can produce a fresh [`Snapshot`] on demand.
pub trait SnapshotSource: Send + 'static {
    /// Collects one snapshot. Processes that vanish or deny access mid-scan are
    /// skipped; only a failure of the enumeration itself is returned as an error.
    fn collect(&mut self) -> Result<Snapshot, SourceError>;
}

impl<F> SnapshotSource for F
where
    F: FnMut() -> Result<Snapshot, SourceError> + Send + 'static,
{
    fn collect(&mut self) -> Result<Snapshot, SourceError> {
        self()
    }
}

/// Reads `/proc/<pid>/io` for every process under a proc root.
pub struct ProcfsSource {
    root: PathBuf,
    config: Arc<Config>,
    stats: Arc<SamplerStats>,
}

impl ProcfsSource {
    pub fn new(root: impl Into<PathBuf>, config: Arc<Config>, stats: Arc<SamplerStats>) -> Self {
        Self {
            root: root.into(),
            config,
            stats,
        }
    }

    pub fn from_config(config: Arc<Config>, stats: Arc<SamplerStats>) -> Self {
        let root = config.proc_root();
        Self::new(root, config, stats)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_entry(&self, proc_path: &Path) -> Result<Option<(String, u64)>, SkipReason> {
        let name = read_process_name(proc_path).ok_or(SkipReason::Vanished)?;
        if !should_include_process(&name, &self.config) {
            return Ok(None);
        }
        let counters = read_block_io(proc_path).map_err(|e| SkipReason::classify(&e))?;
        Ok(Some((name, counters.total())))
    }
}

impl SnapshotSource for ProcfsSource {
    fn collect(&mut self) -> Result<Snapshot, SourceError> {
        let entries = collect_proc_entries(&self.root, self.config.max_processes).map_err(
            |source| SourceError::Enumeration {
                root: self.root.clone(),
                source,
            },
        )?;
        trace!("Collected {} process entries from {}", entries.len(), self.root.display());

        let this = &*self;
        let totals: Vec<(String, u64)> = entries
            .par_iter()
            .filter_map(|entry| match this.read_entry(&entry.proc_path) {
                Ok(found) => found,
                Err(reason) => {
                    trace!("Skipping process {}: {:?}", entry.pid, reason);
                    this.stats.record_skip(reason);
                    None
                }
            })
            .collect();

        let mut snapshot = Snapshot::new();
        for (name, total) in totals {
            let slot = snapshot.entry(name).or_insert(0);
            *slot = slot.saturating_add(total);
        }
        debug!(
            "Snapshot: {} names from {} entries",
            snapshot.len(),
            entries.len()
        );
        Ok(snapshot)
    }
}

/// A source that never sees any traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySource;

impl SnapshotSource for EmptySource {
    fn collect(&mut self) -> Result<Snapshot, SourceError> {
        Ok(Snapshot::new())
    }
}
