//! Latest-snapshot store shared between the background sampler and the tick loop.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::snapshot::Snapshot;

/// Holds the most recently completed [`Snapshot`].
///
/// The writer swaps the whole map in under the lock; readers clone it out under
/// the same lock. A reader therefore sees either the previous or the new
/// snapshot in full, never a mix of both.
#[derive(Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<Mutex<Snapshot>>,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored snapshot, returning the previous one.
    ///
    /// The old map is handed back so it is dropped outside the critical section.
    pub fn replace(&self, snapshot: Snapshot) -> Snapshot {
        std::mem::replace(&mut *self.lock(), snapshot)
    }

    /// Takes a full copy of the current snapshot.
    pub fn copy(&self) -> Snapshot {
        self.lock().clone()
    }

    // The map is always replaced wholesale, so a writer that panicked mid-swap
    // cannot have left partial state behind.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
