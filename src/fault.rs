//! Single-slot fault channel from the background sampler to the orchestrator.
//!
//! Both ends are non-blocking. The channel holds at most one report; once it is
//! full further reports are dropped, so the first fatal error wins.

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::debug;

/// Terminal failure of the background sampler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("background sampler failed: {message}")]
pub struct FaultReport {
    pub message: String,
}

impl FaultReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Creates a connected sender/receiver pair with capacity one.
pub fn fault_channel() -> (FaultSender, FaultReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (FaultSender { tx }, FaultReceiver { rx })
}

/// Sampler side of the fault channel.
#[derive(Clone, Debug)]
pub struct FaultSender {
    tx: mpsc::Sender<FaultReport>,
}

impl FaultSender {
    /// Deposits a report without blocking. Returns `false` when it was dropped
    /// because a report is already pending or the receiver is gone.
    pub fn report(&self, report: FaultReport) -> bool {
        match self.tx.try_send(report) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                debug!("Fault slot occupied, dropping: {}", dropped.message);
                false
            }
            Err(TrySendError::Closed(dropped)) => {
                debug!("Fault receiver gone, dropping: {}", dropped.message);
                false
            }
        }
    }
}

/// Orchestrator side of the fault channel.
#[derive(Debug)]
pub struct FaultReceiver {
    rx: mpsc::Receiver<FaultReport>,
}

impl FaultReceiver {
    /// Non-blocking check for a pending fault.
    pub fn check(&mut self) -> Result<(), FaultReport> {
        match self.rx.try_recv() {
            Ok(report) => Err(report),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(()),
        }
    }
}
