//! Transaction state.

use crate::notify::{WaitResult, WakeReceiver};
use crate::transaction::TransactionCell;
use crate::types::{ResourceId, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Running its work plan. Initial state.
    Active = 0,
    /// Lost a Wait-Die comparison; must unwind and restart.
    Aborted = 1,
    /// Finished and released everything. Terminal.
    Committed = 2,
}

impl TransactionStatus {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Active,
            1 => Self::Aborted,
            _ => Self::Committed,
        }
    }
}

/// A transaction as seen by the worker that owns it.
///
/// Besides the shared id/timestamp/status, the owned value tracks which
/// resources the transaction currently holds (in acquisition order) and
/// carries the receiving end of its wake channel.
#[derive(Debug)]
pub struct Transaction {
    cell: Arc<TransactionCell>,
    held: Vec<ResourceId>,
    initial_timestamp: Timestamp,
    restarts: u32,
    wake: WakeReceiver,
}

impl Transaction {
    pub(crate) fn new(cell: Arc<TransactionCell>, wake: WakeReceiver) -> Self {
        let initial_timestamp = cell.timestamp();
        Self {
            cell,
            held: Vec::new(),
            initial_timestamp,
            restarts: 0,
            wake,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.cell.id()
    }

    /// Returns the current priority timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.cell.timestamp()
    }

    /// Returns the timestamp assigned at creation.
    #[must_use]
    pub fn initial_timestamp(&self) -> Timestamp {
        self.initial_timestamp
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.cell.status()
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status() == TransactionStatus::Active
    }

    /// Resources currently held, in acquisition order.
    #[must_use]
    pub fn held(&self) -> &[ResourceId] {
        &self.held
    }

    /// Returns true if the transaction holds `resource`.
    #[must_use]
    pub fn holds(&self, resource: &ResourceId) -> bool {
        self.held.contains(resource)
    }

    /// Number of times the transaction has been restarted.
    #[must_use]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Blocks until a wake signal arrives or `timeout` elapses.
    pub fn wait_for_wake(&self, timeout: Duration) -> WaitResult {
        self.wake.wait(timeout)
    }

    /// Discards wake signals that arrived while the transaction was not waiting.
    pub fn drain_wakes(&self) -> usize {
        self.wake.drain()
    }

    pub(crate) fn cell(&self) -> &TransactionCell {
        &self.cell
    }

    pub(crate) fn record_acquired(&mut self, resource: &ResourceId) {
        if !self.holds(resource) {
            self.held.push(resource.clone());
        }
    }

    pub(crate) fn record_released(&mut self, resource: &ResourceId) {
        self.held.retain(|r| r != resource);
    }

    pub(crate) fn record_restart(&mut self, timestamp: Timestamp) {
        self.restarts += 1;
        self.cell.reactivate(timestamp);
    }
}
