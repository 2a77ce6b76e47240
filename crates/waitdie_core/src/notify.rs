//! Wake notifications for queued transactions.
//!
//! When a release pops a waiter off a resource queue, the lock manager sends
//! that one transaction a [`Wake`] so it retries right away instead of waiting
//! out its polling timeout. A wake is a hint to retry, not a grant.

use crate::types::{ResourceId, TransactionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Signal that a resource a transaction queued on has been released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wake {
    /// The released resource.
    pub resource: ResourceId,
}

/// Outcome of waiting on a [`WakeReceiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitResult {
    /// A release signalled this transaction.
    Woken(ResourceId),
    /// No signal arrived in time. The caller retries anyway.
    TimedOut,
}

/// Receiving end of a transaction's wake channel.
pub struct WakeReceiver {
    rx: Receiver<Wake>,
}

impl WakeReceiver {
    /// Blocks until a wake arrives or `timeout` elapses.
    ///
    /// A disconnected channel is reported as a timeout so a worker never
    /// stalls on a notifier that has gone away.
    pub fn wait(&self, timeout: Duration) -> WaitResult {
        match self.rx.recv_timeout(timeout) {
            Ok(wake) => WaitResult::Woken(wake.resource),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                WaitResult::TimedOut
            }
        }
    }

    /// Returns a pending wake without blocking.
    pub fn try_recv(&self) -> Option<Wake> {
        self.rx.try_recv().ok()
    }

    /// Discards all pending wakes, returning how many were dropped.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }
}

impl fmt::Debug for WakeReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WakeReceiver").finish_non_exhaustive()
    }
}

/// Routes wake signals to individual transactions.
#[derive(Default)]
pub struct WakeNotifier {
    senders: RwLock<HashMap<TransactionId, Sender<Wake>>>,
}

impl WakeNotifier {
    /// Creates a notifier with no registered transactions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a wake channel for `id`, replacing any previous one.
    pub fn register(&self, id: TransactionId) -> WakeReceiver {
        let (tx, rx) = mpsc::channel();
        self.senders.write().insert(id, tx);
        WakeReceiver { rx }
    }

    /// Closes the wake channel for `id`.
    pub fn unregister(&self, id: TransactionId) {
        self.senders.write().remove(&id);
    }

    /// Signals `id` that `resource` was released.
    ///
    /// Returns false if the transaction has no open channel or its receiver
    /// was dropped; the sender is discarded in the latter case.
    pub fn notify(&self, id: TransactionId, resource: &ResourceId) -> bool {
        let delivered = match self.senders.read().get(&id) {
            Some(tx) => tx
                .send(Wake {
                    resource: resource.clone(),
                })
                .is_ok(),
            None => return false,
        };
        if !delivered {
            self.unregister(id);
        }
        delivered
    }

    /// Number of open channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.senders.read().len()
    }
}

impl fmt::Debug for WakeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WakeNotifier")
            .field("channels", &self.channel_count())
            .finish()
    }
}
