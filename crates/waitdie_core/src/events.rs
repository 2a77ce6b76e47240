//! Structured lock events.
//!
//! Every decision the lock manager makes is published as a [`LockEvent`].
//! Reporting layers (console output, test assertions) subscribe to the feed
//! instead of scraping log lines.

use crate::types::{ResourceId, Timestamp, TransactionId};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// A single lock manager decision or lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockEvent {
    /// The transaction became holder of the resource.
    Granted {
        /// Requesting transaction.
        txn: TransactionId,
        /// Resource granted.
        resource: ResourceId,
    },
    /// Older requester queued behind a younger holder.
    Queued {
        /// Requesting transaction.
        txn: TransactionId,
        /// Requester's timestamp.
        txn_ts: Timestamp,
        /// Contended resource.
        resource: ResourceId,
        /// Current holder.
        holder: TransactionId,
        /// Holder's timestamp.
        holder_ts: Timestamp,
    },
    /// Younger (or equal) requester aborted.
    Died {
        /// Requesting transaction.
        txn: TransactionId,
        /// Requester's timestamp.
        txn_ts: Timestamp,
        /// Contended resource.
        resource: ResourceId,
        /// Current holder.
        holder: TransactionId,
        /// Holder's timestamp.
        holder_ts: Timestamp,
    },
    /// The holder let go of the resource.
    Released {
        /// Releasing transaction.
        txn: TransactionId,
        /// Released resource.
        resource: ResourceId,
    },
    /// A popped waiter was signalled to retry.
    Notified {
        /// The woken waiter.
        txn: TransactionId,
        /// The resource that became free.
        resource: ResourceId,
    },
    /// The recorded holder could not be resolved in the registry.
    Anomaly {
        /// Requesting transaction.
        txn: TransactionId,
        /// Contended resource.
        resource: ResourceId,
        /// Unresolvable holder id.
        holder: TransactionId,
    },
    /// An aborted transaction restarted with a newer timestamp.
    Restarted {
        /// The transaction.
        txn: TransactionId,
        /// Timestamp before the restart.
        previous: Timestamp,
        /// Timestamp after the restart.
        timestamp: Timestamp,
    },
    /// The transaction committed.
    Committed {
        /// The transaction.
        txn: TransactionId,
    },
}

impl LockEvent {
    /// The transaction the event is about.
    #[must_use]
    pub fn transaction(&self) -> TransactionId {
        match self {
            Self::Granted { txn, .. }
            | Self::Queued { txn, .. }
            | Self::Died { txn, .. }
            | Self::Released { txn, .. }
            | Self::Notified { txn, .. }
            | Self::Anomaly { txn, .. }
            | Self::Restarted { txn, .. }
            | Self::Committed { txn } => *txn,
        }
    }
}

/// An event tagged with its position in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Position in the feed, starting at 1.
    pub sequence: u64,
    /// The event.
    pub event: LockEvent,
}

/// Distributes lock events to subscribers and keeps a bounded history.
pub struct EventFeed {
    subscribers: RwLock<Vec<Sender<EventRecord>>>,
    history: RwLock<VecDeque<EventRecord>>,
    max_history: usize,
    next_sequence: AtomicU64,
}

impl EventFeed {
    /// Creates a feed with the default history limit.
    pub fn new() -> Self {
        Self::with_max_history(10_000)
    }

    /// Creates a feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            max_history,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Receiver<EventRecord> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publishes an event, dropping subscribers whose receiver is gone.
    pub fn emit(&self, event: LockEvent) {
        let record = EventRecord {
            sequence: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            event,
        };

        if self.max_history > 0 {
            let mut history = self.history.write();
            history.push_back(record.clone());
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(record.clone()).is_ok());
    }

    /// Returns events with sequence > cursor, up to limit.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<EventRecord> {
        self.history
            .read()
            .iter()
            .filter(|r| r.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns every retained event concerning `txn`.
    pub fn history_for(&self, txn: TransactionId) -> Vec<LockEvent> {
        self.history
            .read()
            .iter()
            .filter(|r| r.event.transaction() == txn)
            .map(|r| r.event.clone())
            .collect()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("subscribers", &self.subscriber_count())
            .field("history_len", &self.history_len())
            .finish_non_exhaustive()
    }
}
