//! # Wait-Die Core
//!
//! Lock manager core for transactions contending on shared resources under the
//! Wait-Die deadlock-prevention protocol.
//!
//! This crate provides:
//! - Timestamp authority handing out transaction priorities
//! - Transaction state and the transaction registry
//! - Per-resource exclusive locks with FIFO waiter queues
//! - The lock manager implementing the Wait-Die decision
//! - Wake notifications for waiters, a structured event feed, and counters

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
mod events;
mod lock;
mod notify;
mod stats;
mod transaction;
mod types;

pub use clock::{Clock, ManualClock, MonotonicClock, TimestampAuthority};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use events::{EventFeed, EventRecord, LockEvent};
pub use lock::{
    AcquireOutcome, Contention, LockManager, MutexResourceLock, ReleaseOutcome, ResourceLock,
    TryAcquire,
};
pub use notify::{WaitResult, Wake, WakeNotifier, WakeReceiver};
pub use stats::{LockStats, LockStatsSnapshot};
pub use transaction::{Transaction, TransactionRegistry, TransactionStatus};
pub use types::{ResourceId, Timestamp, TransactionId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
