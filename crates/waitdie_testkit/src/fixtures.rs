//! Lock manager fixtures.
//!
//! Fixtures use a [`ManualClock`] so timestamps are reproducible, and expose
//! helpers for creating transactions with fixed priorities.

use std::sync::Arc;
use waitdie_core::{
    Config, LockManager, ManualClock, ResourceId, Timestamp, TimestampAuthority, Transaction,
};

/// A lock manager with a controllable clock.
pub struct Fixture {
    /// The lock manager under test.
    pub manager: Arc<LockManager>,
    /// Clock backing the manager's timestamp authority.
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    /// Creates a fixture with the given resources and a clock at 1000.
    pub fn with_resources(names: &[&str]) -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let manager = LockManager::with_authority(
            Config::default(),
            TimestampAuthority::with_clock(Box::new(Arc::clone(&clock))),
        );
        for name in names {
            manager
                .add_resource(*name)
                .expect("fixture resource names must be unique");
        }
        Self {
            manager: Arc::new(manager),
            clock,
        }
    }

    /// Creates a fixture with resources `X` and `Y`.
    pub fn two_resources() -> Self {
        Self::with_resources(&["X", "Y"])
    }

    /// Starts a transaction with a fixed timestamp.
    pub fn begin_at(&self, timestamp: u64) -> Transaction {
        self.manager.begin_with_timestamp(Timestamp::new(timestamp))
    }

    /// Starts a transaction with a clock-issued timestamp.
    pub fn begin(&self) -> Transaction {
        self.manager.begin()
    }
}

impl std::ops::Deref for Fixture {
    type Target = LockManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

/// Shorthand for a resource id.
pub fn res(name: &str) -> ResourceId {
    ResourceId::new(name)
}
