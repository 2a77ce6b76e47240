//! Lock manager statistics.
//!
//! All counters are atomic and can be read while workers are running.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for lock manager decisions.
#[derive(Debug, Default)]
pub struct LockStats {
    /// Locks granted.
    grants: AtomicU64,
    /// Requests queued under the wait rule.
    waits: AtomicU64,
    /// Requests aborted under the die rule.
    deaths: AtomicU64,
    /// Successful releases.
    releases: AtomicU64,
    /// Releases by a non-holder (no-ops).
    noop_releases: AtomicU64,
    /// Wake signals delivered to popped waiters.
    wakeups: AtomicU64,
    /// Holder ids that could not be resolved.
    anomalies: AtomicU64,
    /// Transaction restarts.
    restarts: AtomicU64,
    /// Transaction commits.
    commits: AtomicU64,
}

impl LockStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_grant(&self) {
        self.grants.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait(&self) {
        self.waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_death(&self) {
        self.deaths.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_noop_release(&self) {
        self.noop_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> LockStatsSnapshot {
        LockStatsSnapshot {
            grants: self.grants.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            deaths: self.deaths.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            noop_releases: self.noop_releases.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`LockStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockStatsSnapshot {
    /// Locks granted.
    pub grants: u64,
    /// Requests queued under the wait rule.
    pub waits: u64,
    /// Requests aborted under the die rule.
    pub deaths: u64,
    /// Successful releases.
    pub releases: u64,
    /// Releases by a non-holder.
    pub noop_releases: u64,
    /// Wake signals delivered.
    pub wakeups: u64,
    /// Unresolvable holders.
    pub anomalies: u64,
    /// Transaction restarts.
    pub restarts: u64,
    /// Transaction commits.
    pub commits: u64,
}
