//! Clock sources and the timestamp authority.
//!
//! Wait-Die needs every live transaction to carry a distinct priority. The
//! [`TimestampAuthority`] reads a [`Clock`] and never hands out the same value
//! twice: when the clock has not advanced since the previous issue (coarse
//! resolution, or many transactions created in the same tick), the authority
//! bumps the value past the last one it issued.

use crate::types::Timestamp;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic source of raw time values.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current reading. Readings never go backwards.
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Microseconds elapsed since the clock was created.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to. Used for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock starting at `start`.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Sets the current reading. Values lower than the current one are ignored.
    pub fn set(&self, value: u64) {
        self.now.fetch_max(value, Ordering::SeqCst);
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Issues strictly increasing transaction timestamps.
pub struct TimestampAuthority {
    clock: Box<dyn Clock>,
    /// Last value handed out (0 = none yet).
    last: AtomicU64,
}

impl TimestampAuthority {
    /// Creates an authority backed by a [`MonotonicClock`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Box::new(MonotonicClock::new()))
    }

    /// Creates an authority backed by the given clock.
    #[must_use]
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicU64::new(0),
        }
    }

    /// Issues a fresh timestamp, distinct from and greater than every
    /// timestamp this authority issued before.
    pub fn issue(&self) -> Timestamp {
        self.issue_above(0)
    }

    /// Issues a fresh timestamp strictly greater than `previous`.
    ///
    /// Used on restart: `previous` may have been assigned outside this
    /// authority (for example a fixed test priority).
    pub fn issue_after(&self, previous: Timestamp) -> Timestamp {
        self.issue_above(previous.as_u64())
    }

    fn issue_above(&self, floor: u64) -> Timestamp {
        let now = self.clock.now();
        let pick = |last: u64| now.max(last.saturating_add(1)).max(floor.saturating_add(1));
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(pick(last)))
            .unwrap_or_else(|last| last);
        Timestamp::new(pick(prev))
    }

    /// Returns the last timestamp issued, if any.
    #[must_use]
    pub fn last_issued(&self) -> Option<Timestamp> {
        match self.last.load(Ordering::SeqCst) {
            0 => None,
            v => Some(Timestamp::new(v)),
        }
    }
}

impl Default for TimestampAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimestampAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampAuthority")
            .field("clock", &self.clock)
            .field("last_issued", &self.last_issued())
            .finish()
    }
}
