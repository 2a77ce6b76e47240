//! Simulation configuration.

use crate::error::{SimError, SimResult};
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use waitdie_core::ResourceId;

/// A random delay drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    /// Shortest delay.
    pub min: Duration,
    /// Longest delay.
    pub max: Duration,
}

impl Jitter {
    /// No delay at all.
    pub const ZERO: Self = Self::fixed(Duration::ZERO);

    /// A delay between `min` and `max` inclusive.
    #[must_use]
    pub const fn between(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// A delay between `min_ms` and `max_ms` milliseconds.
    #[must_use]
    pub const fn millis(min_ms: u64, max_ms: u64) -> Self {
        Self::between(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// Always the same delay.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self::between(delay, delay)
    }

    /// Draws a delay.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let lo = u64::try_from(self.min.as_micros()).unwrap_or(u64::MAX);
        let hi = u64::try_from(self.max.as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rng.gen_range(lo..=hi))
    }
}

/// Configuration for a [`crate::Simulation`].
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of concurrent transactions.
    pub transactions: usize,

    /// Resources every transaction locks, in acquisition order.
    pub resources: Vec<ResourceId>,

    /// Pause between creating consecutive transactions.
    pub stagger: Jitter,

    /// Simulated work at the start of every attempt.
    pub work_delay: Jitter,

    /// Time spent reading a locked resource.
    pub read_delay: Jitter,

    /// Time spent writing all locked resources.
    pub write_delay: Jitter,

    /// Backoff after an abort, before restarting.
    pub abort_backoff: Jitter,

    /// How long a queued transaction waits for a wake signal before retrying.
    pub wait_timeout: Duration,

    /// Restarts after which a transaction gives up (None = unbounded).
    pub max_restarts: Option<u32>,

    /// Seed for reproducible delays (None = OS entropy).
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            transactions: 5,
            resources: vec![ResourceId::new("X"), ResourceId::new("Y")],
            stagger: Jitter::millis(100, 250),
            work_delay: Jitter::millis(50, 150),
            read_delay: Jitter::millis(20, 70),
            write_delay: Jitter::millis(50, 150),
            abort_backoff: Jitter::millis(100, 300),
            wait_timeout: Duration::from_millis(150),
            max_restarts: None,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Millisecond-scale delays and a restart bound, for tests.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            stagger: Jitter::millis(0, 2),
            work_delay: Jitter::millis(0, 2),
            read_delay: Jitter::millis(0, 1),
            write_delay: Jitter::millis(0, 2),
            abort_backoff: Jitter::millis(0, 3),
            wait_timeout: Duration::from_millis(5),
            max_restarts: Some(10_000),
            ..Self::default()
        }
    }

    /// Sets the number of transactions.
    #[must_use]
    pub const fn transactions(mut self, count: usize) -> Self {
        self.transactions = count;
        self
    }

    /// Sets the resources, in acquisition order.
    #[must_use]
    pub fn resources<I, R>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceId>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the creation stagger.
    #[must_use]
    pub const fn stagger(mut self, jitter: Jitter) -> Self {
        self.stagger = jitter;
        self
    }

    /// Sets the abort backoff.
    #[must_use]
    pub const fn abort_backoff(mut self, jitter: Jitter) -> Self {
        self.abort_backoff = jitter;
        self
    }

    /// Sets the wake timeout.
    #[must_use]
    pub const fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the restart bound.
    #[must_use]
    pub const fn max_restarts(mut self, max: Option<u32>) -> Self {
        self.max_restarts = max;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that the configuration can run.
    pub fn validate(&self) -> SimResult<()> {
        if self.transactions == 0 {
            return Err(SimError::invalid_config("at least one transaction is required"));
        }
        if self.resources.is_empty() {
            return Err(SimError::invalid_config("at least one resource is required"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.resources.iter().find(|r| !seen.insert(*r)) {
            return Err(SimError::invalid_config(format!(
                "resource {dup} listed more than once"
            )));
        }
        for (name, jitter) in [
            ("stagger", self.stagger),
            ("work_delay", self.work_delay),
            ("read_delay", self.read_delay),
            ("write_delay", self.write_delay),
            ("abort_backoff", self.abort_backoff),
        ] {
            if jitter.min > jitter.max {
                return Err(SimError::invalid_config(format!(
                    "{name}: min {:?} exceeds max {:?}",
                    jitter.min, jitter.max
                )));
            }
        }
        if self.wait_timeout.is_zero() {
            return Err(SimError::invalid_config("wait_timeout must be positive"));
        }
        Ok(())
    }
}
