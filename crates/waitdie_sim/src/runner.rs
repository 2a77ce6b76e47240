//! Per-transaction worker loop.

use crate::config::{Jitter, SimConfig};
use crate::error::{SimError, SimResult};
use crate::plan::{Step, WorkPlan};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};
use waitdie_core::{AcquireOutcome, LockManager, ResourceId, Transaction, WaitResult};

/// What a runner observed while driving one transaction to commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Attempts started (restarts + 1).
    pub attempts: u32,
    /// Times an acquire came back `WaitingQueued`.
    pub waits: u32,
    /// Waits ended by a wake signal rather than the timeout.
    pub wakeups: u32,
}

enum Attempt {
    Committed,
    Aborted,
}

/// Drives one transaction through its work plan until it commits.
///
/// On `WaitingQueued` the runner blocks on the transaction's wake channel
/// (bounded by the configured timeout) and retries. On `Aborted` it releases
/// everything it holds, backs off, restarts the transaction and begins a new
/// attempt.
pub struct Runner {
    manager: Arc<LockManager>,
    plan: Arc<WorkPlan>,
    config: Arc<SimConfig>,
    rng: StdRng,
}

impl Runner {
    /// Creates a runner. `seed` makes its delays reproducible.
    pub fn new(
        manager: Arc<LockManager>,
        plan: Arc<WorkPlan>,
        config: Arc<SimConfig>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            manager,
            plan,
            config,
            rng,
        }
    }

    /// Runs `txn` until it commits.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Starved`] once the restart bound is exceeded, or
    /// any lock manager error.
    pub fn run(&mut self, txn: &mut Transaction) -> SimResult<RunSummary> {
        let mut summary = RunSummary::default();
        loop {
            summary.attempts += 1;
            info!(txn = %txn.id(), timestamp = %txn.timestamp(), "attempt started");
            self.pause(self.config.work_delay);

            match self.attempt(txn, &mut summary)? {
                Attempt::Committed => return Ok(summary),
                Attempt::Aborted => self.unwind(txn)?,
            }
        }
    }

    fn attempt(&mut self, txn: &mut Transaction, summary: &mut RunSummary) -> SimResult<Attempt> {
        let plan = Arc::clone(&self.plan);
        for step in plan.steps() {
            match step {
                Step::Acquire(resource) => {
                    if !self.acquire(txn, resource, summary)? {
                        return Ok(Attempt::Aborted);
                    }
                }
                Step::Read(resource) => {
                    self.pause(self.config.read_delay);
                    debug!(txn = %txn.id(), %resource, "read");
                }
                Step::Write(resources) => {
                    self.pause(self.config.write_delay);
                    debug!(txn = %txn.id(), resources = resources.len(), "write");
                }
                Step::Release(resource) => {
                    self.manager.release(txn, resource)?;
                }
                Step::Commit => {
                    self.manager.commit(txn)?;
                    return Ok(Attempt::Committed);
                }
            }
        }
        // Plans are validated to end in a commit.
        self.manager.commit(txn)?;
        Ok(Attempt::Committed)
    }

    /// Returns false if the transaction was aborted.
    fn acquire(
        &mut self,
        txn: &mut Transaction,
        resource: &ResourceId,
        summary: &mut RunSummary,
    ) -> SimResult<bool> {
        loop {
            match self.manager.acquire(txn, resource)? {
                AcquireOutcome::Granted => {
                    txn.drain_wakes();
                    return Ok(true);
                }
                AcquireOutcome::Aborted => return Ok(false),
                AcquireOutcome::WaitingQueued => {
                    summary.waits += 1;
                    match txn.wait_for_wake(self.config.wait_timeout) {
                        WaitResult::Woken(woken) => {
                            summary.wakeups += 1;
                            debug!(txn = %txn.id(), resource = %woken, "woken, retrying");
                        }
                        WaitResult::TimedOut => {
                            debug!(txn = %txn.id(), %resource, "wait timed out, retrying");
                        }
                    }
                }
            }
        }
    }

    fn unwind(&mut self, txn: &mut Transaction) -> SimResult<()> {
        let released = self.manager.release_all(txn)?;
        debug!(txn = %txn.id(), released, "unwound after abort");

        if let Some(max) = self.config.max_restarts {
            if txn.restarts() >= max {
                warn!(txn = %txn.id(), restarts = txn.restarts(), "restart bound reached");
                return Err(SimError::Starved {
                    id: txn.id(),
                    restarts: txn.restarts(),
                });
            }
        }

        self.pause(self.config.abort_backoff);
        self.manager.restart(txn)?;
        Ok(())
    }

    fn pause(&mut self, jitter: Jitter) {
        let delay = jitter.sample(&mut self.rng);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitdie_core::{Config, Timestamp, TransactionStatus};

    fn setup() -> (Arc<LockManager>, Arc<WorkPlan>, Arc<SimConfig>) {
        let config = SimConfig::fast().seed(Some(1));
        let manager = LockManager::with_resources(Config::default(), ["X", "Y"]).unwrap();
        let plan = WorkPlan::ordered(&config.resources).unwrap();
        (Arc::new(manager), Arc::new(plan), Arc::new(config))
    }

    #[test]
    fn uncontended_run_commits_first_try() {
        let (manager, plan, config) = setup();
        let mut txn = manager.begin();
        let mut runner = Runner::new(Arc::clone(&manager), plan, config, Some(1));

        let summary = runner.run(&mut txn).unwrap();
        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.waits, 0);
        assert_eq!(txn.status(), TransactionStatus::Committed);
        assert!(txn.held().is_empty());
    }

    #[test]
    fn aborted_run_restarts_and_commits() {
        let (manager, plan, config) = setup();
        let y = ResourceId::new("Y");

        // An older transaction holds Y for a while, so the runner dies on Y.
        let mut blocker = manager.begin_with_timestamp(Timestamp::new(1));
        manager.acquire(&mut blocker, &y).unwrap();
        let mut txn = manager.begin_with_timestamp(Timestamp::new(100));

        let release_manager = Arc::clone(&manager);
        let handle = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(30));
            release_manager.commit(&mut blocker).unwrap();
        });

        let mut runner = Runner::new(Arc::clone(&manager), plan, config, Some(2));
        let summary = runner.run(&mut txn).unwrap();
        handle.join().unwrap();

        assert!(summary.attempts > 1);
        assert!(txn.restarts() >= 1);
        assert!(txn.timestamp() > Timestamp::new(100));
        assert_eq!(txn.status(), TransactionStatus::Committed);
    }

    #[test]
    fn older_runner_waits_instead_of_dying() {
        let (manager, plan, config) = setup();
        let x = ResourceId::new("X");

        let mut holder = manager.begin_with_timestamp(Timestamp::new(100));
        manager.acquire(&mut holder, &x).unwrap();
        let mut txn = manager.begin_with_timestamp(Timestamp::new(1));

        let release_manager = Arc::clone(&manager);
        let handle = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(30));
            release_manager.commit(&mut holder).unwrap();
        });

        let mut runner = Runner::new(Arc::clone(&manager), plan, config, Some(3));
        let summary = runner.run(&mut txn).unwrap();
        handle.join().unwrap();

        assert_eq!(summary.attempts, 1);
        assert!(summary.waits >= 1);
        assert_eq!(txn.restarts(), 0);
    }

    #[test]
    fn restart_bound_reports_starvation() {
        let (manager, plan, _) = setup();
        let config = Arc::new(SimConfig::fast().max_restarts(Some(0)));
        let y = ResourceId::new("Y");

        let mut blocker = manager.begin_with_timestamp(Timestamp::new(1));
        manager.acquire(&mut blocker, &y).unwrap();
        let mut txn = manager.begin_with_timestamp(Timestamp::new(100));

        let mut runner = Runner::new(Arc::clone(&manager), plan, config, Some(4));
        let err = runner.run(&mut txn).unwrap_err();
        assert!(matches!(err, SimError::Starved { restarts: 0, .. }));
        // The starving transaction unwound before giving up.
        assert!(txn.held().is_empty());
        assert_eq!(manager.holder_of(&ResourceId::new("X")).unwrap(), None);
    }
}
