//! Start-up driver: creates transactions, runs one worker each, and reports.

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::plan::WorkPlan;
use crate::runner::{RunSummary, Runner};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use waitdie_core::{Config, LockManager, LockStatsSnapshot, Timestamp, TransactionId};

/// Outcome for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReport {
    /// Transaction id.
    pub id: TransactionId,
    /// Timestamp assigned at creation.
    pub initial_timestamp: Timestamp,
    /// Timestamp at commit.
    pub final_timestamp: Timestamp,
    /// Number of restarts.
    pub restarts: u32,
    /// Number of times the transaction was queued.
    pub waits: u32,
    /// Number of waits ended by a wake signal.
    pub wakeups: u32,
    /// Whether the transaction committed.
    pub committed: bool,
}

/// Result of a full simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Per-transaction outcomes, by id.
    pub transactions: Vec<TransactionReport>,
    /// Lock manager counters at the end of the run.
    pub stats: LockStatsSnapshot,
    /// Wall-clock duration.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl SimulationReport {
    /// Returns true if every transaction committed.
    #[must_use]
    pub fn all_committed(&self) -> bool {
        self.transactions.iter().all(|t| t.committed)
    }

    /// Sum of restarts across all transactions.
    #[must_use]
    pub fn total_restarts(&self) -> u64 {
        self.transactions.iter().map(|t| u64::from(t.restarts)).sum()
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self) {
        println!("\n=== Wait-Die simulation ===");
        for t in &self.transactions {
            println!(
                "{}: {} -> {}, restarts {}, waits {} ({} woken), {}",
                t.id,
                t.initial_timestamp,
                t.final_timestamp,
                t.restarts,
                t.waits,
                t.wakeups,
                if t.committed { "committed" } else { "not committed" }
            );
        }
        println!(
            "Grants: {}  Waits: {}  Deaths: {}  Wake-ups: {}  Anomalies: {}",
            self.stats.grants,
            self.stats.waits,
            self.stats.deaths,
            self.stats.wakeups,
            self.stats.anomalies
        );
        println!("Duration: {:?}", self.elapsed);
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// A configured simulation over one lock manager.
#[derive(Debug)]
pub struct Simulation {
    config: Arc<SimConfig>,
    plan: Arc<WorkPlan>,
    manager: Arc<LockManager>,
}

impl Simulation {
    /// Validates `config` and builds a lock manager with its resources.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let manager = LockManager::with_resources(Config::default(), config.resources.clone())?;
        Self::with_manager(config, Arc::new(manager))
    }

    /// Runs against an existing lock manager that already has the resources.
    pub fn with_manager(config: SimConfig, manager: Arc<LockManager>) -> SimResult<Self> {
        config.validate()?;
        let plan = WorkPlan::ordered(&config.resources)?;
        Ok(Self {
            config: Arc::new(config),
            plan: Arc::new(plan),
            manager,
        })
    }

    /// The lock manager the workers share.
    #[must_use]
    pub fn manager(&self) -> &Arc<LockManager> {
        &self.manager
    }

    /// The plan every worker runs.
    #[must_use]
    pub fn plan(&self) -> &WorkPlan {
        &self.plan
    }

    /// Creates the transactions with staggered start times, runs them all to
    /// completion, and returns the report.
    ///
    /// All workers are joined before an error is returned.
    pub fn run(&self) -> SimResult<SimulationReport> {
        let start = Instant::now();
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            transactions = self.config.transactions,
            resources = self.config.resources.len(),
            "simulation started"
        );

        let mut workers = Vec::with_capacity(self.config.transactions);
        for i in 0..self.config.transactions {
            let worker = self.spawn_worker();
            let spawned = match worker {
                Ok(w) => w,
                Err(e) => {
                    self.retire(Self::join_all(workers));
                    return Err(e);
                }
            };
            workers.push(spawned);

            if i + 1 < self.config.transactions {
                let delay = self.config.stagger.sample(&mut rng);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
        }

        let mut reports = Vec::with_capacity(workers.len());
        let mut first_error = None;
        for result in self.retire(Self::join_all(workers)) {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        reports.sort_by_key(|r| r.id);
        let report = SimulationReport {
            transactions: reports,
            stats: self.manager.stats().snapshot(),
            elapsed: start.elapsed(),
        };
        info!(
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            restarts = report.total_restarts(),
            "simulation finished"
        );
        Ok(report)
    }

    fn spawn_worker(&self) -> SimResult<(TransactionId, JoinHandle<SimResult<TransactionReport>>)> {
        let mut txn = self.manager.begin();
        let id = txn.id();
        let seed = self.config.seed.map(|s| s.wrapping_add(id.as_u64()));
        let mut runner = Runner::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.plan),
            Arc::clone(&self.config),
            seed,
        );
        debug!(txn = %id, timestamp = %txn.timestamp(), "spawning worker");

        let handle = thread::Builder::new()
            .name(format!("txn-{}", id.as_u64()))
            .spawn(move || -> SimResult<TransactionReport> {
                let summary: RunSummary = runner.run(&mut txn)?;
                Ok(TransactionReport {
                    id: txn.id(),
                    initial_timestamp: txn.initial_timestamp(),
                    final_timestamp: txn.timestamp(),
                    restarts: txn.restarts(),
                    waits: summary.waits,
                    wakeups: summary.wakeups,
                    committed: txn.status() == waitdie_core::TransactionStatus::Committed,
                })
            });
        match handle {
            Ok(handle) => Ok((id, handle)),
            Err(e) => {
                self.manager.registry().forget(id);
                Err(e.into())
            }
        }
    }

    /// Drops joined transactions from the registry.
    fn retire(
        &self,
        joined: Vec<(TransactionId, SimResult<TransactionReport>)>,
    ) -> Vec<SimResult<TransactionReport>> {
        joined
            .into_iter()
            .map(|(id, result)| {
                self.manager.registry().forget(id);
                result
            })
            .collect()
    }

    fn join_all(
        workers: Vec<(TransactionId, JoinHandle<SimResult<TransactionReport>>)>,
    ) -> Vec<(TransactionId, SimResult<TransactionReport>)> {
        workers
            .into_iter()
            .map(|(id, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(SimError::WorkerPanicked { id }));
                (id, result)
            })
            .collect()
    }
}
