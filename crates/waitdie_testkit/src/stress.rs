//! Stress tests for the lock manager.
//!
//! These helpers hammer a shared [`LockManager`] from many threads and count
//! how often the protocol's safety properties were observed to break.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use waitdie_core::{AcquireOutcome, Config, LockManager, ResourceId};
use waitdie_sim::{SimConfig, SimResult, Simulation, SimulationReport};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Transactions that committed.
    pub commits: usize,
    /// Aborts observed (and recovered from).
    pub aborts: usize,
    /// Times a thread saw another holder inside its critical section.
    pub exclusion_violations: usize,
    /// Times an aborted transaction still held a lock after unwinding.
    pub leaked_locks: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns true if no safety property was violated.
    pub fn is_clean(&self) -> bool {
        self.exclusion_violations == 0 && self.leaked_locks == 0
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Transactions each thread commits.
    pub rounds: usize,
    /// Resources, in acquisition order.
    pub resources: Vec<ResourceId>,
    /// Time spent holding all locks.
    pub hold: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            rounds: 50,
            resources: vec![ResourceId::new("X"), ResourceId::new("Y")],
            hold: Duration::from_micros(50),
        }
    }
}

/// Runs transactions that acquire every resource in order, hold them briefly,
/// and commit, restarting on abort.
///
/// Each resource has an occupancy counter that holders bump while they are
/// inside the critical section; any reading above one is a mutual exclusion
/// violation.
pub fn stress_contention(config: &StressConfig) -> StressTestResult {
    let manager = Arc::new(
        LockManager::with_resources(Config::new().event_history(0), config.resources.clone())
            .expect("stress resources must be unique"),
    );
    let occupancy: Arc<Vec<AtomicUsize>> =
        Arc::new(config.resources.iter().map(|_| AtomicUsize::new(0)).collect());
    let commits = Arc::new(AtomicUsize::new(0));
    let aborts = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));
    let leaks = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let occupancy = Arc::clone(&occupancy);
            let commits = Arc::clone(&commits);
            let aborts = Arc::clone(&aborts);
            let violations = Arc::clone(&violations);
            let leaks = Arc::clone(&leaks);
            let resources = config.resources.clone();
            let rounds = config.rounds;
            let hold = config.hold;

            thread::spawn(move || {
                for _ in 0..rounds {
                    let mut txn = manager.begin();
                    'attempt: loop {
                        for resource in &resources {
                            loop {
                                match manager.acquire(&mut txn, resource).expect("known resource") {
                                    AcquireOutcome::Granted => break,
                                    AcquireOutcome::WaitingQueued => {
                                        txn.wait_for_wake(Duration::from_millis(2));
                                    }
                                    AcquireOutcome::Aborted => {
                                        aborts.fetch_add(1, Ordering::Relaxed);
                                        manager.release_all(&mut txn).expect("release");
                                        if !txn.held().is_empty() {
                                            leaks.fetch_add(1, Ordering::Relaxed);
                                        }
                                        manager.restart(&mut txn).expect("restart");
                                        continue 'attempt;
                                    }
                                }
                            }
                        }

                        for slot in occupancy.iter() {
                            if slot.fetch_add(1, Ordering::SeqCst) != 0 {
                                violations.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        thread::sleep(hold);
                        for slot in occupancy.iter() {
                            slot.fetch_sub(1, Ordering::SeqCst);
                        }

                        manager.commit(&mut txn).expect("commit");
                        commits.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult {
        commits: commits.load(Ordering::Relaxed),
        aborts: aborts.load(Ordering::Relaxed),
        exclusion_violations: violations.load(Ordering::Relaxed),
        leaked_locks: leaks.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}

/// Runs `runs` independent simulations, seeding each differently.
pub fn stress_simulations(runs: u64, config: &SimConfig) -> SimResult<Vec<SimulationReport>> {
    (0..runs)
        .map(|i| {
            let seed = config.seed.map(|s| s.wrapping_add(i * 1_000));
            Simulation::new(config.clone().seed(seed))?.run()
        })
        .collect()
}
