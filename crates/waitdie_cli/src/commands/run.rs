//! Run command - execute a simulation and report the outcome.

use std::thread::{self, JoinHandle};
use tracing::{info, warn};
use waitdie_core::LockEvent;
use waitdie_sim::{SimConfig, Simulation};

/// Options collected from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of transactions.
    pub transactions: usize,
    /// Resource names, in acquisition order.
    pub resources: Vec<String>,
    /// Random seed.
    pub seed: Option<u64>,
    /// Restart bound.
    pub max_restarts: Option<u32>,
    /// Use the fast timing preset.
    pub fast: bool,
}

impl RunOptions {
    fn to_config(&self) -> SimConfig {
        let base = if self.fast {
            SimConfig::fast()
        } else {
            SimConfig::new()
        };
        let bound = self.max_restarts.or(base.max_restarts);
        base.transactions(self.transactions)
            .resources(self.resources.iter().map(|r| r.trim().to_owned()))
            .seed(self.seed)
            .max_restarts(bound)
    }
}

/// Runs a simulation and prints the report.
pub fn run(options: &RunOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.to_config();
    let sim = Simulation::new(config)?;

    // Narrate lock decisions while the workers run.
    let events = sim.manager().subscribe();
    let narrator = thread::spawn(move || {
        for record in events {
            info!("{}", describe(&record.event));
        }
    });

    let result = sim.run();
    drop(sim);
    finish_narrator(narrator);
    let report = result?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => report.print_summary(),
    }

    if !report.all_committed() {
        return Err("not every transaction committed".into());
    }
    Ok(())
}

/// Joins the narrator thread. Returns false if it panicked.
fn finish_narrator(narrator: JoinHandle<()>) -> bool {
    if narrator.join().is_err() {
        warn!("event narrator panicked; later lock events were not logged");
        return false;
    }
    true
}

fn describe(event: &LockEvent) -> String {
    match event {
        LockEvent::Granted { txn, resource } => format!("{txn} acquired {resource}"),
        LockEvent::Queued {
            txn,
            txn_ts,
            resource,
            holder,
            holder_ts,
        } => format!("{txn} ({txn_ts}) waits for {holder} ({holder_ts}) on {resource}"),
        LockEvent::Died {
            txn,
            txn_ts,
            resource,
            holder,
            holder_ts,
        } => format!(
            "{txn} ({txn_ts}) is younger than {holder} ({holder_ts}) on {resource} and dies"
        ),
        LockEvent::Released { txn, resource } => format!("{txn} released {resource}"),
        LockEvent::Notified { txn, resource } => {
            format!("{txn} notified to retry {resource}")
        }
        LockEvent::Anomaly {
            txn,
            resource,
            holder,
        } => format!("{txn} denied {resource}: holder {holder} not found"),
        LockEvent::Restarted {
            txn,
            previous,
            timestamp,
        } => format!("{txn} restarted ({previous} -> {timestamp})"),
        LockEvent::Committed { txn } => format!("{txn} committed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitdie_core::{ResourceId, TransactionId};

    #[test]
    fn options_map_to_config() {
        let options = RunOptions {
            transactions: 3,
            resources: vec!["A".into(), " B".into()],
            seed: Some(5),
            max_restarts: None,
            fast: true,
        };
        let config = options.to_config();
        assert_eq!(config.transactions, 3);
        assert_eq!(config.resources, vec![ResourceId::new("A"), ResourceId::new("B")]);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.max_restarts, SimConfig::fast().max_restarts);
    }

    #[test]
    fn narrator_panic_is_reported() {
        let panicked = thread::spawn(|| panic!("narrator failed"));
        assert!(!finish_narrator(panicked));

        let clean = thread::spawn(|| {});
        assert!(finish_narrator(clean));
    }

    #[test]
    fn describes_commit() {
        let text = describe(&LockEvent::Committed {
            txn: TransactionId::new(4),
        });
        assert_eq!(text, "T4 committed");
    }
}
