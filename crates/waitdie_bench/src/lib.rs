//! Benchmark utilities.

use waitdie_core::{Config, LockManager, ResourceId};

/// Creates a lock manager with `count` resources named `R0..`, events off.
pub fn manager_with_resources(count: usize) -> LockManager {
    let names: Vec<_> = (0..count).map(|i| format!("R{i}")).collect();
    LockManager::with_resources(Config::new().publish_events(false), names)
        .expect("generated resource names are unique")
}

/// Resource id `R{index}`.
pub fn resource(index: usize) -> ResourceId {
    ResourceId::new(format!("R{index}"))
}
