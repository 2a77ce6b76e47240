//! # Wait-Die Simulation
//!
//! Drives transactions against a [`waitdie_core::LockManager`], one OS thread
//! per transaction.
//!
//! This crate provides:
//! - Work plans acquiring resources in a fixed global order
//! - The per-transaction runner (wait on wake signals, unwind and restart on abort)
//! - The start-up driver with staggered creation and a final report
//!
//! ## Usage
//!
//! ```rust,ignore
//! use waitdie_sim::{SimConfig, Simulation};
//!
//! let report = Simulation::new(SimConfig::fast().transactions(8))?.run()?;
//! assert!(report.all_committed());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod plan;
mod runner;
mod simulation;

pub use config::{Jitter, SimConfig};
pub use error::{SimError, SimResult};
pub use plan::{Step, WorkPlan};
pub use runner::{RunSummary, Runner};
pub use simulation::{Simulation, SimulationReport, TransactionReport};
