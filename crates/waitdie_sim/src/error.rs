//! Error types for the simulation driver.

use std::io;
use thiserror::Error;
use waitdie_core::{CoreError, TransactionId};

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur while running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Lock manager error.
    #[error("lock manager error: {0}")]
    Core(#[from] CoreError),

    /// A transaction exceeded the configured restart bound.
    #[error("{id} starved after {restarts} restarts")]
    Starved {
        /// The starving transaction.
        id: TransactionId,
        /// Restarts performed before giving up.
        restarts: u32,
    },

    /// A worker thread panicked.
    #[error("worker for {id} panicked")]
    WorkerPanicked {
        /// The transaction the worker was running.
        id: TransactionId,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] io::Error),

    /// The configuration or work plan is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl SimError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
