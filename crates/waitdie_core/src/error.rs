//! Error types for the lock manager core.

use crate::transaction::TransactionStatus;
use crate::types::{ResourceId, TransactionId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in lock manager operations.
///
/// Losing a Wait-Die comparison is not an error; it is reported through
/// [`crate::AcquireOutcome::Aborted`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// The resource is not registered with the lock manager.
    #[error("unknown resource: {resource}")]
    UnknownResource {
        /// The resource that was requested.
        resource: ResourceId,
    },

    /// A resource with this name is already registered.
    #[error("resource already registered: {resource}")]
    DuplicateResource {
        /// The duplicated resource.
        resource: ResourceId,
    },

    /// The transaction is not present in the registry.
    #[error("unknown transaction: {id}")]
    UnknownTransaction {
        /// The missing transaction.
        id: TransactionId,
    },

    /// Operation not permitted in the transaction's current state.
    #[error("{id} is {status:?}: {message}")]
    InvalidState {
        /// The transaction.
        id: TransactionId,
        /// Its status at the time of the call.
        status: TransactionStatus,
        /// Why the operation was refused.
        message: String,
    },

    /// The transaction still holds locks where it must hold none.
    #[error("{id} still holds {held} lock(s)")]
    LocksStillHeld {
        /// The transaction.
        id: TransactionId,
        /// Number of resources still held.
        held: usize,
    },
}

impl CoreError {
    /// Creates an unknown resource error.
    pub fn unknown_resource(resource: &ResourceId) -> Self {
        Self::UnknownResource {
            resource: resource.clone(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(
        id: TransactionId,
        status: TransactionStatus,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            id,
            status,
            message: message.into(),
        }
    }
}
