//! Transaction lifecycle.
//!
//! A transaction is owned by the worker that runs it. The parts other workers
//! must observe (id, timestamp, status) live in a shared cell referenced by the
//! [`TransactionRegistry`], so the lock manager can resolve a lock holder's
//! priority without touching the holder's owned state.

mod registry;
mod state;

pub(crate) use registry::TransactionCell;
pub use registry::TransactionRegistry;
pub use state::{Transaction, TransactionStatus};
