//! Exclusive resource locks and the Wait-Die lock manager.

mod manager;
mod resource;

pub use manager::{AcquireOutcome, LockManager};
pub use resource::{Contention, MutexResourceLock, ReleaseOutcome, ResourceLock, TryAcquire};
