//! Transaction registry.

use crate::clock::TimestampAuthority;
use crate::transaction::TransactionStatus;
use crate::types::{Timestamp, TransactionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Shared, atomically updated part of a transaction.
#[derive(Debug)]
pub(crate) struct TransactionCell {
    id: TransactionId,
    timestamp: AtomicU64,
    status: AtomicU8,
}

impl TransactionCell {
    fn new(id: TransactionId, timestamp: Timestamp) -> Self {
        Self {
            id,
            timestamp: AtomicU64::new(timestamp.as_u64()),
            status: AtomicU8::new(TransactionStatus::Active as u8),
        }
    }

    pub(crate) fn id(&self) -> TransactionId {
        self.id
    }

    pub(crate) fn timestamp(&self) -> Timestamp {
        Timestamp::new(self.timestamp.load(Ordering::SeqCst))
    }

    pub(crate) fn status(&self) -> TransactionStatus {
        TransactionStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub(crate) fn set_status(&self, status: TransactionStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    /// Installs a new timestamp, then flips back to `Active`.
    pub(crate) fn reactivate(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp.as_u64(), Ordering::SeqCst);
        self.set_status(TransactionStatus::Active);
    }
}

/// Process-wide view of every transaction created by one lock manager.
///
/// The lock manager resolves lock holders through the registry to compare
/// priorities. Entries stay until the owner calls [`Self::forget`] for a
/// transaction that has finished; a simulation does this once its workers
/// have joined.
#[derive(Debug)]
pub struct TransactionRegistry {
    authority: TimestampAuthority,
    next_id: AtomicU64,
    txns: RwLock<HashMap<TransactionId, Arc<TransactionCell>>>,
}

impl TransactionRegistry {
    /// Creates an empty registry drawing timestamps from `authority`.
    #[must_use]
    pub fn new(authority: TimestampAuthority) -> Self {
        Self {
            authority,
            next_id: AtomicU64::new(1),
            txns: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the timestamp authority.
    #[must_use]
    pub fn authority(&self) -> &TimestampAuthority {
        &self.authority
    }

    /// Registers a new active transaction with an explicit timestamp.
    pub(crate) fn register(&self, timestamp: Timestamp) -> Arc<TransactionCell> {
        let id = TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let cell = Arc::new(TransactionCell::new(id, timestamp));
        self.txns.write().insert(id, Arc::clone(&cell));
        cell
    }

    /// Returns the current timestamp of a registered transaction.
    #[must_use]
    pub fn timestamp_of(&self, id: TransactionId) -> Option<Timestamp> {
        self.txns.read().get(&id).map(|cell| cell.timestamp())
    }

    /// Returns the current status of a registered transaction.
    #[must_use]
    pub fn status_of(&self, id: TransactionId) -> Option<TransactionStatus> {
        self.txns.read().get(&id).map(|cell| cell.status())
    }

    /// Removes a finished transaction. Returns true if it was registered.
    ///
    /// The lock manager rejects a forgotten handle with
    /// [`crate::CoreError::UnknownTransaction`].
    pub fn forget(&self, id: TransactionId) -> bool {
        self.txns.write().remove(&id).is_some()
    }

    /// Returns true if `cell` is the entry registered under its id.
    pub(crate) fn contains(&self, cell: &TransactionCell) -> bool {
        self.txns
            .read()
            .get(&cell.id())
            .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(entry), cell))
    }

    /// Number of registered transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.txns.read().len()
    }

    /// Returns true if no transaction is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.txns.read().is_empty()
    }

    /// IDs of all registered transactions, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<TransactionId> {
        let mut ids: Vec<_> = self.txns.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new(TimestampAuthority::new())
    }
}
