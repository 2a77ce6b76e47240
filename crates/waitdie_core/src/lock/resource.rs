//! Per-resource lock state.

use crate::types::{ResourceId, TransactionId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// Verdict of a contention arbiter for a held resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contention {
    /// Queue the requester behind the holder.
    Wait,
    /// Refuse the requester outright.
    Die,
    /// The holder could not be resolved; refuse without queueing.
    HolderMissing,
}

/// Result of [`ResourceLock::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryAcquire {
    /// The requester is now (or already was) the holder.
    Granted,
    /// Another transaction holds the resource.
    Blocked {
        /// Current holder.
        holder: TransactionId,
        /// Whether the requester was placed in the waiter queue.
        queued: bool,
    },
    /// The recorded holder is unknown to the arbiter.
    HolderMissing {
        /// The unresolvable holder id.
        holder: TransactionId,
    },
}

/// Result of releasing a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The caller was not the holder; nothing changed.
    NoOp,
    /// The resource is free and nobody was waiting.
    Released,
    /// The resource is free and this waiter was popped to retry.
    ReleasedWithCandidate(TransactionId),
}

/// Exclusive lock state for one resource.
///
/// Every method runs as a single critical section. Implementations may use a
/// mutex, a lock-free structure, or a remote service, as long as each call is
/// atomic with respect to the others on the same resource.
///
/// # Invariants
///
/// - At most one holder at a time
/// - The holder is never in the waiter queue
/// - A transaction appears in the waiter queue at most once
/// - Release never hands the lock to a waiter; it only names a candidate
pub trait ResourceLock: Send + Sync + fmt::Debug {
    /// Returns the resource this lock guards.
    fn id(&self) -> &ResourceId;

    /// Tries to make `requester` the holder.
    ///
    /// If the resource is free (or already held by `requester`) it is granted.
    /// Otherwise `arbiter` is called with the holder's id inside the same
    /// critical section, and its verdict is applied before returning:
    /// [`Contention::Wait`] enqueues the requester, the other verdicts remove
    /// it from the queue.
    fn try_acquire(
        &self,
        requester: TransactionId,
        arbiter: &mut dyn FnMut(TransactionId) -> Contention,
    ) -> TryAcquire;

    /// Appends `txn` to the waiter queue.
    ///
    /// Only valid while another transaction holds the resource. Returns false
    /// (and changes nothing) when the resource is free, held by `txn`, or
    /// `txn` is already queued.
    fn enqueue_waiter(&self, txn: TransactionId) -> bool;

    /// Removes `txn` from the waiter queue. Returns true if it was queued.
    fn withdraw(&self, txn: TransactionId) -> bool;

    /// Releases the resource if `requester` holds it, popping the front waiter.
    fn release(&self, requester: TransactionId) -> ReleaseOutcome;

    /// Current holder, if any.
    fn holder(&self) -> Option<TransactionId>;

    /// Queued waiters, front first.
    fn waiters(&self) -> Vec<TransactionId>;
}

#[derive(Debug, Default)]
struct LockState {
    holder: Option<TransactionId>,
    waiters: VecDeque<TransactionId>,
}

impl LockState {
    fn enqueue(&mut self, txn: TransactionId) -> bool {
        match self.holder {
            Some(holder) if holder != txn && !self.waiters.contains(&txn) => {
                self.waiters.push_back(txn);
                true
            }
            _ => false,
        }
    }

    fn withdraw(&mut self, txn: TransactionId) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|&w| w != txn);
        self.waiters.len() != before
    }
}

/// [`ResourceLock`] backed by a `parking_lot` mutex.
pub struct MutexResourceLock {
    id: ResourceId,
    state: Mutex<LockState>,
}

impl MutexResourceLock {
    /// Creates a free lock for `id`.
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(LockState::default()),
        }
    }
}

impl ResourceLock for MutexResourceLock {
    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn try_acquire(
        &self,
        requester: TransactionId,
        arbiter: &mut dyn FnMut(TransactionId) -> Contention,
    ) -> TryAcquire {
        let mut state = self.state.lock();
        let current = state.holder;
        let holder = match current {
            None => {
                state.holder = Some(requester);
                state.withdraw(requester);
                return TryAcquire::Granted;
            }
            Some(holder) if holder == requester => return TryAcquire::Granted,
            Some(holder) => holder,
        };

        match arbiter(holder) {
            Contention::Wait => {
                state.enqueue(requester);
                TryAcquire::Blocked {
                    holder,
                    queued: true,
                }
            }
            Contention::Die => {
                state.withdraw(requester);
                TryAcquire::Blocked {
                    holder,
                    queued: false,
                }
            }
            Contention::HolderMissing => {
                state.withdraw(requester);
                TryAcquire::HolderMissing { holder }
            }
        }
    }

    fn enqueue_waiter(&self, txn: TransactionId) -> bool {
        self.state.lock().enqueue(txn)
    }

    fn withdraw(&self, txn: TransactionId) -> bool {
        self.state.lock().withdraw(txn)
    }

    fn release(&self, requester: TransactionId) -> ReleaseOutcome {
        let mut state = self.state.lock();
        if state.holder != Some(requester) {
            return ReleaseOutcome::NoOp;
        }
        state.holder = None;
        match state.waiters.pop_front() {
            Some(next) => ReleaseOutcome::ReleasedWithCandidate(next),
            None => ReleaseOutcome::Released,
        }
    }

    fn holder(&self) -> Option<TransactionId> {
        self.state.lock().holder
    }

    fn waiters(&self) -> Vec<TransactionId> {
        self.state.lock().waiters.iter().copied().collect()
    }
}

impl fmt::Debug for MutexResourceLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MutexResourceLock")
            .field("id", &self.id)
            .field("holder", &state.holder)
            .field("waiters", &state.waiters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T1: TransactionId = TransactionId::new(1);
    const T2: TransactionId = TransactionId::new(2);
    const T3: TransactionId = TransactionId::new(3);

    fn wait(_: TransactionId) -> Contention {
        Contention::Wait
    }

    fn die(_: TransactionId) -> Contention {
        Contention::Die
    }

    #[test]
    fn free_resource_is_granted() {
        let lock = MutexResourceLock::new("X");
        assert_eq!(lock.try_acquire(T1, &mut die), TryAcquire::Granted);
        assert_eq!(lock.holder(), Some(T1));
    }

    #[test]
    fn holder_reacquire_is_granted_without_arbiter() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);
        let mut called = false;
        let result = lock.try_acquire(T1, &mut |_| {
            called = true;
            Contention::Die
        });
        assert_eq!(result, TryAcquire::Granted);
        assert!(!called);
    }

    #[test]
    fn arbiter_sees_holder_and_wait_enqueues() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);

        let mut seen = None;
        let result = lock.try_acquire(T2, &mut |holder| {
            seen = Some(holder);
            Contention::Wait
        });
        assert_eq!(seen, Some(T1));
        assert_eq!(
            result,
            TryAcquire::Blocked {
                holder: T1,
                queued: true
            }
        );
        assert_eq!(lock.waiters(), vec![T2]);
    }

    #[test]
    fn repeated_wait_does_not_duplicate() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);
        lock.try_acquire(T2, &mut wait);
        lock.try_acquire(T2, &mut wait);
        assert_eq!(lock.waiters(), vec![T2]);
    }

    #[test]
    fn die_withdraws_from_queue() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);
        lock.try_acquire(T2, &mut wait);
        let result = lock.try_acquire(T2, &mut die);
        assert_eq!(
            result,
            TryAcquire::Blocked {
                holder: T1,
                queued: false
            }
        );
        assert!(lock.waiters().is_empty());
    }

    #[test]
    fn holder_missing_is_reported() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);
        let result = lock.try_acquire(T2, &mut |_| Contention::HolderMissing);
        assert_eq!(result, TryAcquire::HolderMissing { holder: T1 });
        assert_eq!(lock.holder(), Some(T1));
        assert!(lock.waiters().is_empty());
    }

    #[test]
    fn enqueue_waiter_rules() {
        let lock = MutexResourceLock::new("X");
        assert!(!lock.enqueue_waiter(T2), "free resource takes no waiters");

        lock.try_acquire(T1, &mut die);
        assert!(!lock.enqueue_waiter(T1), "holder cannot wait on itself");
        assert!(lock.enqueue_waiter(T2));
        assert!(!lock.enqueue_waiter(T2));
        assert!(lock.enqueue_waiter(T3));
        assert_eq!(lock.waiters(), vec![T2, T3]);
    }

    #[test]
    fn withdraw_removes_only_target() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);
        lock.enqueue_waiter(T2);
        lock.enqueue_waiter(T3);
        assert!(lock.withdraw(T2));
        assert!(!lock.withdraw(T2));
        assert_eq!(lock.waiters(), vec![T3]);
    }

    #[test]
    fn release_by_non_holder_is_noop() {
        let lock = MutexResourceLock::new("X");
        assert_eq!(lock.release(T1), ReleaseOutcome::NoOp);
        lock.try_acquire(T1, &mut die);
        assert_eq!(lock.release(T2), ReleaseOutcome::NoOp);
        assert_eq!(lock.holder(), Some(T1));
    }

    #[test]
    fn release_pops_front_waiter_without_handoff() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);
        lock.enqueue_waiter(T2);
        lock.enqueue_waiter(T3);

        assert_eq!(lock.release(T1), ReleaseOutcome::ReleasedWithCandidate(T2));
        assert_eq!(lock.holder(), None);
        assert_eq!(lock.waiters(), vec![T3]);

        // Double release is harmless.
        assert_eq!(lock.release(T1), ReleaseOutcome::NoOp);
    }

    #[test]
    fn grant_withdraws_candidate_from_queue() {
        let lock = MutexResourceLock::new("X");
        lock.try_acquire(T1, &mut die);
        lock.enqueue_waiter(T2);
        lock.enqueue_waiter(T3);
        lock.release(T1);

        // T3 wins the race for the free resource; it must leave the queue.
        assert_eq!(lock.try_acquire(T3, &mut die), TryAcquire::Granted);
        assert!(lock.waiters().is_empty());
        assert_eq!(lock.release(T3), ReleaseOutcome::Released);
    }
}
