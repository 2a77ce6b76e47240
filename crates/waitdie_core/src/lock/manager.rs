//! Lock manager implementing Wait-Die.

use crate::clock::TimestampAuthority;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::events::{EventFeed, EventRecord, LockEvent};
use crate::lock::resource::{
    Contention, MutexResourceLock, ReleaseOutcome, ResourceLock, TryAcquire,
};
use crate::notify::WakeNotifier;
use crate::stats::LockStats;
use crate::transaction::{Transaction, TransactionRegistry, TransactionStatus};
use crate::types::{ResourceId, Timestamp, TransactionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of [`LockManager::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The transaction now holds the resource.
    Granted,
    /// The transaction is older than the holder and was queued. It holds
    /// nothing new and must retry after a wake signal or a timeout.
    WaitingQueued,
    /// The transaction lost the Wait-Die comparison (or the holder could not
    /// be resolved) and is now `Aborted`. It must release what it holds and
    /// restart.
    Aborted,
}

/// Grants exclusive resource locks under the Wait-Die protocol.
///
/// When a resource is held, the requester's timestamp is compared with the
/// holder's:
/// - **Wait**: requester strictly older → queued, retries later
/// - **Die**: requester same age or younger → marked `Aborted`
///
/// Waits only ever go from older to younger transactions, so no wait cycle can
/// form and no deadlock detection is needed.
///
/// The comparison, the queueing and the `Aborted` mark all happen inside the
/// contended resource's critical section, so the holder cannot release (and
/// restart with a new timestamp) halfway through a decision.
pub struct LockManager {
    config: Config,
    registry: Arc<TransactionRegistry>,
    resources: RwLock<HashMap<ResourceId, Arc<dyn ResourceLock>>>,
    notifier: WakeNotifier,
    events: EventFeed,
    stats: LockStats,
}

impl LockManager {
    /// Creates a lock manager with no resources and a monotonic clock.
    pub fn new(config: Config) -> Self {
        Self::with_authority(config, TimestampAuthority::new())
    }

    /// Creates a lock manager drawing timestamps from `authority`.
    pub fn with_authority(config: Config, authority: TimestampAuthority) -> Self {
        Self::with_registry(config, Arc::new(TransactionRegistry::new(authority)))
    }

    /// Creates a lock manager over an existing registry.
    pub fn with_registry(config: Config, registry: Arc<TransactionRegistry>) -> Self {
        let events = EventFeed::with_max_history(config.event_history);
        Self {
            config,
            registry,
            resources: RwLock::new(HashMap::new()),
            notifier: WakeNotifier::new(),
            events,
            stats: LockStats::new(),
        }
    }

    /// Creates a lock manager with one mutex-backed lock per name.
    pub fn with_resources<I, R>(config: Config, names: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<ResourceId>,
    {
        let manager = Self::new(config);
        for name in names {
            manager.add_resource(name)?;
        }
        Ok(manager)
    }

    /// Registers a mutex-backed lock for `resource`.
    pub fn add_resource(&self, resource: impl Into<ResourceId>) -> CoreResult<()> {
        self.add_resource_lock(Arc::new(MutexResourceLock::new(resource)))
    }

    /// Registers a lock using any [`ResourceLock`] backend.
    pub fn add_resource_lock(&self, lock: Arc<dyn ResourceLock>) -> CoreResult<()> {
        let mut resources = self.resources.write();
        let id = lock.id().clone();
        if resources.contains_key(&id) {
            return Err(CoreError::DuplicateResource { resource: id });
        }
        resources.insert(id, lock);
        Ok(())
    }

    /// Returns the registered resource names, sorted.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceId> {
        let mut ids: Vec<_> = self.resources.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn resource(&self, resource: &ResourceId) -> CoreResult<Arc<dyn ResourceLock>> {
        self.resources
            .read()
            .get(resource)
            .cloned()
            .ok_or_else(|| CoreError::unknown_resource(resource))
    }

    /// Starts a new transaction with a fresh timestamp.
    pub fn begin(&self) -> Transaction {
        let timestamp = self.registry.authority().issue();
        self.begin_with_timestamp(timestamp)
    }

    /// Starts a new transaction with an explicit timestamp.
    ///
    /// The caller is responsible for keeping timestamps of live transactions
    /// distinct; equal timestamps resolve in favour of the holder.
    pub fn begin_with_timestamp(&self, timestamp: Timestamp) -> Transaction {
        let cell = self.registry.register(timestamp);
        let wake = self.notifier.register(cell.id());
        debug!(txn = %cell.id(), %timestamp, "transaction started");
        Transaction::new(cell, wake)
    }

    /// Requests an exclusive lock on `resource` for `txn`.
    ///
    /// Never blocks beyond the resource's short critical section.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is not registered, `txn` was not
    /// begun on this manager, or `txn` is not active.
    pub fn acquire(
        &self,
        txn: &mut Transaction,
        resource: &ResourceId,
    ) -> CoreResult<AcquireOutcome> {
        let lock = self.resource(resource)?;
        self.ensure_registered(txn)?;
        let status = txn.status();
        if status != TransactionStatus::Active {
            return Err(CoreError::invalid_state(
                txn.id(),
                status,
                "only an active transaction can acquire locks",
            ));
        }

        let id = txn.id();
        let requester_ts = txn.timestamp();
        let cell = txn.cell();
        let registry = &self.registry;
        let mut holder_ts = None;

        let result = lock.try_acquire(id, &mut |holder| {
            let Some(ts) = registry.timestamp_of(holder) else {
                cell.set_status(TransactionStatus::Aborted);
                return Contention::HolderMissing;
            };
            holder_ts = Some(ts);
            if requester_ts.is_older_than(ts) {
                Contention::Wait
            } else {
                cell.set_status(TransactionStatus::Aborted);
                Contention::Die
            }
        });
        let holder_ts = holder_ts.unwrap_or_default();

        match result {
            TryAcquire::Granted => {
                txn.record_acquired(resource);
                self.stats.record_grant();
                debug!(txn = %id, %resource, "lock granted");
                self.emit(LockEvent::Granted {
                    txn: id,
                    resource: resource.clone(),
                });
                Ok(AcquireOutcome::Granted)
            }
            TryAcquire::Blocked {
                holder,
                queued: true,
            } => {
                self.stats.record_wait();
                info!(
                    txn = %id, txn_ts = %requester_ts, %holder, %holder_ts, %resource,
                    "older requester waits"
                );
                self.emit(LockEvent::Queued {
                    txn: id,
                    txn_ts: requester_ts,
                    resource: resource.clone(),
                    holder,
                    holder_ts,
                });
                Ok(AcquireOutcome::WaitingQueued)
            }
            TryAcquire::Blocked {
                holder,
                queued: false,
            } => {
                self.withdraw_everywhere(id);
                self.stats.record_death();
                info!(
                    txn = %id, txn_ts = %requester_ts, %holder, %holder_ts, %resource,
                    "younger requester dies"
                );
                self.emit(LockEvent::Died {
                    txn: id,
                    txn_ts: requester_ts,
                    resource: resource.clone(),
                    holder,
                    holder_ts,
                });
                Ok(AcquireOutcome::Aborted)
            }
            TryAcquire::HolderMissing { holder } => {
                self.withdraw_everywhere(id);
                self.stats.record_anomaly();
                error!(
                    txn = %id, %holder, %resource,
                    "lock holder not found in registry; denying lock"
                );
                self.emit(LockEvent::Anomaly {
                    txn: id,
                    resource: resource.clone(),
                    holder,
                });
                Ok(AcquireOutcome::Aborted)
            }
        }
    }

    /// Releases `resource` if `txn` holds it.
    ///
    /// Releasing a resource the transaction does not hold is a no-op. When a
    /// waiter is popped, only that waiter receives a wake signal; it still has
    /// to call [`Self::acquire`] again and may lose the race.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is not registered or `txn` was not
    /// begun on this manager.
    pub fn release(
        &self,
        txn: &mut Transaction,
        resource: &ResourceId,
    ) -> CoreResult<ReleaseOutcome> {
        let lock = self.resource(resource)?;
        self.ensure_registered(txn)?;
        let id = txn.id();
        let outcome = lock.release(id);

        match outcome {
            ReleaseOutcome::NoOp => {
                self.stats.record_noop_release();
                debug!(txn = %id, %resource, "release by non-holder ignored");
                return Ok(outcome);
            }
            ReleaseOutcome::Released | ReleaseOutcome::ReleasedWithCandidate(_) => {
                txn.record_released(resource);
                self.stats.record_release();
                debug!(txn = %id, %resource, "lock released");
                self.emit(LockEvent::Released {
                    txn: id,
                    resource: resource.clone(),
                });
            }
        }

        if let ReleaseOutcome::ReleasedWithCandidate(next) = outcome {
            if self.notifier.notify(next, resource) {
                self.stats.record_wakeup();
                debug!(txn = %next, %resource, "waiter notified");
                self.emit(LockEvent::Notified {
                    txn: next,
                    resource: resource.clone(),
                });
            }
        }

        Ok(outcome)
    }

    /// Releases every resource `txn` holds, most recently acquired first.
    ///
    /// Returns how many resources were released.
    pub fn release_all(&self, txn: &mut Transaction) -> CoreResult<usize> {
        let held: Vec<_> = txn.held().iter().rev().cloned().collect();
        let mut released = 0;
        for resource in &held {
            if self.release(txn, resource)? != ReleaseOutcome::NoOp {
                released += 1;
            }
        }
        Ok(released)
    }

    /// Reactivates `txn` with a timestamp strictly greater than its last one.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is unknown to this manager, still holds
    /// locks, or has committed.
    pub fn restart(&self, txn: &mut Transaction) -> CoreResult<Timestamp> {
        self.ensure_registered(txn)?;
        let status = txn.status();
        if status == TransactionStatus::Committed {
            return Err(CoreError::invalid_state(
                txn.id(),
                status,
                "a committed transaction cannot restart",
            ));
        }
        if !txn.held().is_empty() {
            return Err(CoreError::LocksStillHeld {
                id: txn.id(),
                held: txn.held().len(),
            });
        }

        let previous = txn.timestamp();
        let timestamp = self.registry.authority().issue_after(previous);
        txn.record_restart(timestamp);
        txn.drain_wakes();

        self.stats.record_restart();
        info!(txn = %txn.id(), %previous, %timestamp, "transaction restarted");
        self.emit(LockEvent::Restarted {
            txn: txn.id(),
            previous,
            timestamp,
        });
        Ok(timestamp)
    }

    /// Releases everything `txn` holds and marks it committed.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is unknown to this manager or not active.
    pub fn commit(&self, txn: &mut Transaction) -> CoreResult<()> {
        self.ensure_registered(txn)?;
        let status = txn.status();
        if status != TransactionStatus::Active {
            return Err(CoreError::invalid_state(
                txn.id(),
                status,
                "only an active transaction can commit",
            ));
        }

        self.release_all(txn)?;
        self.withdraw_everywhere(txn.id());
        self.notifier.unregister(txn.id());
        txn.cell().set_status(TransactionStatus::Committed);

        self.stats.record_commit();
        info!(txn = %txn.id(), restarts = txn.restarts(), "transaction committed");
        self.emit(LockEvent::Committed { txn: txn.id() });
        Ok(())
    }

    fn ensure_registered(&self, txn: &Transaction) -> CoreResult<()> {
        if self.registry.contains(txn.cell()) {
            Ok(())
        } else {
            Err(CoreError::UnknownTransaction { id: txn.id() })
        }
    }

    /// Drops `id` from every waiter queue. Aborted and committed
    /// transactions are never waiters.
    fn withdraw_everywhere(&self, id: TransactionId) {
        let locks: Vec<_> = self.resources.read().values().cloned().collect();
        for lock in locks {
            if lock.withdraw(id) {
                debug!(txn = %id, resource = %lock.id(), "withdrawn from waiter queue");
            }
        }
    }

    /// Current holder of `resource`.
    pub fn holder_of(&self, resource: &ResourceId) -> CoreResult<Option<TransactionId>> {
        Ok(self.resource(resource)?.holder())
    }

    /// Waiters queued on `resource`, front first.
    pub fn waiters_of(&self, resource: &ResourceId) -> CoreResult<Vec<TransactionId>> {
        Ok(self.resource(resource)?.waiters())
    }

    /// Number of transactions with an open wake channel.
    #[must_use]
    pub fn wake_channels(&self) -> usize {
        self.notifier.channel_count()
    }

    /// Returns the transaction registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<TransactionRegistry> {
        &self.registry
    }

    /// Returns the decision counters.
    #[must_use]
    pub fn stats(&self) -> &LockStats {
        &self.stats
    }

    /// Returns the event feed.
    #[must_use]
    pub fn events(&self) -> &EventFeed {
        &self.events
    }

    /// Subscribes to future lock events.
    pub fn subscribe(&self) -> Receiver<EventRecord> {
        self.events.subscribe()
    }

    fn emit(&self, event: LockEvent) {
        if self.config.publish_events {
            self.events.emit(event);
        }
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("resources", &self.resources())
            .field("transactions", &self.registry.len())
            .field("wake_channels", &self.notifier.channel_count())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::WaitResult;
    use std::time::Duration;

    fn create_manager() -> LockManager {
        let manager = LockManager::with_authority(
            Config::default(),
            TimestampAuthority::with_clock(Box::new(ManualClock::new(1_000))),
        );
        manager.add_resource("X").unwrap();
        manager.add_resource("Y").unwrap();
        manager
    }

    fn x() -> ResourceId {
        ResourceId::new("X")
    }

    fn y() -> ResourceId {
        ResourceId::new("Y")
    }

    #[test]
    fn free_resource_is_granted() {
        let lm = create_manager();
        let mut t = lm.begin();
        assert_eq!(lm.acquire(&mut t, &x()).unwrap(), AcquireOutcome::Granted);
        assert_eq!(lm.holder_of(&x()).unwrap(), Some(t.id()));
        assert_eq!(t.held(), &[x()]);
    }

    #[test]
    fn older_requester_waits() {
        let lm = create_manager();
        let mut young = lm.begin_with_timestamp(Timestamp::new(10));
        let mut old = lm.begin_with_timestamp(Timestamp::new(2));

        lm.acquire(&mut young, &x()).unwrap();
        assert_eq!(
            lm.acquire(&mut old, &x()).unwrap(),
            AcquireOutcome::WaitingQueued
        );
        assert!(old.is_active());
        assert!(old.held().is_empty());
        assert_eq!(lm.waiters_of(&x()).unwrap(), vec![old.id()]);
    }

    #[test]
    fn younger_requester_dies() {
        let lm = create_manager();
        let mut old = lm.begin_with_timestamp(Timestamp::new(5));
        let mut young = lm.begin_with_timestamp(Timestamp::new(10));

        lm.acquire(&mut old, &y()).unwrap();
        assert_eq!(lm.acquire(&mut young, &y()).unwrap(), AcquireOutcome::Aborted);
        assert_eq!(young.status(), TransactionStatus::Aborted);
        assert!(lm.waiters_of(&y()).unwrap().is_empty());
    }

    #[test]
    fn equal_timestamps_favour_holder() {
        let lm = create_manager();
        let mut a = lm.begin_with_timestamp(Timestamp::new(7));
        let mut b = lm.begin_with_timestamp(Timestamp::new(7));

        lm.acquire(&mut a, &x()).unwrap();
        assert_eq!(lm.acquire(&mut b, &x()).unwrap(), AcquireOutcome::Aborted);
    }

    #[test]
    fn aborted_transaction_cannot_acquire() {
        let lm = create_manager();
        let mut old = lm.begin_with_timestamp(Timestamp::new(1));
        let mut young = lm.begin_with_timestamp(Timestamp::new(2));
        lm.acquire(&mut old, &x()).unwrap();
        lm.acquire(&mut young, &x()).unwrap();

        let err = lm.acquire(&mut young, &y()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[test]
    fn unknown_resource_is_an_error() {
        let lm = create_manager();
        let mut t = lm.begin();
        let z = ResourceId::new("Z");
        assert!(matches!(
            lm.acquire(&mut t, &z),
            Err(CoreError::UnknownResource { .. })
        ));
        assert!(matches!(
            lm.release(&mut t, &z),
            Err(CoreError::UnknownResource { .. })
        ));
    }

    #[test]
    fn duplicate_resource_is_rejected() {
        let lm = create_manager();
        assert!(matches!(
            lm.add_resource("X"),
            Err(CoreError::DuplicateResource { .. })
        ));
        assert_eq!(lm.resources(), vec![x(), y()]);
    }

    #[test]
    fn release_by_non_holder_is_noop() {
        let lm = create_manager();
        let mut a = lm.begin();
        let mut b = lm.begin();
        lm.acquire(&mut a, &x()).unwrap();

        assert_eq!(lm.release(&mut b, &x()).unwrap(), ReleaseOutcome::NoOp);
        assert_eq!(lm.release(&mut b, &y()).unwrap(), ReleaseOutcome::NoOp);
        assert_eq!(lm.holder_of(&x()).unwrap(), Some(a.id()));

        assert_eq!(lm.release(&mut a, &x()).unwrap(), ReleaseOutcome::Released);
        assert_eq!(lm.release(&mut a, &x()).unwrap(), ReleaseOutcome::NoOp);
        assert_eq!(lm.stats().snapshot().noop_releases, 3);
    }

    #[test]
    fn release_wakes_front_waiter_only() {
        let lm = create_manager();
        let mut holder = lm.begin_with_timestamp(Timestamp::new(50));
        let mut first = lm.begin_with_timestamp(Timestamp::new(10));
        let mut second = lm.begin_with_timestamp(Timestamp::new(20));

        lm.acquire(&mut holder, &x()).unwrap();
        lm.acquire(&mut first, &x()).unwrap();
        lm.acquire(&mut second, &x()).unwrap();

        assert_eq!(
            lm.release(&mut holder, &x()).unwrap(),
            ReleaseOutcome::ReleasedWithCandidate(first.id())
        );
        assert_eq!(
            first.wait_for_wake(Duration::from_millis(100)),
            WaitResult::Woken(x())
        );
        assert_eq!(
            second.wait_for_wake(Duration::from_millis(20)),
            WaitResult::TimedOut
        );
        assert_eq!(lm.waiters_of(&x()).unwrap(), vec![second.id()]);
    }

    #[test]
    fn death_withdraws_from_other_queues() {
        let lm = create_manager();
        let mut hx = lm.begin_with_timestamp(Timestamp::new(100));
        let mut hy = lm.begin_with_timestamp(Timestamp::new(1));
        let mut t = lm.begin_with_timestamp(Timestamp::new(50));

        lm.acquire(&mut hx, &x()).unwrap();
        lm.acquire(&mut hy, &y()).unwrap();
        assert_eq!(lm.acquire(&mut t, &x()).unwrap(), AcquireOutcome::WaitingQueued);
        assert_eq!(lm.acquire(&mut t, &y()).unwrap(), AcquireOutcome::Aborted);
        assert!(lm.waiters_of(&x()).unwrap().is_empty());
    }

    #[test]
    fn popped_waiter_must_reacquire() {
        let lm = create_manager();
        let mut holder = lm.begin_with_timestamp(Timestamp::new(10));
        let mut waiter = lm.begin_with_timestamp(Timestamp::new(2));

        lm.acquire(&mut holder, &x()).unwrap();
        lm.acquire(&mut waiter, &x()).unwrap();
        lm.release(&mut holder, &x()).unwrap();

        // Popping does not hand the lock over.
        assert_eq!(lm.holder_of(&x()).unwrap(), None);
        assert_eq!(lm.acquire(&mut waiter, &x()).unwrap(), AcquireOutcome::Granted);
    }

    #[test]
    fn restart_increases_timestamp() {
        let lm = create_manager();
        let mut old = lm.begin_with_timestamp(Timestamp::new(5));
        let mut young = lm.begin_with_timestamp(Timestamp::new(5_000));

        lm.acquire(&mut old, &x()).unwrap();
        lm.acquire(&mut young, &x()).unwrap();
        assert_eq!(young.status(), TransactionStatus::Aborted);

        let ts = lm.restart(&mut young).unwrap();
        assert!(ts > Timestamp::new(5_000));
        assert_eq!(young.timestamp(), ts);
        assert!(young.is_active());
        assert_eq!(young.restarts(), 1);
        assert_eq!(young.initial_timestamp(), Timestamp::new(5_000));
        assert_eq!(lm.registry().timestamp_of(young.id()), Some(ts));
    }

    #[test]
    fn restart_refused_while_holding_locks() {
        let lm = create_manager();
        let mut t = lm.begin();
        lm.acquire(&mut t, &x()).unwrap();
        assert!(matches!(
            lm.restart(&mut t),
            Err(CoreError::LocksStillHeld { held: 1, .. })
        ));
        lm.release_all(&mut t).unwrap();
        assert!(lm.restart(&mut t).is_ok());
    }

    #[test]
    fn commit_releases_everything() {
        let lm = create_manager();
        let mut t = lm.begin();
        lm.acquire(&mut t, &x()).unwrap();
        lm.acquire(&mut t, &y()).unwrap();
        lm.commit(&mut t).unwrap();

        assert_eq!(t.status(), TransactionStatus::Committed);
        assert!(t.held().is_empty());
        assert_eq!(lm.holder_of(&x()).unwrap(), None);
        assert_eq!(lm.holder_of(&y()).unwrap(), None);
        assert!(lm.restart(&mut t).is_err());
        assert!(lm.commit(&mut t).is_err());
    }

    #[test]
    fn missing_holder_denies_lock() {
        let lm = create_manager();
        let mut ghost = lm.begin_with_timestamp(Timestamp::new(1));
        let mut t = lm.begin_with_timestamp(Timestamp::new(2));
        lm.acquire(&mut ghost, &x()).unwrap();
        lm.registry().forget(ghost.id());

        assert_eq!(lm.acquire(&mut t, &x()).unwrap(), AcquireOutcome::Aborted);
        assert_eq!(lm.holder_of(&x()).unwrap(), Some(ghost.id()));
        assert_eq!(lm.stats().snapshot().anomalies, 1);
        assert!(lm
            .events()
            .history_for(t.id())
            .iter()
            .any(|e| matches!(e, LockEvent::Anomaly { .. })));
    }

    #[test]
    fn commit_closes_wake_channel() {
        let lm = create_manager();
        for _ in 0..100 {
            let mut t = lm.begin();
            lm.acquire(&mut t, &x()).unwrap();
            lm.commit(&mut t).unwrap();
        }
        let mut open = lm.begin();
        assert_eq!(lm.wake_channels(), 1);

        lm.commit(&mut open).unwrap();
        assert_eq!(lm.wake_channels(), 0);
        assert_eq!(open.wait_for_wake(Duration::from_millis(1)), WaitResult::TimedOut);
    }

    #[test]
    fn foreign_transaction_is_rejected() {
        let lm = create_manager();
        let other = create_manager();
        let mut mine = lm.begin();
        let mut foreign = other.begin();
        assert_eq!(mine.id(), foreign.id());

        lm.acquire(&mut mine, &x()).unwrap();
        assert!(matches!(
            lm.acquire(&mut foreign, &x()),
            Err(CoreError::UnknownTransaction { .. })
        ));
        assert!(matches!(
            lm.release(&mut foreign, &x()),
            Err(CoreError::UnknownTransaction { .. })
        ));
        assert!(lm.restart(&mut foreign).is_err());
        assert!(lm.commit(&mut foreign).is_err());
        assert_eq!(lm.holder_of(&x()).unwrap(), Some(mine.id()));
    }

    #[test]
    fn events_are_published_in_order() {
        let lm = create_manager();
        let rx = lm.subscribe();
        let mut t = lm.begin();
        lm.acquire(&mut t, &x()).unwrap();
        lm.commit(&mut t).unwrap();

        let kinds: Vec<_> = rx.try_iter().map(|r| r.event).collect();
        assert_eq!(kinds.len(), 3);
        assert!(matches!(kinds[0], LockEvent::Granted { .. }));
        assert!(matches!(kinds[1], LockEvent::Released { .. }));
        assert!(matches!(kinds[2], LockEvent::Committed { .. }));
    }

    #[test]
    fn events_can_be_disabled() {
        let lm = LockManager::with_resources(Config::new().publish_events(false), ["X"]).unwrap();
        let mut t = lm.begin();
        lm.acquire(&mut t, &x()).unwrap();
        assert_eq!(lm.events().history_len(), 0);
        assert_eq!(lm.stats().snapshot().grants, 1);
    }
}
