//! Keyed one-shot rendezvous store.
//!
//! Each registered key owns a slot (pending or resolved) and a wake signal.
//! Both live in the same map entry, so they are created and removed together.
//!
//! The map is behind a short synchronous lock. Waiters never hold it while
//! suspended; they block only on their own key's `Notify`.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use humangate_domain::{PendingSlot, SlotStatus, WaitError, WaitKind};

use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::ports::ClockPort;
use crate::infrastructure::settings::WaitSettings;

enum SlotState<V> {
    Pending,
    Resolved(V),
}

impl<V> SlotState<V> {
    fn status(&self) -> SlotStatus {
        match self {
            SlotState::Pending => SlotStatus::Pending,
            SlotState::Resolved(_) => SlotStatus::Resolved,
        }
    }
}

struct Slot<V> {
    state: SlotState<V>,
    signal: Arc<Notify>,
    /// Distinguishes this registration from later ones under the same key
    generation: u64,
    registered_at: DateTime<Utc>,
    awaited: bool,
}

/// Store of pending waits for one kind of human input.
pub struct WaitStore<K, V> {
    kind: WaitKind,
    entries: Mutex<HashMap<K, Slot<V>>>,
    next_generation: AtomicU64,
    settings: WaitSettings,
    clock: Arc<dyn ClockPort>,
}

impl<K, V> WaitStore<K, V>
where
    K: Eq + Hash + Clone + fmt::Display + Send,
    V: Send,
{
    pub fn new(kind: WaitKind, settings: WaitSettings) -> Self {
        Self::with_clock(kind, settings, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(kind: WaitKind, settings: WaitSettings, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            settings,
            clock,
        }
    }

    pub fn kind(&self) -> WaitKind {
        self.kind
    }

    pub fn settings(&self) -> &WaitSettings {
        &self.settings
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        // Every critical section leaves the map consistent, so a panic
        // elsewhere does not invalidate it.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a pending slot for `key`.
    ///
    /// Fails with `AlreadyRegistered` if the key is present in any state; a
    /// key can only be reused after its previous slot has been removed.
    pub fn register(&self, key: K) -> Result<(), WaitError> {
        let mut entries = self.entries();
        if entries.contains_key(&key) {
            tracing::warn!(kind = %self.kind, key = %key, "Rejected duplicate registration");
            return Err(WaitError::already_registered(self.kind, key.to_string()));
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = %self.kind, key = %key, generation, "Registered pending wait");
        entries.insert(
            key,
            Slot {
                state: SlotState::Pending,
                signal: Arc::new(Notify::new()),
                generation,
                registered_at: self.clock.now(),
                awaited: false,
            },
        );
        Ok(())
    }

    /// Deliver the answer for `key` and wake its waiter.
    ///
    /// Never blocks. Unknown keys are reported as `NotFound` and a second
    /// answer for the same registration as `AlreadyResolved`; the first
    /// answer is never overwritten.
    pub fn resolve(&self, key: &K, value: V) -> Result<(), WaitError> {
        let signal = {
            let mut entries = self.entries();
            let Some(slot) = entries.get_mut(key) else {
                tracing::warn!(kind = %self.kind, key = %key, "Answer for unknown key");
                return Err(WaitError::not_found(self.kind, key.to_string()));
            };
            if let SlotState::Resolved(_) = slot.state {
                tracing::warn!(kind = %self.kind, key = %key, "Duplicate answer rejected");
                return Err(WaitError::already_resolved(self.kind, key.to_string()));
            }
            slot.state = SlotState::Resolved(value);
            Arc::clone(&slot.signal)
        };

        // Stores a permit if the waiter has not suspended yet.
        signal.notify_one();
        tracing::debug!(kind = %self.kind, key = %key, "Resolved wait");
        Ok(())
    }

    /// Wait for the answer to `key`.
    ///
    /// Returns immediately if the answer is already stored. Otherwise suspends
    /// until resolved or until the effective timeout (see
    /// [`WaitSettings::effective_timeout`]) expires. The slot is removed on
    /// every exit path, including when the returned future is dropped.
    pub async fn wait(&self, key: &K, timeout: Option<Duration>) -> Result<V, WaitError> {
        let (signal, generation) = {
            let mut entries = self.entries();
            let slot = entries
                .get_mut(key)
                .ok_or_else(|| WaitError::not_found(self.kind, key.to_string()))?;
            if slot.awaited {
                return Err(WaitError::already_waiting(self.kind, key.to_string()));
            }
            if let SlotState::Resolved(value) =
                std::mem::replace(&mut slot.state, SlotState::Pending)
            {
                entries.remove(key);
                tracing::debug!(kind = %self.kind, key = %key, "Answer already available");
                return Ok(value);
            }
            slot.awaited = true;
            (Arc::clone(&slot.signal), slot.generation)
        };

        let mut guard = SlotGuard {
            store: self,
            key,
            generation,
            armed: true,
        };

        let limit = self.settings.effective_timeout(timeout);
        let started = Instant::now();
        let notified = signal.notified();
        let outcome = match limit {
            Some(limit) => tokio::time::timeout(limit, notified)
                .await
                .map_err(|_| limit),
            None => {
                notified.await;
                Ok(())
            }
        };

        // Resolve and timeout race for the lock; whoever gets it first decides.
        match (guard.take().map(|slot| slot.state), outcome) {
            (Some(SlotState::Resolved(value)), _) => {
                tracing::debug!(
                    kind = %self.kind,
                    key = %key,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Woken with answer"
                );
                Ok(value)
            }
            (Some(SlotState::Pending), Err(after)) => {
                tracing::info!(kind = %self.kind, key = %key, ?after, "Wait timed out");
                Err(WaitError::timeout(self.kind, key.to_string(), after))
            }
            _ => {
                tracing::debug!(kind = %self.kind, key = %key, "Slot cleaned up while awaited");
                Err(WaitError::cancelled(self.kind, key.to_string()))
            }
        }
    }

    /// Remove the slot for `key` in whatever state it is in.
    ///
    /// Returns `true` if something was removed. A task suspended on the slot
    /// is woken and receives `Cancelled`.
    pub fn cleanup(&self, key: &K) -> bool {
        let removed = self.entries().remove(key);
        match removed {
            Some(slot) => {
                slot.signal.notify_one();
                tracing::debug!(kind = %self.kind, key = %key, "Cleaned up wait");
                true
            }
            None => false,
        }
    }

    /// Remove every slot, waking all suspended waiters. Returns the count removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<Slot<V>> = self.entries().drain().map(|(_, slot)| slot).collect();
        for slot in &drained {
            slot.signal.notify_one();
        }
        if !drained.is_empty() {
            tracing::debug!(kind = %self.kind, count = drained.len(), "Cleared all waits");
        }
        drained.len()
    }

    /// Whether `key` currently has a slot (and therefore a wake signal).
    pub fn contains(&self, key: &K) -> bool {
        self.entries().contains_key(key)
    }

    /// Current state of `key`, or `None` if unregistered.
    pub fn status(&self, key: &K) -> Option<SlotStatus> {
        self.entries().get(key).map(|slot| slot.state.status())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Snapshot of all registered slots, oldest first.
    pub fn pending(&self) -> Vec<PendingSlot<K>> {
        let mut slots: Vec<(u64, PendingSlot<K>)> = self
            .entries()
            .iter()
            .map(|(key, slot)| {
                (
                    slot.generation,
                    PendingSlot {
                        key: key.clone(),
                        status: slot.state.status(),
                        registered_at: slot.registered_at,
                        awaited: slot.awaited,
                    },
                )
            })
            .collect();
        slots.sort_by_key(|(generation, _)| *generation);
        slots.into_iter().map(|(_, slot)| slot).collect()
    }
}

/// Removes a waiter's slot on every exit path.
///
/// Only the registration the waiter started on is removed; if the key was
/// cleaned up and registered again meanwhile, the new slot is left alone.
struct SlotGuard<'a, K, V>
where
    K: Eq + Hash + Clone + fmt::Display + Send,
    V: Send,
{
    store: &'a WaitStore<K, V>,
    key: &'a K,
    generation: u64,
    armed: bool,
}

impl<K, V> SlotGuard<'_, K, V>
where
    K: Eq + Hash + Clone + fmt::Display + Send,
    V: Send,
{
    fn take(&mut self) -> Option<Slot<V>> {
        self.armed = false;
        let mut entries = self.store.entries();
        match entries.get(self.key) {
            Some(slot) if slot.generation == self.generation => entries.remove(self.key),
            _ => None,
        }
    }
}

impl<K, V> Drop for SlotGuard<'_, K, V>
where
    K: Eq + Hash + Clone + fmt::Display + Send,
    V: Send,
{
    fn drop(&mut self) {
        if self.armed && self.take().is_some() {
            tracing::debug!(
                kind = %self.store.kind,
                key = %self.key,
                "Waiter dropped, removed its slot"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<WaitStore<String, u32>> {
        Arc::new(WaitStore::new(WaitKind::Approval, WaitSettings::default()))
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[tokio::test]
    async fn resolved_slot_returns_without_suspending() {
        let store = store();
        store.register(key("k")).unwrap();
        store.resolve(&key("k"), 7).unwrap();

        // A zero timeout only succeeds if the first poll is ready.
        let value = tokio::time::timeout(Duration::ZERO, store.wait(&key("k"), None))
            .await
            .expect("wait suspended on a resolved slot")
            .unwrap();

        assert_eq!(value, 7);
        assert!(!store.contains(&key("k")));
    }

    #[tokio::test]
    async fn register_twice_is_rejected() {
        let store = store();
        store.register(key("k")).unwrap();

        let err = store.register(key("k")).unwrap_err();
        assert!(matches!(err, WaitError::AlreadyRegistered { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn register_after_resolve_still_rejected_until_removed() {
        let store = store();
        store.register(key("k")).unwrap();
        store.resolve(&key("k"), 1).unwrap();

        assert!(store.register(key("k")).is_err());

        assert_eq!(store.wait(&key("k"), None).await.unwrap(), 1);
        store.register(key("k")).unwrap();
        assert_eq!(store.status(&key("k")), Some(SlotStatus::Pending));
    }

    #[tokio::test]
    async fn second_resolve_keeps_first_answer() {
        let store = store();
        store.register(key("k")).unwrap();
        store.resolve(&key("k"), 1).unwrap();

        let err = store.resolve(&key("k"), 2).unwrap_err();
        assert!(matches!(err, WaitError::AlreadyResolved { .. }));
        assert_eq!(store.wait(&key("k"), None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn resolve_unknown_key_is_not_found() {
        let store = store();
        let err = store.resolve(&key("nope"), 1).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.key(), "nope");
    }

    #[tokio::test]
    async fn wait_unknown_key_is_not_found() {
        let store = store();
        let err = store.wait(&key("nope"), None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn second_waiter_is_rejected() {
        let store = store();
        store.register(key("k")).unwrap();

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait(&key("k"), Some(Duration::from_secs(2))).await })
        };
        while store.pending().first().map(|slot| slot.awaited) != Some(true) {
            tokio::task::yield_now().await;
        }

        let err = store.wait(&key("k"), None).await.unwrap_err();
        assert!(matches!(err, WaitError::AlreadyWaiting { .. }));

        store.resolve(&key("k"), 3).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn resolve_before_waiter_runs_is_delivered() {
        let store = store();
        store.register(key("k")).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait(&key("k"), Some(Duration::from_secs(2))).await })
        };
        store.resolve(&key("k"), 9).unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), 9);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn dropped_waiter_removes_slot() {
        let store = store();
        store.register(key("k")).unwrap();

        let outer = tokio::time::timeout(
            Duration::from_millis(20),
            store.wait(&key("k"), None),
        )
        .await;

        assert!(outer.is_err());
        assert!(!store.contains(&key("k")));
    }

    #[tokio::test]
    async fn cleanup_wakes_waiter_with_cancelled() {
        let store = store();
        store.register(key("k")).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait(&key("k"), Some(Duration::from_secs(2))).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = Instant::now();
        assert!(store.cleanup(&key("k")));
        let err = waiter.await.unwrap().unwrap_err();

        assert!(matches!(err, WaitError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn stale_waiter_leaves_new_registration_alone() {
        let store = store();
        store.register(key("k")).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait(&key("k"), Some(Duration::from_secs(2))).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Cleanup and re-register before the old waiter gets to run.
        store.cleanup(&key("k"));
        store.register(key("k")).unwrap();

        assert!(matches!(
            waiter.await.unwrap(),
            Err(WaitError::Cancelled { .. })
        ));
        assert_eq!(store.status(&key("k")), Some(SlotStatus::Pending));
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let store = store();
        store.register(key("k")).unwrap();

        assert!(store.cleanup(&key("k")));
        assert!(!store.cleanup(&key("k")));
        assert!(!store.cleanup(&key("never")));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_everything_and_wakes_waiters() {
        let store = store();
        store.register(key("a")).unwrap();
        store.register(key("b")).unwrap();
        store.resolve(&key("b"), 1).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait(&key("a"), None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.clear(), 2);
        assert!(matches!(
            waiter.await.unwrap(),
            Err(WaitError::Cancelled { .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn max_timeout_caps_unbounded_wait() {
        let store: WaitStore<String, u32> = WaitStore::new(
            WaitKind::Clarification,
            WaitSettings::default().with_max_timeout(Duration::from_millis(50)),
        );
        store.register(key("k")).unwrap();

        let err = store.wait(&key("k"), None).await.unwrap_err();
        assert_eq!(
            err,
            WaitError::timeout(WaitKind::Clarification, "k", Duration::from_millis(50))
        );
        assert!(!store.contains(&key("k")));
    }

    #[tokio::test]
    async fn pending_snapshot_is_ordered_by_registration() {
        let store = store();
        store.register(key("second")).unwrap();
        store.register(key("first")).unwrap();
        store.resolve(&key("first"), 1).unwrap();

        let snapshot = store.pending();
        let keys: Vec<&str> = snapshot.iter().map(|slot| slot.key.as_str()).collect();
        assert_eq!(keys, vec!["second", "first"]);
        assert_eq!(snapshot[0].status, SlotStatus::Pending);
        assert_eq!(snapshot[1].status, SlotStatus::Resolved);
        assert!(!snapshot[0].awaited);
    }
}
