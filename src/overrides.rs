//! Session-scoped flag overrides.
//!
//! Overrides let a caller force a flag's value for the current runtime instance; the evaluation
//! facade consults them before rule evaluation. They live until explicitly cleared or the store is
//! dropped, and are never persisted.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
};

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identifies a registered override listener. Returned by [`OverrideStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// A key→bool store of forced flag values with change notification.
///
/// Every mutating call ([`set`](OverrideStore::set), [`clear`](OverrideStore::clear),
/// [`clear_all`](OverrideStore::clear_all)) synchronously notifies all current listeners after
/// the mutation, so e.g. a UI surface can re-render. Delivery order between listeners is
/// unspecified. No store lock is held during delivery, so a listener may itself mutate the
/// store or manage subscriptions; note that every mutation notifies again, so a listener that
/// unconditionally mutates would recurse forever.
#[derive(Default)]
pub struct OverrideStore {
    overrides: RwLock<HashMap<String, bool>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription_id: AtomicU64,
}

impl OverrideStore {
    /// Create an empty override store.
    pub fn new() -> OverrideStore {
        OverrideStore::default()
    }

    /// Get the override for `key`, if one is set.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.read().get(key).copied()
    }

    /// Return `true` if an override is set for `key`.
    pub fn has(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// A copy of all current overrides.
    pub fn get_all(&self) -> HashMap<String, bool> {
        self.read().clone()
    }

    /// Force `key` to `value` for the rest of the session.
    pub fn set(&self, key: impl Into<String>, value: bool) {
        self.write().insert(key.into(), value);
        self.notify();
    }

    /// Remove the override for `key`, restoring rule-based evaluation.
    pub fn clear(&self, key: &str) {
        self.write().remove(key);
        self.notify();
    }

    /// Remove all overrides.
    pub fn clear_all(&self) {
        self.write().clear();
        self.notify();
    }

    /// Register a listener invoked synchronously after every mutating call.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .expect("thread holding listeners lock should not panic")
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a previously registered listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .expect("thread holding listeners lock should not panic")
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify(&self) {
        // Snapshot the listener list and release the lock before delivering, so a listener can
        // call back into the store (including subscribe/unsubscribe) without deadlocking. A
        // listener unsubscribed mid-delivery may still see this notification.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .expect("thread holding listeners lock should not panic")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, bool>> {
        self.overrides
            .read()
            .expect("thread holding overrides lock should not panic")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, bool>> {
        self.overrides
            .write()
            .expect("thread holding overrides lock should not panic")
    }
}
