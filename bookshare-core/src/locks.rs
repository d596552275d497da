//! Per-key async mutual exclusion
//!
//! Read-modify-write sequences on one ISBN (or one principal) run under that key's
//! guard. Keys are locked in a fixed order: principal first, then ISBNs ascending.
//! A key's slot lives only while someone holds or waits on it.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots<K> = DashMap<K, Arc<Mutex<()>>>;

/// Held for the duration of a keyed critical section. Dropping the last guard
/// or waiter of a key frees its slot.
pub struct KeyGuard<K>
where
    K: Eq + Hash,
{
    guard: Option<OwnedMutexGuard<()>>,
    key: Option<K>,
    slots: Arc<Slots<K>>,
}

impl<K> Drop for KeyGuard<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.guard.take();
        if let Some(key) = self.key.take() {
            // Clones happen under the shard lock, so a count of 1 means idle
            self.slots
                .remove_if(&key, |_, slot| Arc::strong_count(slot) == 1);
        }
    }
}

/// Registry of lazily created per-key mutexes
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    slots: Arc<Slots<K>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        self.slots.entry(key.clone()).or_default().clone()
    }

    /// Wait for exclusive access to one key
    pub async fn lock(&self, key: &K) -> KeyGuard<K> {
        let slot = self.slot(key);
        // Registered before the await so a cancelled wait still frees the slot
        let mut pending = KeyGuard {
            guard: None,
            key: Some(key.clone()),
            slots: self.slots.clone(),
        };
        pending.guard = Some(slot.lock_owned().await);
        pending
    }

    /// Lock several keys, in ascending order, skipping duplicates
    pub async fn lock_many(&self, keys: impl IntoIterator<Item = K>) -> Vec<KeyGuard<K>> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of slots currently allocated
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
