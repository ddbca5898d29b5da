use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed exclusive sections, one per entity id.
///
/// Plays the role row-level `SELECT ... FOR UPDATE` played in a database
/// transaction: every read-modify-write on an entity runs under that
/// entity's guard, so concurrent mutations of the same id serialize while
/// disjoint ids proceed in parallel. Locks are created lazily on first use
/// and never dropped; the id spaces here are small and bounded.
pub struct EntityLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Copy> EntityLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the guard for `key`, waiting behind any current holder.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

impl<K: Eq + Hash + Copy> Default for EntityLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
