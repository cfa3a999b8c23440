//! Per-key async locking.
//!
//! Several operations are read-modify-write sequences over a single stored
//! record (an OTP challenge, an account's failure counter, a rate window).
//! Serializing them per key keeps concurrent attempts on *different* keys
//! fully parallel while making same-key races impossible.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLock<K: Eq + Hash + Clone> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLock<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, waiting if another holder is active.
    /// The guard releases on drop.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLock<K> {
    fn default() -> Self {
        Self::new()
    }
}
