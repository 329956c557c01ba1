use std::{hash::Hash, sync::Mutex};

use indexmap::IndexMap;

/// Fixed-capacity memo table with first-in-first-out eviction.
///
/// Thread-safe so it can live inside a handle that is shared across
/// concurrent requests.
#[derive(Debug)]
pub struct BoundedMemo<K, V> {
    capacity: usize,
    entries: Mutex<IndexMap<K, V>>,
}

impl<K, V> BoundedMemo<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// `capacity == 0` disables memoization.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(IndexMap::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Return the cached value for `key` or compute, store and return it.
    /// `compute` runs outside the lock.
    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute(&key);
        if self.capacity == 0 {
            return value;
        }
        let mut entries = self.lock();
        if !entries.contains_key(&key) {
            while entries.len() >= self.capacity {
                entries.shift_remove_index(0);
            }
            entries.insert(key, value.clone());
        }
        value
    }

    // a poisoned memo only ever holds complete entries, so keep using it
    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<K, V>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn computes_once_per_key() {
        let memo = BoundedMemo::new(4);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = memo.get_or_insert_with("a".to_string(), |k| {
                calls.fetch_add(1, Ordering::SeqCst);
                k.len()
            });
            assert_eq!(v, 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let memo = BoundedMemo::new(2);
        memo.get_or_insert_with(1, |k| k * 10);
        memo.get_or_insert_with(2, |k| k * 10);
        memo.get_or_insert_with(3, |k| k * 10);
        assert_eq!(memo.len(), 2);
        assert_eq!(memo.get(&1), None);
        assert_eq!(memo.get(&2), Some(20));
        assert_eq!(memo.get(&3), Some(30));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let memo = BoundedMemo::new(0);
        assert_eq!(memo.get_or_insert_with(7, |k| k + 1), 8);
        assert!(memo.is_empty());
    }
}
