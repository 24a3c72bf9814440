//! TTL-bounded map.
//!
//! Caches and stale-state tables (geolocation results, lockout records)
//! need entries to disappear on their own: reads past the TTL miss, and a
//! capacity bound evicts the least recently touched entry when full.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct ExpiringEntry<V> {
    value: V,
    inserted: Instant,
    last_access: Instant,
}

pub struct ExpiringMap<K, V> {
    entries: HashMap<K, ExpiringEntry<V>>,
    max_entries: usize,
    ttl: Duration,
    total_expired: u64,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries.min(1024)),
            max_entries: max_entries.max(1),
            ttl,
            total_expired: 0,
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.prune_expired();
        while self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_coldest();
        }
        let now = Instant::now();
        self.entries.insert(key, ExpiringEntry { value, inserted: now, last_access: now });
    }

    /// Get a live value, refreshing its access time. Expired entries are
    /// removed and read as a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = self
            .entries
            .get(key)
            .map(|e| e.inserted.elapsed() > self.ttl)
            .unwrap_or(false);
        if expired {
            self.entries.remove(key);
            self.total_expired += 1;
            return None;
        }
        self.entries.get_mut(key).map(|e| {
            e.last_access = Instant::now();
            &e.value
        })
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn contains_live(&mut self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Drop all entries past the TTL.
    pub fn prune_expired(&mut self) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| e.inserted.elapsed() <= ttl);
        self.total_expired += (before - self.entries.len()) as u64;
    }

    fn evict_coldest(&mut self) {
        let coldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(k, _)| k.clone());
        if let Some(key) = coldest {
            self.entries.remove(&key);
            self.total_expired += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_expired(&self) -> u64 {
        self.total_expired
    }
}
