//! Bounded in-process tier.
//!
//! Entries carry their own expiry. Once the map grows past its capacity the
//! oldest entries by insertion order (not by access) are dropped in one batch.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct MemoryStore {
    capacity: usize,
    eviction_fraction: f64,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(capacity: usize, eviction_fraction: f64) -> Self {
        Self {
            capacity: capacity.max(1),
            eviction_fraction: eviction_fraction.clamp(0.0, 1.0),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expired entries are removed on read.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.entries.remove(key);
        }
        None
    }

    pub fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
                seq,
            },
        );

        if inner.entries.len() > self.capacity {
            self.evict_oldest(&mut inner);
        }
    }

    pub fn del(&self, key: &str) {
        self.lock().entries.remove(key);
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn evict_oldest(&self, inner: &mut Inner) {
        let count = ((self.capacity as f64) * self.eviction_fraction).ceil() as usize;
        let count = count.max(inner.entries.len() - self.capacity);

        let mut by_age: Vec<(u64, String)> = inner
            .entries
            .iter()
            .map(|(k, e)| (e.seq, k.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(seq, _)| *seq);

        for (_, key) in by_age.into_iter().take(count) {
            inner.entries.remove(&key);
        }
        log::debug!(
            "Memory cache evicted {} entries, {} remain",
            count,
            inner.entries.len()
        );
    }
}
