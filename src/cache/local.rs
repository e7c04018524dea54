//! L1 Store Module
//!
//! In-process, capacity-bounded map with lazy expiry and insertion-order
//! eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use regex::Regex;

use crate::cache::CacheEntry;

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    /// Insertion sequence; an overwrite keeps it
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    /// Keys in insertion order. Entries whose key was removed or re-inserted
    /// since are stale and skipped.
    order: VecDeque<(String, u64)>,
    next_seq: u64,
    /// Running sum of key + payload lengths
    bytes: usize,
}

impl Inner {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(slot) => {
                self.bytes = self.bytes.saturating_sub(slot.entry.footprint(key));
                self.compact();
                true
            }
            None => false,
        }
    }

    /// Evicts the oldest live key.
    fn pop_oldest(&mut self) -> Option<String> {
        while let Some((key, seq)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|slot| slot.seq == seq);
            if live {
                if let Some(slot) = self.entries.remove(&key) {
                    self.bytes = self.bytes.saturating_sub(slot.entry.footprint(&key));
                }
                return Some(key);
            }
        }
        None
    }

    /// Drops stale order entries once they outnumber live ones.
    fn compact(&mut self) {
        if self.order.len() > 2 * self.entries.len() + 32 {
            let entries = &self.entries;
            self.order
                .retain(|(key, seq)| entries.get(key).is_some_and(|slot| slot.seq == *seq));
        }
    }
}

// == Local Store ==
/// The L1 tier.
///
/// Every mutation (capacity check, eviction and insert) happens under one
/// write lock, so concurrent `set` calls can never push the store past
/// `max_keys`. Eviction pops from an insertion-order queue and is O(1)
/// amortized.
#[derive(Debug)]
pub struct LocalStore {
    inner: RwLock<Inner>,
    max_keys: usize,
}

impl LocalStore {
    // == Constructor ==
    /// Creates an empty store holding at most `max_keys` entries.
    pub fn new(max_keys: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_keys,
        }
    }

    // == Get ==
    /// Returns the payload for `key` if present and not expired.
    ///
    /// A stale entry is removed at the moment it is observed.
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        {
            let inner = self.inner.read();
            match inner.entries.get(key) {
                None => return None,
                Some(slot) if !slot.entry.is_expired() => return Some(Arc::clone(&slot.entry.value)),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent set may have refreshed it.
        let mut inner = self.inner.write();
        match inner.entries.get(key) {
            Some(slot) if !slot.entry.is_expired() => Some(Arc::clone(&slot.entry.value)),
            Some(_) => {
                inner.remove(key);
                None
            }
            None => None,
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// When a new key arrives at capacity, the oldest-inserted resident key
    /// is evicted first and returned. Overwriting an existing key never
    /// evicts. With a capacity of zero nothing is stored.
    pub fn set(&self, key: &str, value: Arc<str>, ttl: Duration) -> Option<String> {
        if self.max_keys == 0 {
            return None;
        }

        let entry = CacheEntry::new(value, ttl);
        let mut inner = self.inner.write();

        if let Some(slot) = inner.entries.get_mut(key) {
            let old = slot.entry.footprint(key);
            let new = entry.footprint(key);
            slot.entry = entry;
            inner.bytes = inner.bytes.saturating_sub(old) + new;
            return None;
        }

        let evicted = if inner.entries.len() >= self.max_keys {
            inner.pop_oldest()
        } else {
            None
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.bytes += entry.footprint(key);
        inner.order.push_back((key.to_string(), seq));
        inner.entries.insert(key.to_string(), Slot { entry, seq });
        evicted
    }

    // == Delete ==
    /// Removes `key`, returning whether it was resident.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.write().remove(key)
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.order.clear();
        inner.bytes = 0;
    }

    /// Removes every key matching `pattern`, returning how many were removed.
    pub fn clear_matching(&self, pattern: &Regex) -> usize {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        let mut freed = 0;
        inner.entries.retain(|key, slot| {
            if pattern.is_match(key) {
                freed += slot.entry.footprint(key);
                false
            } else {
                true
            }
        });
        inner.bytes = inner.bytes.saturating_sub(freed);
        inner.compact();
        before - inner.entries.len()
    }

    // == Length ==
    /// Number of resident entries, including expired ones not yet observed.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(key_count, memory_usage)` taken under one short read lock.
    pub fn footprint(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.entries.len(), inner.bytes)
    }
}
