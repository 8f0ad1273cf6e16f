//! Cache Module
//!
//! A write buffer layered on top of any [`Store`].
//!
//! ## Responsibilities
//! - Buffer sets and deletes until [`CacheStore::write`]
//! - Serve reads from the buffer first, then the parent
//! - Iterate the union of buffered and parent data in key order, with
//!   buffered deletes hiding parent entries
//!
//! ## Indexes
//! Every touched key lives in `cache`. Keys changed since the last flush are
//! also tracked in `unsorted` until an iterator over a range covering them is
//! opened; at that point they are folded into `sorted`, which stays in
//! ascending key order. Only the requested range is ever sorted.

mod mem_iterator;
mod merge;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::mem;

use parking_lot::Mutex;
use tracing::debug;

pub use mem_iterator::MemIterator;
pub use merge::MergeIterator;

use crate::types::{assert_valid_key, Domain, Store, StoreIterator};

/// A key with its buffered value; `None` marks a pending delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

impl KvPair {
    pub fn new(key: &[u8], value: Option<&[u8]>) -> Self {
        KvPair {
            key: key.to_vec(),
            value: value.map(<[u8]>::to_vec),
        }
    }
}

/// Buffered state of one key
#[derive(Debug, Clone)]
struct CacheValue {
    value: Option<Vec<u8>>,
    deleted: bool,
    /// Set by writes. A clean entry is a cached read of the parent.
    dirty: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    cache: HashMap<Vec<u8>, CacheValue>,
    /// Dirty keys not yet folded into `sorted`
    unsorted: HashSet<Vec<u8>>,
    /// Folded dirty entries, ascending by key
    sorted: Vec<KvPair>,
}

impl CacheState {
    fn set_cache_value(
        &mut self,
        key: &[u8],
        value: Option<Vec<u8>>,
        deleted: bool,
        dirty: bool,
    ) {
        self.cache.insert(
            key.to_vec(),
            CacheValue {
                value,
                deleted,
                dirty,
            },
        );
        if dirty {
            self.unsorted.insert(key.to_vec());
        }
    }

    /// Move the unsorted dirty keys inside `domain` into the sorted index.
    fn fold_dirty_range(&mut self, domain: &Domain) {
        let CacheState {
            cache,
            unsorted,
            sorted,
        } = self;

        let mut batch = Vec::new();
        unsorted.retain(|key| {
            if !domain.contains(key) {
                return true;
            }
            let value = cache.get(key).and_then(|entry| entry.value.clone());
            batch.push(KvPair {
                key: key.clone(),
                value,
            });
            false
        });
        if batch.is_empty() {
            return;
        }
        batch.sort_by(|a, b| a.key.cmp(&b.key));

        // Entries before the smallest batch key stay where they are
        let split = sorted.partition_point(|kv| kv.key < batch[0].key);
        let tail = sorted.split_off(split);
        sorted.reserve(tail.len() + batch.len());

        let mut tail = tail.into_iter().peekable();
        let mut batch = batch.into_iter().peekable();
        loop {
            let order = match (batch.peek(), tail.peek()) {
                (Some(b), Some(t)) => Some(b.key.cmp(&t.key)),
                _ => None,
            };
            match order {
                Some(Ordering::Less) => sorted.extend(batch.next()),
                Some(Ordering::Greater) => sorted.extend(tail.next()),
                // latest write wins
                Some(Ordering::Equal) => {
                    tail.next();
                    sorted.extend(batch.next());
                }
                None => {
                    sorted.extend(batch);
                    sorted.extend(tail);
                    break;
                }
            }
        }
    }

    fn reset(&mut self) -> HashMap<Vec<u8>, CacheValue> {
        self.unsorted.clear();
        self.sorted.clear();
        mem::take(&mut self.cache)
    }
}

/// Write buffer over a borrowed parent store.
///
/// ## Concurrency
/// One lock guards every operation, reads included, since a read miss
/// records the parent's answer. Iterators own copies of what they return and
/// are not synchronized with later writes; do not mutate the cache while an
/// iterator over it is still in use.
pub struct CacheStore<'a> {
    parent: &'a dyn Store,
    state: Mutex<CacheState>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a dyn Store) -> Self {
        CacheStore {
            parent,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Flush dirty entries to the parent in ascending key order, then forget
    /// everything buffered.
    ///
    /// Clean entries (cached reads) are dropped without touching the parent.
    pub fn write(&self) {
        let mut state = self.state.lock();
        let cache = state.reset();

        let mut dirty: Vec<(Vec<u8>, CacheValue)> =
            cache.into_iter().filter(|(_, entry)| entry.dirty).collect();
        dirty.sort_by(|a, b| a.0.cmp(&b.0));

        let mut sets = 0usize;
        let mut deletes = 0usize;
        for (key, entry) in &dirty {
            match (&entry.value, entry.deleted) {
                (_, true) => {
                    self.parent.delete(key);
                    deletes += 1;
                }
                (Some(value), false) => {
                    self.parent.set(key, value);
                    sets += 1;
                }
                (None, false) => unreachable!("dirty cache entry without a value"),
            }
        }

        if sets + deletes > 0 {
            debug!(sets, deletes, "Flushed cache store to parent");
        }
    }

    /// Number of keys with unflushed changes
    pub fn dirty_len(&self) -> usize {
        self.state.lock().cache.values().filter(|e| e.dirty).count()
    }

    fn new_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        ascending: bool,
    ) -> MergeIterator {
        let mut state = self.state.lock();

        let parent = if ascending {
            self.parent.iterator(start, end)
        } else {
            self.parent.reverse_iterator(start, end)
        };

        let domain = Domain::new(start, end);
        state.fold_dirty_range(&domain);
        let cache = MemIterator::new(domain, &state.sorted, ascending);

        MergeIterator::new(parent, cache, ascending)
    }
}

impl<'a> Store for CacheStore<'a> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        assert_valid_key(key);
        let mut state = self.state.lock();

        if let Some(entry) = state.cache.get(key) {
            return entry.value.clone();
        }

        let value = self.parent.get(key);
        state.set_cache_value(key, value.clone(), false, false);
        value
    }

    fn set(&self, key: &[u8], value: &[u8]) {
        assert_valid_key(key);
        self.state
            .lock()
            .set_cache_value(key, Some(value.to_vec()), false, true);
    }

    fn delete(&self, key: &[u8]) {
        assert_valid_key(key);
        self.state.lock().set_cache_value(key, None, true, true);
    }

    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Box<dyn StoreIterator> {
        Box::new(self.new_iterator(start, end, true))
    }

    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn StoreIterator> {
        Box::new(self.new_iterator(start, end, false))
    }

    fn cache_wrap(&self) -> CacheStore<'_> {
        CacheStore::new(self)
    }
}
