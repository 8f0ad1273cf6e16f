use std::cmp::Ordering;

use super::MemIterator;
use crate::error::Result;
use crate::types::{compare_keys, Domain, StoreIterator};

/// Merges a parent iterator with the cache's buffered entries.
///
/// Both sources run in the same direction over the same range. When both
/// hold a key the cache entry wins, and a cache tombstone hides the parent
/// entry entirely. Tombstones are never reported.
///
/// Invariant: between calls, either both sources are exhausted or the
/// current position (the first of the two heads in iteration order) is not a
/// cache tombstone.
pub struct MergeIterator {
    parent: Box<dyn StoreIterator>,
    cache: MemIterator,
    ascending: bool,
}

impl MergeIterator {
    pub fn new(parent: Box<dyn StoreIterator>, cache: MemIterator, ascending: bool) -> Self {
        let mut iter = MergeIterator {
            parent,
            cache,
            ascending,
        };
        iter.skip_until_exists_or_invalid();
        iter
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        compare_keys(a, b, self.ascending)
    }

    /// Order of the parent head relative to the cache head. Both must be valid.
    fn heads_order(&self) -> Ordering {
        self.compare(self.parent.key(), self.cache.key())
    }

    fn assert_valid(&self) {
        assert!(self.valid(), "merge iterator is exhausted");
    }

    /// Skip cache tombstones ordered strictly before `until`, or all leading
    /// tombstones when `until` is `None`.
    fn skip_cache_deletes(&mut self, until: Option<&[u8]>) {
        while self.cache.valid() && self.cache.value().is_none() {
            if let Some(until) = until {
                if self.compare(self.cache.key(), until) != Ordering::Less {
                    break;
                }
            }
            self.cache.next();
        }
    }

    /// Move forward until the heads describe a visible entry or both
    /// sources run out. Returns whether the iterator is valid.
    fn skip_until_exists_or_invalid(&mut self) -> bool {
        loop {
            if !self.parent.valid() {
                self.skip_cache_deletes(None);
                return self.cache.valid();
            }
            if !self.cache.valid() {
                return true;
            }

            match self.heads_order() {
                // parent entry comes first, nothing shadows it yet
                Ordering::Less => return true,
                Ordering::Equal => {
                    if self.cache.value().is_some() {
                        return true;
                    }
                    // pending delete of a parent key
                    self.parent.next();
                    self.cache.next();
                }
                Ordering::Greater => {
                    if self.cache.value().is_some() {
                        return true;
                    }
                    let until = self.parent.key().to_vec();
                    self.skip_cache_deletes(Some(until.as_slice()));
                }
            }
        }
    }
}

impl StoreIterator for MergeIterator {
    fn domain(&self) -> Domain {
        self.parent.domain().union(self.cache.domain())
    }

    fn valid(&self) -> bool {
        self.parent.valid() || self.cache.valid()
    }

    fn next(&mut self) {
        self.assert_valid();

        if !self.parent.valid() {
            self.cache.next();
        } else if !self.cache.valid() {
            self.parent.next();
        } else {
            match self.heads_order() {
                Ordering::Less => self.parent.next(),
                Ordering::Equal => {
                    self.parent.next();
                    self.cache.next();
                }
                Ordering::Greater => self.cache.next(),
            }
        }

        self.skip_until_exists_or_invalid();
    }

    fn key(&self) -> &[u8] {
        self.assert_valid();

        if !self.parent.valid() {
            return self.cache.key();
        }
        if !self.cache.valid() {
            return self.parent.key();
        }
        match self.heads_order() {
            Ordering::Less => self.parent.key(),
            Ordering::Equal | Ordering::Greater => self.cache.key(),
        }
    }

    fn value(&self) -> &[u8] {
        self.assert_valid();

        let from_cache = if !self.parent.valid() {
            true
        } else if !self.cache.valid() {
            false
        } else {
            self.heads_order() != Ordering::Less
        };

        if !from_cache {
            return self.parent.value();
        }
        match self.cache.value() {
            Some(value) => value,
            None => panic!("merge iterator positioned on a cache tombstone"),
        }
    }

    fn error(&self) -> Result<()> {
        self.parent.error()
    }

    fn close(&mut self) {
        self.parent.close();
        self.cache.close();
    }
}
