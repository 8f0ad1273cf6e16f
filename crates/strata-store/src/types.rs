//! The store and iterator contract shared by every backing store and by the
//! cache overlay.

use std::cmp::Ordering;

use crate::cache::CacheStore;
use crate::error::Result;

/// Key/value store with ordered range iteration.
///
/// Methods take `&self`; implementations guard their own state. A `None`
/// from `get` means the key is absent.
pub trait Store: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Set a key/value pair. Panics on an invalid key.
    ///
    /// Every byte slice, including the empty one, is a value; absence is only
    /// ever expressed through `delete`.
    fn set(&self, key: &[u8], value: &[u8]);

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]);

    /// Check if a key exists
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Ascending iterator over `[start, end)`. `None` bounds are open.
    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Box<dyn StoreIterator>;

    /// Descending iterator over `[start, end)`.
    fn reverse_iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>)
        -> Box<dyn StoreIterator>;

    /// Layer a write buffer on top of this store.
    ///
    /// Nothing reaches `self` until the returned cache is written.
    fn cache_wrap(&self) -> CacheStore<'_>;
}

/// Cursor over a key range of a [`Store`].
///
/// `key`, `value` and `next` panic when the iterator is not valid.
pub trait StoreIterator: Send {
    /// The range this iterator was opened over
    fn domain(&self) -> Domain;

    /// Whether the iterator is positioned on an entry
    fn valid(&self) -> bool;

    /// Advance to the next entry in iteration order
    fn next(&mut self);

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];

    /// Error encountered while iterating, if any
    fn error(&self) -> Result<()> {
        Ok(())
    }

    /// Release the iterator's resources. The iterator is invalid afterwards.
    fn close(&mut self);
}

/// Half-open key range `[start, end)`. A `None` bound is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domain {
    pub start: Option<Vec<u8>>,
    pub end: Option<Vec<u8>>,
}

impl Domain {
    pub fn new(start: Option<&[u8]>, end: Option<&[u8]>) -> Self {
        Domain {
            start: start.map(<[u8]>::to_vec),
            end: end.map(<[u8]>::to_vec),
        }
    }

    /// The full key space
    pub fn unbounded() -> Self {
        Domain::default()
    }

    pub fn start(&self) -> Option<&[u8]> {
        self.start.as_deref()
    }

    pub fn end(&self) -> Option<&[u8]> {
        self.end.as_deref()
    }

    /// Whether `key` lies in `[start, end)`
    pub fn contains(&self, key: &[u8]) -> bool {
        is_key_in_domain(key, self.start(), self.end())
    }

    /// Whether no key can satisfy this range
    pub fn is_empty(&self) -> bool {
        matches!((self.start(), self.end()), (Some(start), Some(end)) if start >= end)
    }

    /// Smallest range covering both `self` and `other`
    pub fn union(&self, other: &Domain) -> Domain {
        let start = match (self.start(), other.start()) {
            (Some(a), Some(b)) => Some(a.min(b).to_vec()),
            _ => None,
        };
        let end = match (self.end(), other.end()) {
            (Some(a), Some(b)) => Some(a.max(b).to_vec()),
            _ => None,
        };
        Domain { start, end }
    }
}

/// Whether `key` lies in the half-open range `[start, end)`
pub fn is_key_in_domain(key: &[u8], start: Option<&[u8]>, end: Option<&[u8]>) -> bool {
    if let Some(start) = start {
        if key < start {
            return false;
        }
    }
    if let Some(end) = end {
        if key >= end {
            return false;
        }
    }
    true
}

/// Key order in the given iteration direction
pub fn compare_keys(a: &[u8], b: &[u8], ascending: bool) -> Ordering {
    let order = a.cmp(b);
    if ascending {
        order
    } else {
        order.reverse()
    }
}

/// Panics unless `key` can be stored.
///
/// The empty key is reserved: it cannot be told apart from an open range
/// bound.
pub fn assert_valid_key(key: &[u8]) {
    assert!(!key.is_empty(), "key is empty");
}

/// Adapts a [`StoreIterator`] into a standard iterator of owned pairs.
///
/// The source is closed once it runs out.
pub struct Entries {
    inner: Box<dyn StoreIterator>,
}

impl Entries {
    pub fn new(inner: Box<dyn StoreIterator>) -> Self {
        Entries { inner }
    }
}

impl Iterator for Entries {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.inner.valid() {
            self.inner.close();
            return None;
        }
        let item = (self.inner.key().to_vec(), self.inner.value().to_vec());
        self.inner.next();
        Some(item)
    }
}

/// Collect every pair an iterator yields
pub fn collect_entries(iter: Box<dyn StoreIterator>) -> Vec<(Vec<u8>, Vec<u8>)> {
    Entries::new(iter).collect()
}
