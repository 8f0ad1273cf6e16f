use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;

use parking_lot::RwLock;

use crate::cache::CacheStore;
use crate::types::{assert_valid_key, Domain, Store, StoreIterator};

/// In-memory storage implementation using BTreeMap
#[derive(Debug, Default)]
pub struct MemStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get the number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn snapshot(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        ascending: bool,
    ) -> SnapshotIterator {
        let domain = Domain::new(start, end);
        let data = self.data.read();
        let items = range_of(&data, &domain)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        SnapshotIterator::new(domain, items, ascending)
    }
}

/// Entries of `map` inside `domain`, ascending.
pub(crate) fn range_of<'m, V>(
    map: &'m BTreeMap<Vec<u8>, V>,
    domain: &Domain,
) -> Box<dyn Iterator<Item = (&'m Vec<u8>, &'m V)> + 'm> {
    // BTreeMap::range panics on an inverted range
    if domain.is_empty() {
        return Box::new(std::iter::empty());
    }
    let lower = domain.start().map_or(Bound::Unbounded, Bound::Included);
    let upper = domain.end().map_or(Bound::Unbounded, Bound::Excluded);
    Box::new(map.range::<[u8], _>((lower, upper)))
}

impl Store for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        assert_valid_key(key);
        self.data.read().get(key).cloned()
    }

    fn set(&self, key: &[u8], value: &[u8]) {
        assert_valid_key(key);
        self.data.write().insert(key.to_vec(), value.to_vec());
    }

    fn delete(&self, key: &[u8]) {
        assert_valid_key(key);
        self.data.write().remove(key);
    }

    fn has(&self, key: &[u8]) -> bool {
        assert_valid_key(key);
        self.data.read().contains_key(key)
    }

    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Box<dyn StoreIterator> {
        Box::new(self.snapshot(start, end, true))
    }

    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Box<dyn StoreIterator> {
        Box::new(self.snapshot(start, end, false))
    }

    fn cache_wrap(&self) -> CacheStore<'_> {
        CacheStore::new(self)
    }
}

/// Iterator over an owned, ascending copy of a key range.
///
/// Later writes to the source store are not observed.
#[derive(Debug)]
pub struct SnapshotIterator {
    domain: Domain,
    items: VecDeque<(Vec<u8>, Vec<u8>)>,
    ascending: bool,
}

impl SnapshotIterator {
    pub(crate) fn new(
        domain: Domain,
        items: VecDeque<(Vec<u8>, Vec<u8>)>,
        ascending: bool,
    ) -> Self {
        SnapshotIterator {
            domain,
            items,
            ascending,
        }
    }

    fn current(&self) -> &(Vec<u8>, Vec<u8>) {
        let item = if self.ascending {
            self.items.front()
        } else {
            self.items.back()
        };
        match item {
            Some(item) => item,
            None => panic!("snapshot iterator is exhausted"),
        }
    }
}

impl StoreIterator for SnapshotIterator {
    fn domain(&self) -> Domain {
        self.domain.clone()
    }

    fn valid(&self) -> bool {
        !self.items.is_empty()
    }

    fn next(&mut self) {
        let popped = if self.ascending {
            self.items.pop_front()
        } else {
            self.items.pop_back()
        };
        assert!(popped.is_some(), "snapshot iterator is exhausted");
    }

    fn key(&self) -> &[u8] {
        &self.current().0
    }

    fn value(&self) -> &[u8] {
        &self.current().1
    }

    fn close(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::collect_entries;

    fn pairs(keys: &[&str]) -> Vec<(Vec<u8>, Vec<u8>)> {
        keys.iter()
            .map(|k| (k.as_bytes().to_vec(), format!("v-{k}").into_bytes()))
            .collect()
    }

    fn store_with(keys: &[&str]) -> MemStore {
        let store = MemStore::new();
        for (k, v) in pairs(keys) {
            store.set(&k, &v);
        }
        store
    }

    #[test]
    fn test_basic_operations() {
        let store = MemStore::new();

        store.set(b"key1", b"value1");

        assert_eq!(store.get(b"key1"), Some(b"value1".to_vec()));
        assert!(store.has(b"key1"));
        assert!(!store.has(b"key2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let store = store_with(&["a"]);

        store.delete(b"a");
        assert_eq!(store.get(b"a"), None);
        assert!(store.is_empty());

        // deleting again is fine
        store.delete(b"a");
    }

    #[test]
    fn test_overwrite() {
        let store = MemStore::new();
        store.set(b"key", b"value1");
        store.set(b"key", b"value2");
        assert_eq!(store.get(b"key"), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_empty_value_is_a_value() {
        let store = MemStore::new();
        store.set(b"key", b"");
        assert_eq!(store.get(b"key"), Some(vec![]));
        assert!(store.has(b"key"));
    }

    #[test]
    fn test_iterator_bounds() {
        let store = store_with(&["a", "b", "c", "d"]);

        assert_eq!(collect_entries(store.iterator(None, None)), pairs(&["a", "b", "c", "d"]));
        assert_eq!(
            collect_entries(store.iterator(Some(b"b"), Some(b"d"))),
            pairs(&["b", "c"])
        );
        assert_eq!(collect_entries(store.iterator(Some(b"bb"), None)), pairs(&["c", "d"]));
        assert!(collect_entries(store.iterator(Some(b"d"), Some(b"a"))).is_empty());
    }

    #[test]
    fn test_reverse_iterator() {
        let store = store_with(&["a", "b", "c", "d"]);

        assert_eq!(
            collect_entries(store.reverse_iterator(None, Some(b"c"))),
            pairs(&["b", "a"])
        );
    }

    #[test]
    fn test_iterator_is_a_snapshot() {
        let store = store_with(&["a", "b"]);
        let mut iter = store.iterator(None, None);
        store.set(b"c", b"late");
        store.delete(b"b");

        let mut keys = Vec::new();
        while iter.valid() {
            keys.push(iter.key().to_vec());
            iter.next();
        }
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_close_invalidates() {
        let store = store_with(&["a"]);
        let mut iter = store.iterator(None, None);
        assert!(iter.valid());
        iter.close();
        assert!(!iter.valid());
        assert_eq!(iter.domain(), Domain::unbounded());
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn test_key_on_exhausted_iterator_panics() {
        let store = MemStore::new();
        let iter = store.iterator(None, None);
        iter.key();
    }
}
