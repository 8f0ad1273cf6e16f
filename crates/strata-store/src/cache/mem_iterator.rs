use std::collections::VecDeque;

use super::KvPair;
use crate::types::Domain;

/// Bounded iterator over buffered cache entries.
///
/// Values may be tombstones (`None`); they are handed to the merge layer
/// untouched. Items are held in ascending order whatever the direction; a
/// descending iterator reads and pops from the back.
#[derive(Debug)]
pub struct MemIterator {
    domain: Domain,
    items: VecDeque<KvPair>,
    ascending: bool,
}

impl MemIterator {
    /// Copy the entries of `sorted` that fall inside `domain`.
    ///
    /// `sorted` must be in ascending key order, so the in-domain entries form
    /// one contiguous run and the scan stops as soon as it leaves that run.
    pub fn new(domain: Domain, sorted: &[KvPair], ascending: bool) -> Self {
        debug_assert!(
            sorted.windows(2).all(|w| w[0].key < w[1].key),
            "sorted cache index is out of order"
        );

        let mut items = VecDeque::new();
        let mut entered = false;
        for item in sorted {
            if domain.contains(&item.key) {
                entered = true;
                items.push_back(item.clone());
            } else if entered {
                break;
            }
        }

        MemIterator {
            domain,
            items,
            ascending,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn valid(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn next(&mut self) {
        let popped = if self.ascending {
            self.items.pop_front()
        } else {
            self.items.pop_back()
        };
        assert!(popped.is_some(), "mem iterator is exhausted");
    }

    pub fn key(&self) -> &[u8] {
        &self.current().key
    }

    /// Current value, `None` for a tombstone
    pub fn value(&self) -> Option<&[u8]> {
        self.current().value.as_deref()
    }

    pub fn close(&mut self) {
        self.items.clear();
    }

    fn current(&self) -> &KvPair {
        let item = if self.ascending {
            self.items.front()
        } else {
            self.items.back()
        };
        match item {
            Some(item) => item,
            None => panic!("mem iterator is exhausted"),
        }
    }
}
