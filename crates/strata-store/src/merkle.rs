use strata_core::{hash_leaf, merkle_root, Hash};

use crate::types::{Entries, Store};

/// Compute state root from key-value pairs.
/// Sorts by key first, so the root does not depend on input order.
pub fn compute_state_root<'a, I>(entries: I) -> Hash
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut sorted: Vec<_> = entries.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let leaves: Vec<Hash> = sorted.iter().map(|(k, v)| hash_leaf(k, v)).collect();
    merkle_root(&leaves)
}

/// State root of everything currently visible through `store`
pub fn store_root(store: &dyn Store) -> Hash {
    let leaves: Vec<Hash> = Entries::new(store.iterator(None, None))
        .map(|(k, v)| hash_leaf(&k, &v))
        .collect();
    merkle_root(&leaves)
}
