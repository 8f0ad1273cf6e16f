use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Prefix mixed into leaf hashes so a leaf can never collide with an inner node
const LEAF_PREFIX: u8 = 0x00;
/// Prefix mixed into inner node hashes
const NODE_PREFIX: u8 = 0x01;

/// A 32-byte Blake3 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, CoreError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| CoreError::InvalidHashLength)?;
        Ok(Hash(bytes))
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute Blake3 hash of data
pub fn hash_blake3(data: &[u8]) -> Hash {
    Hash(*blake3::hash(data).as_bytes())
}

/// Hash a single key/value pair as a merkle leaf.
///
/// Both parts are length-prefixed, so `("ab", "c")` and `("a", "bc")` hash
/// differently.
pub fn hash_leaf(key: &[u8], value: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(&(key.len() as u64).to_le_bytes());
    hasher.update(key);
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value);
    Hash(*hasher.finalize().as_bytes())
}

fn hash_node(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(&left.0);
    hasher.update(&right.0);
    Hash(*hasher.finalize().as_bytes())
}

/// Compute the merkle root of a list of leaf hashes.
///
/// An odd node at any level is paired with itself.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    match hashes {
        [] => Hash::ZERO,
        [single] => *single,
        _ => {
            let mut level = hashes.to_vec();
            while level.len() > 1 {
                level = level
                    .chunks(2)
                    .map(|pair| match pair {
                        [left, right] => hash_node(left, right),
                        [odd] => hash_node(odd, odd),
                        _ => unreachable!("chunks(2) yields one or two items"),
                    })
                    .collect();
            }
            level[0]
        }
    }
}
