//! Strata Core - Shared primitives
//!
//! This crate provides the hashing and serialization building blocks used by
//! the Strata state store.

pub mod error;
pub mod hash;
pub mod serialize;

pub use error::CoreError;
pub use hash::{hash_blake3, hash_leaf, merkle_root, Hash};
