//! Strata Store - Key/value state storage
//!
//! This crate provides the store contract, in-memory and file-backed stores,
//! and the cache overlay used to apply state changes speculatively before
//! flushing them into the durable store.

pub mod cache;
pub mod config;
pub mod error;
pub mod merkle;
pub mod storage;
pub mod types;

pub use cache::{CacheStore, MemIterator, MergeIterator};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use merkle::{compute_state_root, store_root};
pub use storage::{CommitId, FileStore, MemStore};
pub use types::{collect_entries, Domain, Entries, Store, StoreIterator};
