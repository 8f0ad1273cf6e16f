pub mod memory;
pub mod persistent;

pub use memory::{MemStore, SnapshotIterator};
pub use persistent::{CommitId, FileStore};
