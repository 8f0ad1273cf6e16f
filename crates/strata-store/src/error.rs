use strata_core::Hash;
use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state root: expected {expected}, computed {actual}")]
    InvalidStateRoot { expected: Hash, actual: Hash },

    #[error("Core error: {0}")]
    Core(#[from] strata_core::CoreError),
}
