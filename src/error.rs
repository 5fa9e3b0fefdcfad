//! Error types for brute-force search

use thiserror::Error;

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, KnnError>;

/// Error types that can occur while loading vectors or searching
#[derive(Error, Debug)]
pub enum KnnError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid k: {k} (k must be at least 1)")]
    InvalidK { k: usize },

    #[error("Database is empty")]
    EmptyDatabase,

    #[error("Selector already drained")]
    SelectorDrained,

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },

    #[error("Invalid fvecs data at byte {offset}: {reason}")]
    InvalidFormat { offset: usize, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
