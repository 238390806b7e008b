//! Error types for planbench-storage

use std::path::PathBuf;

use thiserror::Error;

/// Storage error type
#[derive(Error, Debug)]
pub enum StorageError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The file could not be written
    #[error("failed to write {path}: {source}")]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Path of the file involved
    pub fn path(&self) -> &PathBuf {
        match self {
            StorageError::Read { path, .. } | StorageError::Write { path, .. } => path,
        }
    }
}

/// Result type alias
pub type StorageResult<T> = std::result::Result<T, StorageError>;
