//! Storage utilities for planbench
//!
//! This crate provides `TextFile`, a small helper that reads and writes a
//! whole UTF-8 text file at once. It is used by the CLI to load thread
//! group configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod text_file;

pub use error::{StorageError, StorageResult};
pub use text_file::TextFile;
