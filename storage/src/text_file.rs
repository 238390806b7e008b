//! Whole-file text read and write

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// A text file read and written as a single string
///
/// Content is UTF-8. Reading normalizes line endings: every line of the
/// file, including the last one, ends with `\n` in the returned text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextFile {
    path: PathBuf,
}

impl TextFile {
    /// Handle for the given path; nothing is touched until read or write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the whole file
    pub fn get_text(&self) -> StorageResult<String> {
        let raw = fs::read_to_string(&self.path).map_err(|source| StorageError::Read {
            path: self.path.clone(),
            source,
        })?;

        let mut text = String::with_capacity(raw.len() + 1);
        for line in raw.lines() {
            text.push_str(line);
            text.push('\n');
        }
        debug!(path = %self.path.display(), bytes = text.len(), "Read text file");
        Ok(text)
    }

    /// Create the file with `body` as content, replacing any previous
    /// content; missing parent directories are created
    pub fn set_text(&self, body: &str) -> StorageResult<()> {
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        fs::write(&self.path, body).map_err(write_err)?;
        debug!(path = %self.path.display(), bytes = body.len(), "Wrote text file");
        Ok(())
    }
}

impl From<&Path> for TextFile {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}
