//! Persistent document store.
//!
//! # Data Flow
//! ```text
//! load(path, default):
//!     resolve against base_dir
//!     → missing / unreadable / unparsable → default
//!     → parsed document
//!
//! store(path, doc):
//!     resolve against base_dir
//!     → create parent directories
//!     → write <path>.tmp and fsync
//!     → rename <path>.tmp over <path>
//! ```
//!
//! # Design Decisions
//! - Readers never observe a partially written document: the target is only
//!   ever replaced by rename
//! - Loading never fails; the caller chooses what "nothing there" means
//! - Relative paths resolve against one fixed base directory

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// JSON document store rooted at a base directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    base_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve `path` against the base directory unless it is already absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load a document, returning `default` on any I/O or parse failure.
    pub fn load<T: DeserializeOwned>(&self, path: impl AsRef<Path>, default: T) -> T {
        let path = self.resolve(path);
        let content = match fs::read(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Document unreadable, using default");
                return default;
            }
        };

        match serde_json::from_slice(&content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Document unparsable, using default");
                default
            }
        }
    }

    /// Atomically replace the document at `path`.
    pub fn store<T: Serialize>(&self, path: impl AsRef<Path>, doc: &T) -> Result<(), StoreError> {
        let path = self.resolve(path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Serialize {
            path: path.clone(),
            source,
        })?;

        let tmp_path = temp_sibling(&path);
        write_synced(&tmp_path, &content).map_err(|source| StoreError::Write {
            path: tmp_path.clone(),
            source,
        })?;

        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Rename {
            from: tmp_path.clone(),
            to: path.clone(),
            source,
        })?;

        tracing::trace!(path = %path.display(), bytes = content.len(), "Document stored");
        Ok(())
    }

    /// Modification time of `path` in whole Unix seconds, 0 when absent.
    pub fn modified_secs(&self, path: impl AsRef<Path>) -> u64 {
        fs::metadata(self.resolve(path))
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// `<path>.tmp`, kept in the same directory so the rename stays on one filesystem.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}
