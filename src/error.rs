//! Error taxonomy for the control plane.
//!
//! # Design Decisions
//! - Malformed input is never an error; it degrades to defaults at the
//!   normalizer boundary
//! - Reload notification failures are data (`NotifyOutcome`), not errors
//! - Only storage failures and rejected mutations surface to callers

use std::path::PathBuf;
use thiserror::Error;

/// Failure to persist a document.
///
/// The previous on-disk document is still intact when any of these is
/// returned, because the target is only ever replaced by rename.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write temp file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to rename {from} -> {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize document for {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A mutation request failed boundary validation and was not written.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking task running the operation panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// True when the caller sent a bad request (as opposed to a server fault).
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::Rejected(_))
    }
}

/// Fatal errors while bringing the daemon up or running it.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("initial reconcile failed: {0}")]
    Sync(#[from] SyncError),

    #[error("metrics exporter: {0}")]
    Metrics(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
