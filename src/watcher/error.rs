//! Error types for the watch backends.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },

    #[error("All watch roots were removed")]
    RootRemoved,

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

impl WatchError {
    /// Classify an error reported while the loop is running.
    ///
    /// Returns `Some` when the backend cannot continue.
    pub(crate) fn from_runtime(e: &notify::Error) -> Option<Self> {
        match &e.kind {
            notify::ErrorKind::MaxFilesWatch => Some(WatchError::EventError {
                details: "OS watch limit reached".to_string(),
            }),
            notify::ErrorKind::WatchNotFound | notify::ErrorKind::PathNotFound => None,
            notify::ErrorKind::Io(_) if e.paths.is_empty() => Some(WatchError::EventError {
                details: e.to_string(),
            }),
            _ => None,
        }
    }
}
