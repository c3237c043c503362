//! Error types for pipeline setup and execution.

use std::path::PathBuf;
use thiserror::Error;

use crate::sink::SinkError;
use crate::watcher::WatchError;

/// Errors that end a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Could not resolve {path}: path does not exist or is inaccessible")]
    PathResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No watch paths given")]
    NoRoots,

    #[error("Pipeline was already started")]
    AlreadyStarted,

    #[error(transparent)]
    Backend(#[from] WatchError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
