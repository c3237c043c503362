//! Backend trait and the types shared by every backend.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::WatchError;

/// A resolved, canonical directory being observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchRoot {
    path: PathBuf,
}

impl WatchRoot {
    /// Canonicalize `path`. Fails if it does not exist or is inaccessible.
    pub fn resolve(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = std::fs::canonicalize(path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Changed paths reported together by one observation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    paths: Vec<PathBuf>,
}

impl ChangeBatch {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl IntoIterator for ChangeBatch {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

impl FromIterator<PathBuf> for ChangeBatch {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Callback invoked by a backend for each batch.
///
/// Backends never invoke it concurrently with itself.
pub type ChangeCallback = Box<dyn FnMut(ChangeBatch) + Send>;

/// Cooperative cancellation flag shared between a backend and its owner.
///
/// Cloning yields a handle to the same flag. Stopping is idempotent,
/// non-blocking and safe from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination of the run loop.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Timing knobs for the event loop.
#[derive(Debug, Clone, Copy)]
pub struct BackendOptions {
    /// Upper bound on how long the loop waits before re-checking the stop flag.
    pub poll_interval: Duration,
    /// How long to keep collecting events after the first one of a burst.
    pub batch_window: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_window: Duration::from_millis(50),
        }
    }
}

/// A platform mechanism that turns filesystem activity into [`ChangeBatch`]es.
pub trait WatchBackend: Sized {
    /// Backend name for logging.
    const NAME: &'static str;

    /// Set up observation of `roots`.
    ///
    /// Nothing is delivered to `callback` until [`start`](Self::start) runs.
    fn create(
        roots: &[WatchRoot],
        callback: ChangeCallback,
        stop: StopToken,
        options: &BackendOptions,
    ) -> Result<Self, WatchError>;

    /// Run the observation loop on the calling thread.
    ///
    /// Returns `Ok(())` once stopped, or the error that ended observation.
    fn start(&mut self) -> Result<(), WatchError>;

    /// Ask the loop in [`start`](Self::start) to return.
    fn stop(&self);
}
