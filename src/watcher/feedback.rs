//! Feedback suppression for announced paths.
//!
//! Editors often write a file several times in a row (write, rename,
//! chmod). The cache collapses such bursts into one announcement per path
//! within a rolling window.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Suppression window applied when none is configured.
pub const DEFAULT_FEEDBACK_WINDOW: Duration = Duration::from_secs(1);

/// Time-windowed set of recently announced paths.
///
/// Entries expire lazily: the sweep runs once at the start of every
/// [`filter`](Self::filter) call, no timer is involved. Keys are raw paths,
/// so two names differing only in non UTF-8 bytes never shadow each other.
#[derive(Debug)]
pub struct FeedbackCache {
    /// Suppressed paths: path -> expiry.
    entries: HashMap<PathBuf, Instant>,
    /// How long a path stays suppressed after its last change.
    window: Duration,
}

impl Default for FeedbackCache {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDBACK_WINDOW)
    }
}

impl FeedbackCache {
    /// Create a cache with the given suppression window.
    pub fn new(window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            window,
        }
    }

    /// Filter `paths`, returning those not currently suppressed.
    ///
    /// Input order is preserved. Every input path, emitted or not, has its
    /// suppression extended to `now + window`.
    pub fn filter<I>(&mut self, now: Instant, paths: I) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.entries.retain(|_, expiry| *expiry >= now);

        let expiry = now + self.window;
        let mut out = Vec::new();

        for path in paths {
            if !self.entries.contains_key(&path) {
                out.push(path.clone());
            }
            self.entries.insert(path, expiry);
        }

        out
    }

    /// Check whether `path` is suppressed at `now`.
    pub fn is_suppressed(&self, path: &Path, now: Instant) -> bool {
        self.entries.get(path).is_some_and(|expiry| *expiry >= now)
    }

    /// The configured suppression window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
