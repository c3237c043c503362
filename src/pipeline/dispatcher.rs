//! The per-batch path from backend callback to sink.

use std::path::PathBuf;
use std::time::Instant;

use crate::remap::PrefixMap;
use crate::sink::NotificationSink;
use crate::watcher::{ChangeBatch, FeedbackCache};

/// Remaps, filters and forwards change batches.
///
/// Owned by the backend callback, so it is only ever driven from the
/// backend's loop thread.
pub struct Dispatcher<S> {
    prefix_map: PrefixMap,
    feedback: FeedbackCache,
    sink: S,
}

impl<S: NotificationSink> Dispatcher<S> {
    pub fn new(prefix_map: PrefixMap, feedback: FeedbackCache, sink: S) -> Self {
        Self {
            prefix_map,
            feedback,
            sink,
        }
    }

    /// Handle one batch observed at `now`.
    ///
    /// Returns the paths handed to the sink, or `None` when every path was
    /// suppressed and the sink was not called. Send failures are logged and
    /// dropped.
    pub fn dispatch(&mut self, now: Instant, batch: ChangeBatch) -> Option<Vec<PathBuf>> {
        let remapped: Vec<PathBuf> = batch
            .paths()
            .iter()
            .map(|path| self.prefix_map.remap(path))
            .collect();

        let outgoing = self.feedback.filter(now, remapped);
        if outgoing.is_empty() {
            crate::debug_event!("pipeline", "suppressed", "{} paths", batch.len());
            return None;
        }

        for path in &outgoing {
            crate::debug_event!("pipeline", "changed", "{}", path.display());
        }

        if let Err(e) = self.sink.notify(&outgoing) {
            match std::error::Error::source(&e) {
                Some(cause) => tracing::warn!("[pipeline] notification dropped: {e}: {cause}"),
                None => tracing::warn!("[pipeline] notification dropped: {e}"),
            }
        }

        Some(outgoing)
    }

    pub fn prefix_map(&self) -> &PrefixMap {
        &self.prefix_map
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
