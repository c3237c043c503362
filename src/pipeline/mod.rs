//! Orchestration of the watch pipeline.
//!
//! # Architecture
//!
//! ```text
//! WatchBackend --ChangeBatch--> Dispatcher
//!                                 - PrefixMap (remap)
//!                                 - FeedbackCache (suppress)
//!                                 - NotificationSink (send)
//! Lifecycle <-- signal handler (stop only)
//! ```

mod dispatcher;
mod error;
mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use dispatcher::Dispatcher;
pub use error::PipelineError;
pub use lifecycle::{Interrupt, Lifecycle, RunState};

use crate::remap::{PrefixMap, PrefixRule};
use crate::sink::{NotificationSink, SinkError};
use crate::watcher::{
    BackendOptions, ChangeCallback, DEFAULT_FEEDBACK_WINDOW, FeedbackCache, WatchBackend,
    WatchRoot,
};

/// A resolved pipeline, ready to run once.
pub struct Pipeline<S> {
    roots: Vec<WatchRoot>,
    dispatcher: Dispatcher<S>,
    options: BackendOptions,
    lifecycle: Arc<Lifecycle>,
}

impl<S: NotificationSink + 'static> Pipeline<S> {
    /// Handle for stopping the pipeline from another thread or a signal.
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    pub fn roots(&self) -> &[WatchRoot] {
        &self.roots
    }

    pub fn prefix_map(&self) -> &PrefixMap {
        self.dispatcher.prefix_map()
    }

    /// Watch with backend `B` until stopped.
    ///
    /// Blocks the calling thread. Returns `Ok(())` after a requested stop,
    /// or the backend error that ended the watch.
    pub fn run<B: WatchBackend>(self) -> Result<(), PipelineError> {
        let Pipeline {
            roots,
            mut dispatcher,
            options,
            lifecycle,
        } = self;

        let callback: ChangeCallback = Box::new(move |batch| {
            dispatcher.dispatch(Instant::now(), batch);
        });
        let mut backend = B::create(&roots, callback, lifecycle.token(), &options)?;

        lifecycle.begin()?;
        crate::log_event!(
            "pipeline",
            "running",
            "{} backend, {} roots",
            B::NAME,
            roots.len()
        );

        let result = backend.start();
        lifecycle.finish();

        match &result {
            Ok(()) => crate::log_event!("pipeline", "terminated"),
            Err(e) => tracing::error!("[pipeline] watch ended: {e}"),
        }

        result.map_err(PipelineError::from)
    }
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    pairs: Vec<(PathBuf, PathBuf)>,
    feedback_window: Duration,
    options: BackendOptions,
    lifecycle: Option<Arc<Lifecycle>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            pairs: Vec::new(),
            feedback_window: DEFAULT_FEEDBACK_WINDOW,
            options: BackendOptions::default(),
            lifecycle: None,
        }
    }

    /// Watch `local` and report its changes under `remote`.
    ///
    /// Pairs are matched in the order they are added.
    pub fn pair(mut self, local: impl Into<PathBuf>, remote: impl Into<PathBuf>) -> Self {
        self.pairs.push((local.into(), remote.into()));
        self
    }

    /// Set the feedback suppression window.
    pub fn feedback_window(mut self, window: Duration) -> Self {
        self.feedback_window = window;
        self
    }

    /// Set the backend loop timings.
    pub fn backend_options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }

    /// Share an existing lifecycle, e.g. one a signal handler already holds.
    pub fn lifecycle(mut self, lifecycle: Arc<Lifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Resolve every local path, then create the sink.
    ///
    /// Nothing is watched yet. Any unresolvable path aborts the build before
    /// the sink is created.
    pub fn build<S, F>(self, make_sink: F) -> Result<Pipeline<S>, PipelineError>
    where
        S: NotificationSink,
        F: FnOnce() -> Result<S, SinkError>,
    {
        if self.pairs.is_empty() {
            return Err(PipelineError::NoRoots);
        }

        let mut roots = Vec::with_capacity(self.pairs.len());
        let mut prefix_map = PrefixMap::new();

        for (local, remote) in self.pairs {
            let root = WatchRoot::resolve(&local)
                .map_err(|source| PipelineError::PathResolution { path: local, source })?;
            crate::debug_event!(
                "pipeline",
                "mapping",
                "{} -> {}",
                root.path().display(),
                remote.display()
            );
            prefix_map.push(PrefixRule::new(root.path(), remote));
            roots.push(root);
        }

        let sink = make_sink()?;
        let feedback = FeedbackCache::new(self.feedback_window);

        Ok(Pipeline {
            roots,
            dispatcher: Dispatcher::new(prefix_map, feedback, sink),
            options: self.options,
            lifecycle: self.lifecycle.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::{NullBackend, PollBackend};
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingSink {
        batches: Arc<Mutex<Vec<Vec<PathBuf>>>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&mut self, paths: &[PathBuf]) -> Result<(), SinkError> {
            self.batches.lock().unwrap().push(paths.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_build_resolves_in_order() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();

        let pipeline = PipelineBuilder::new()
            .pair(a.path(), "/remote/a")
            .pair(b.path(), "/remote/b")
            .build(|| Ok(RecordingSink::default()))
            .unwrap();

        let rules = pipeline.prefix_map().rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].remote_prefix, Path::new("/remote/a"));
        assert_eq!(
            rules[0].local_prefix,
            std::fs::canonicalize(a.path()).unwrap()
        );
        assert_eq!(rules[1].remote_prefix, Path::new("/remote/b"));
        assert_eq!(pipeline.roots().len(), 2);
    }

    #[test]
    fn test_build_fails_on_missing_path() {
        let dir = TempDir::new().unwrap();
        let mut sink_created = false;

        let result = PipelineBuilder::new()
            .pair(dir.path().join("nope"), "/remote")
            .build(|| {
                sink_created = true;
                Ok(RecordingSink::default())
            });

        assert!(matches!(result, Err(PipelineError::PathResolution { .. })));
        assert!(!sink_created);
    }

    #[test]
    fn test_build_requires_pairs() {
        let result = PipelineBuilder::new().build(|| Ok(RecordingSink::default()));
        assert!(matches!(result, Err(PipelineError::NoRoots)));
    }

    #[test]
    fn test_run_null_backend_terminates() {
        let dir = TempDir::new().unwrap();
        let pipeline = PipelineBuilder::new()
            .pair(dir.path(), "/remote")
            .build(|| Ok(RecordingSink::default()))
            .unwrap();
        let lifecycle = pipeline.lifecycle();

        pipeline.run::<NullBackend>().unwrap();
        assert_eq!(lifecycle.state(), RunState::Terminated);
    }

    #[test]
    fn test_run_poll_backend_end_to_end() {
        let dir = TempDir::new().unwrap();
        let sink = RecordingSink::default();
        let batches = Arc::clone(&sink.batches);

        let pipeline = PipelineBuilder::new()
            .pair(dir.path(), "/remote/proj")
            .backend_options(BackendOptions {
                poll_interval: Duration::from_millis(20),
                batch_window: Duration::from_millis(10),
            })
            .build(move || Ok(sink))
            .unwrap();
        let lifecycle = pipeline.lifecycle();
        let file = pipeline.roots()[0].path().join("a.txt");

        let runner = std::thread::spawn(move || pipeline.run::<PollBackend>());

        // Wait until the loop is up before touching the directory
        while lifecycle.state() == RunState::Init {
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(100));
        std::fs::write(&file, b"hello").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let seen = batches.lock().unwrap();
            if seen.iter().flatten().any(|p| p == Path::new("/remote/proj/a.txt")) {
                break;
            }
            drop(seen);
            std::thread::sleep(Duration::from_millis(20));
        }

        assert_eq!(lifecycle.interrupt(), Interrupt::Stopping);
        runner.join().unwrap().unwrap();
        assert_eq!(lifecycle.state(), RunState::Terminated);

        let seen = batches.lock().unwrap();
        assert!(seen.iter().flatten().any(|p| p == Path::new("/remote/proj/a.txt")));
    }
}
