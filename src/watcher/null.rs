//! Backend that observes nothing.
//!
//! Used on targets without a native mechanism, and to run the pipeline
//! without touching the filesystem.

use super::backend::{BackendOptions, ChangeCallback, StopToken, WatchBackend, WatchRoot};
use super::error::WatchError;

/// No-op watch backend. [`start`](WatchBackend::start) returns immediately.
pub struct NullBackend {
    stop: StopToken,
    _callback: ChangeCallback,
}

impl WatchBackend for NullBackend {
    const NAME: &'static str = "null";

    fn create(
        roots: &[WatchRoot],
        callback: ChangeCallback,
        stop: StopToken,
        _options: &BackendOptions,
    ) -> Result<Self, WatchError> {
        crate::debug_event!(Self::NAME, "created", "{} roots ignored", roots.len());
        Ok(Self {
            stop,
            _callback: callback,
        })
    }

    fn start(&mut self) -> Result<(), WatchError> {
        tracing::warn!("[null] no watch backend available, nothing will be observed");
        Ok(())
    }

    fn stop(&self) {
        self.stop.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_backend_returns_immediately() {
        let stop = StopToken::new();
        let mut backend = NullBackend::create(
            &[],
            Box::new(|_: crate::watcher::ChangeBatch| panic!("null backend never reports")),
            stop.clone(),
            &BackendOptions::default(),
        )
        .unwrap();

        assert!(backend.start().is_ok());
        backend.stop();
        backend.stop();
        assert!(stop.is_stopped());
    }
}
