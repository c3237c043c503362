//! Backends built on the `notify` crate.
//!
//! One generic event loop serves every OS mechanism notify exposes; the
//! type aliases below pick the mechanism.

use std::path::PathBuf;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use indexmap::IndexSet;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use super::backend::{
    BackendOptions, ChangeBatch, ChangeCallback, StopToken, WatchBackend, WatchRoot,
};
use super::error::WatchError;

/// A notify watcher usable as a backend mechanism.
pub trait NativeWatcher: Watcher {
    /// Mechanism name for logging.
    const KIND: &'static str;
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl NativeWatcher for notify::INotifyWatcher {
    const KIND: &'static str = "inotify";
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
impl NativeWatcher for notify::RecommendedWatcher {
    const KIND: &'static str = "kernel-event";
}

impl NativeWatcher for notify::PollWatcher {
    const KIND: &'static str = "poll";
}

/// Inotify-style backend (watch descriptors per directory).
#[cfg(any(target_os = "linux", target_os = "android"))]
pub type InotifyBackend = NotifyBackend<notify::INotifyWatcher>;

/// Kernel event backend: FSEvents on macOS, kqueue on the BSDs.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
pub type KernelEventBackend = NotifyBackend<notify::RecommendedWatcher>;

/// Portable stat-polling backend, for filesystems without change events.
pub type PollBackend = NotifyBackend<notify::PollWatcher>;

/// Watch backend driven by a notify watcher.
///
/// Events arrive on a channel fed by the notify thread. The loop wakes at
/// least every `poll_interval` to check the stop token, and gathers each
/// burst for `batch_window` before invoking the callback once.
pub struct NotifyBackend<W: NativeWatcher> {
    /// Roots still present on disk.
    roots: Vec<WatchRoot>,
    callback: ChangeCallback,
    stop: StopToken,
    options: BackendOptions,
    event_rx: Receiver<notify::Result<Event>>,
    watcher: W,
}

impl<W: NativeWatcher> WatchBackend for NotifyBackend<W> {
    const NAME: &'static str = W::KIND;

    fn create(
        roots: &[WatchRoot],
        callback: ChangeCallback,
        stop: StopToken,
        options: &BackendOptions,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = unbounded();

        let config = notify::Config::default().with_poll_interval(options.poll_interval);
        let mut watcher = W::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            config,
        )?;

        for root in roots {
            watcher
                .watch(root.path(), RecursiveMode::Recursive)
                .map_err(|e| WatchError::PathWatchFailed {
                    path: root.path().to_path_buf(),
                    reason: e.to_string(),
                })?;
            crate::debug_event!(W::KIND, "watching", "{}", root.path().display());
        }

        Ok(Self {
            roots: roots.to_vec(),
            callback,
            stop,
            options: *options,
            event_rx: rx,
            watcher,
        })
    }

    fn start(&mut self) -> Result<(), WatchError> {
        crate::log_event!(W::KIND, "started", "{} roots", self.roots.len());

        loop {
            if self.stop.is_stopped() {
                crate::log_event!(W::KIND, "stopped");
                return Ok(());
            }

            match self.event_rx.recv_timeout(self.options.poll_interval) {
                Ok(first) => {
                    let mut burst = Burst::default();
                    burst.absorb(first)?;
                    self.collect_burst(&mut burst)?;

                    if burst.saw_remove {
                        self.prune_removed_roots(&mut burst.paths)?;
                    }

                    if !burst.paths.is_empty() {
                        crate::debug_event!(W::KIND, "batch", "{} paths", burst.paths.len());
                        (self.callback)(burst.paths.into_iter().collect::<ChangeBatch>());
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(WatchError::ChannelClosed),
            }
        }
    }

    fn stop(&self) {
        self.stop.stop();
    }
}

impl<W: NativeWatcher> NotifyBackend<W> {
    /// Keep receiving until the batch window closes.
    fn collect_burst(&self, burst: &mut Burst) -> Result<(), WatchError> {
        let deadline = Instant::now() + self.options.batch_window;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || self.stop.is_stopped() {
                return Ok(());
            }

            match self.event_rx.recv_timeout(remaining) {
                Ok(res) => burst.absorb(res)?,
                Err(RecvTimeoutError::Timeout) => return Ok(()),
                Err(RecvTimeoutError::Disconnected) => return Err(WatchError::ChannelClosed),
            }
        }
    }

    /// Drop roots that vanished, along with any paths reported under them.
    fn prune_removed_roots(&mut self, paths: &mut IndexSet<PathBuf>) -> Result<(), WatchError> {
        let (alive, gone): (Vec<_>, Vec<_>) =
            self.roots.drain(..).partition(|root| root.path().exists());
        self.roots = alive;

        for root in &gone {
            tracing::warn!("[{}] watch root removed: {}", W::KIND, root.path().display());
            let _ = self.watcher.unwatch(root.path());
            paths.retain(|path| !path.starts_with(root.path()));
        }

        if self.roots.is_empty() {
            return Err(WatchError::RootRemoved);
        }

        Ok(())
    }
}

/// Paths gathered from one burst of events.
#[derive(Default)]
struct Burst {
    paths: IndexSet<PathBuf>,
    saw_remove: bool,
}

impl Burst {
    fn absorb(&mut self, res: notify::Result<Event>) -> Result<(), WatchError> {
        match res {
            Ok(event) => {
                match event.kind {
                    EventKind::Access(_) => return Ok(()),
                    EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
                        self.saw_remove = true
                    }
                    _ => {}
                }
                self.paths.extend(event.paths);
            }
            Err(e) => {
                if let Some(fatal) = WatchError::from_runtime(&e) {
                    return Err(fatal);
                }
                tracing::warn!("[watcher] file watch error: {e}");
            }
        }

        Ok(())
    }
}
