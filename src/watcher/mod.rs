//! Watch backends that turn OS change notifications into batches.
//!
//! # Architecture
//!
//! ```text
//! WatchBackend (trait)
//!   - NotifyBackend<W>   inotify / FSEvents / kqueue / polling via notify
//!   - NullBackend        observes nothing
//!         |
//!    ChangeBatch -> callback
//! ```
//!
//! [`PlatformBackend`] names the native backend for the build target.

mod backend;
mod error;
pub mod feedback;
mod native;
mod null;

pub use backend::{
    BackendOptions, ChangeBatch, ChangeCallback, StopToken, WatchBackend, WatchRoot,
};
pub use error::WatchError;
pub use feedback::{DEFAULT_FEEDBACK_WINDOW, FeedbackCache};
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use native::InotifyBackend;
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
pub use native::KernelEventBackend;
pub use native::{NativeWatcher, NotifyBackend, PollBackend};
pub use null::NullBackend;

/// Native backend for the build target.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub type PlatformBackend = InotifyBackend;

/// Native backend for the build target.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
pub type PlatformBackend = KernelEventBackend;

/// Native backend for the build target.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
)))]
pub type PlatformBackend = NullBackend;
