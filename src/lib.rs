//! Watch local directories and forward debounced, remapped change sets to a
//! remote listener.
//!
//! ```text
//! WatchBackend -> PrefixMap -> FeedbackCache -> NotificationSink
//! ```

pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod remap;
pub mod sink;
pub mod watcher;

pub use config::Settings;
pub use pipeline::{Lifecycle, Pipeline, PipelineBuilder, PipelineError};
pub use remap::{PrefixMap, PrefixRule};
pub use sink::{Endpoint, NotificationSink, UdpSink};
pub use watcher::{
    ChangeBatch, FeedbackCache, PlatformBackend, StopToken, WatchBackend, WatchRoot,
};
