//! Notification sinks: where filtered change batches are delivered.

mod endpoint;
mod error;
pub mod udp;

use std::path::PathBuf;

pub use endpoint::{DEFAULT_HOST, DEFAULT_PORT, Endpoint};
pub use error::SinkError;
pub use udp::{DEFAULT_MAX_DATAGRAM_BYTES, UdpSink};

/// Receives batches of remote-facing paths.
///
/// Sends are best-effort: an error is reported to the caller but the batch
/// is not retried.
pub trait NotificationSink: Send {
    fn notify(&mut self, paths: &[PathBuf]) -> Result<(), SinkError>;
}
