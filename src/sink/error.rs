//! Error types for notification sinks.

use thiserror::Error;

/// Errors from sending notifications.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid endpoint '{input}': {reason}")]
    InvalidEndpoint { input: String, reason: String },

    #[error("Cannot resolve {endpoint}")]
    Resolve {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind local socket")]
    Bind(#[source] std::io::Error),

    #[error("Failed to encode notification")]
    Encode(#[from] serde_json::Error),

    #[error("Send to {endpoint} failed")]
    Send {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}
