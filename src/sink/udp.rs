//! UDP datagram sink.
//!
//! Each batch is sent as one or more JSON datagrams of the form
//! `{"paths": ["/remote/a", ...]}`. Delivery is fire-and-forget. Names that
//! are not valid UTF-8 are converted lossily here, on the wire only.

use std::borrow::Cow;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{Endpoint, NotificationSink, SinkError};

/// Largest payload a single datagram carries unless configured otherwise.
pub const DEFAULT_MAX_DATAGRAM_BYTES: usize = 60_000;

/// Wire payload of one datagram.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification<'a> {
    #[serde(borrow)]
    pub paths: Vec<&'a str>,
}

/// Sends change notifications to a remote listener over UDP.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
    endpoint: Endpoint,
    max_datagram_bytes: usize,
}

impl UdpSink {
    /// Resolve `endpoint` and bind an ephemeral local socket.
    pub fn connect(endpoint: &Endpoint, max_datagram_bytes: usize) -> Result<Self, SinkError> {
        let resolve_err = |source| SinkError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        };

        let target = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(resolve_err)?
            .next()
            .ok_or_else(|| {
                resolve_err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no addresses found",
                ))
            })?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(SinkError::Bind)?;

        crate::debug_event!("sink", "resolved", "{endpoint} -> {target}");

        Ok(Self {
            socket,
            target,
            endpoint: endpoint.clone(),
            max_datagram_bytes,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl NotificationSink for UdpSink {
    fn notify(&mut self, paths: &[PathBuf]) -> Result<(), SinkError> {
        for datagram in encode_datagrams(paths, self.max_datagram_bytes)? {
            self.socket
                .send_to(&datagram, self.target)
                .map_err(|source| SinkError::Send {
                    endpoint: self.endpoint.to_string(),
                    source,
                })?;
        }

        crate::debug_event!("sink", "sent", "{} paths to {}", paths.len(), self.endpoint);
        Ok(())
    }
}

/// Split `paths` into JSON datagrams no larger than `max_bytes`.
///
/// A path that cannot fit in a datagram on its own is skipped.
pub fn encode_datagrams(paths: &[PathBuf], max_bytes: usize) -> Result<Vec<Vec<u8>>, SinkError> {
    // `{"paths":[]}`
    const ENVELOPE: usize = 12;

    let names: Vec<Cow<'_, str>> = paths.iter().map(|path| path.to_string_lossy()).collect();

    let mut datagrams = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();
    let mut size = ENVELOPE;

    for path in &names {
        let path: &str = path;
        let encoded = serde_json::to_string(path)?.len();
        if ENVELOPE + encoded > max_bytes {
            tracing::warn!("[sink] path too long for one datagram, skipped: {path}");
            continue;
        }

        let separator = usize::from(!chunk.is_empty());
        if size + separator + encoded > max_bytes {
            datagrams.push(serde_json::to_vec(&Notification {
                paths: std::mem::take(&mut chunk),
            })?);
            size = ENVELOPE;
        }

        size += usize::from(!chunk.is_empty()) + encoded;
        chunk.push(path);
    }

    if !chunk.is_empty() {
        datagrams.push(serde_json::to_vec(&Notification { paths: chunk })?);
    }

    Ok(datagrams)
}
