//! Watch command: resolve paths, wire the pipeline and run it until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{BackendKind, Settings};
use crate::pipeline::{Interrupt, Lifecycle, PipelineBuilder};
use crate::sink::{Endpoint, UdpSink};
use crate::watcher::{NullBackend, PlatformBackend, PollBackend};

/// Run watch command.
///
/// Blocks until the watch is interrupted or the backend fails.
pub async fn run_watch(
    pairs: Vec<(PathBuf, PathBuf)>,
    endpoint: Endpoint,
    settings: &Settings,
) -> anyhow::Result<()> {
    let lifecycle = Arc::new(Lifecycle::new());
    spawn_interrupt_handler(Arc::clone(&lifecycle));

    let mut builder = PipelineBuilder::new()
        .feedback_window(settings.watch.feedback_window())
        .backend_options(settings.watch.backend_options())
        .lifecycle(lifecycle);
    for (local, remote) in pairs {
        builder = builder.pair(local, remote);
    }

    let max_datagram_bytes = settings.notify.max_datagram_bytes;
    let pipeline = builder.build(|| UdpSink::connect(&endpoint, max_datagram_bytes))?;

    for rule in pipeline.prefix_map().rules() {
        crate::log_event!(
            "watch",
            "mapping",
            "{} -> {}",
            rule.local_prefix.display(),
            rule.remote_prefix.display()
        );
    }
    crate::log_event!("watch", "notifying", "{endpoint}");

    let backend = settings.watch.backend;
    tokio::task::spawn_blocking(move || match backend {
        BackendKind::Native => pipeline.run::<PlatformBackend>(),
        BackendKind::Poll => pipeline.run::<PollBackend>(),
        BackendKind::Null => pipeline.run::<NullBackend>(),
    })
    .await
    .context("watch thread panicked")??;

    Ok(())
}

/// Route Ctrl-C to the pipeline lifecycle.
///
/// Exits the process right away when no watch is running yet.
fn spawn_interrupt_handler(lifecycle: Arc<Lifecycle>) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("[watch] cannot listen for interrupts: {e}");
                return;
            }

            match lifecycle.interrupt() {
                Interrupt::Stopping => crate::log_event!("watch", "interrupted, stopping"),
                Interrupt::AlreadyStopping => crate::debug_event!("watch", "already stopping"),
                Interrupt::NoActiveWatch => std::process::exit(0),
            }
        }
    });
}
