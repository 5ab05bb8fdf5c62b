//! Periodic liveness log line.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::storage::ExpiryRegistry;

/// Log "still running" every `interval` until `cancel_token` fires.
pub fn start_heartbeat(
    interval: Duration,
    registry: Arc<ExpiryRegistry>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    let started = Instant::now();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Heartbeat task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    info!(
                        uptime_secs = started.elapsed().as_secs(),
                        pending_artifacts = registry.len(),
                        "Server still running: {}",
                        Local::now().format("%H:%M:%S")
                    );
                }
            }
        }
    })
}
