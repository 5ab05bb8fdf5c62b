//! Expiring-entry registry for finished artifacts.
//!
//! Each finished artifact is registered with a deadline. A single periodic
//! sweep deletes whatever has expired; serving an artifact removes its entry
//! first, so the sweep and the serve path never both own the same file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::fs;

#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    deadline: Instant,
}

/// Artifact name → deletion deadline.
#[derive(Debug, Default)]
pub struct ExpiryRegistry {
    entries: DashMap<String, Entry>,
}

impl ExpiryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` under `name`, to be deleted `ttl` from now.
    pub fn schedule(&self, name: impl Into<String>, path: impl Into<PathBuf>, ttl: Duration) {
        self.schedule_at(name, path, Instant::now() + ttl);
    }

    /// Register `path` under `name` with an absolute deadline.
    ///
    /// Re-registering a name replaces its deadline.
    pub fn schedule_at(&self, name: impl Into<String>, path: impl Into<PathBuf>, deadline: Instant) {
        let name = name.into();
        let path = path.into();
        debug!(%name, path = %path.display(), "Artifact registered for expiry");
        self.entries.insert(name, Entry { path, deadline });
    }

    /// Remove `name` from the registry. Returns whether it was registered.
    pub fn cancel(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every entry whose deadline is at or before `now`.
    fn take_expired(&self, now: Instant) -> Vec<(String, PathBuf)> {
        let mut expired = Vec::new();
        self.entries.retain(|name, entry| {
            if entry.deadline <= now {
                expired.push((name.clone(), entry.path.clone()));
                false
            } else {
                true
            }
        });
        expired
    }

    /// Delete all artifacts expired at `now`. Returns how many files were removed.
    ///
    /// Files that are already gone are dropped from the registry silently.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        for (name, path) in self.take_expired(now) {
            if fs::remove_file_best_effort(&path).await {
                info!(%name, "Expired artifact removed");
                removed += 1;
            } else {
                debug!(%name, "Expired artifact was already gone");
            }
        }
        removed
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    /// Run [`sweep`](Self::sweep) every `interval` until `cancel_token` fires.
    pub fn start_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Artifact sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        registry.sweep().await;
                    }
                }
            }
        })
    }
}
