//! Service wiring: builds the collaborators from config and owns background tasks.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Result;
use crate::api::{ApiServer, ApiServerConfig, AppState};
use crate::config::AppConfig;
use crate::downloader::{DownloadOrchestrator, OrchestratorConfig};
use crate::heartbeat::start_heartbeat;
use crate::media::{FfmpegMerger, FormatPolicy, YtDlp};
use crate::storage::{ExpiryRegistry, TempStore};

pub struct ServiceContainer {
    config: AppConfig,
    orchestrator: Arc<DownloadOrchestrator>,
    registry: Arc<ExpiryRegistry>,
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ServiceContainer {
    /// Build the production collaborators (yt-dlp + ffmpeg).
    pub fn new(config: AppConfig) -> Self {
        let registry = Arc::new(ExpiryRegistry::new());
        let extractor = Arc::new(YtDlp::new(&config.ytdlp_path, config.process_timeout));
        let merger = Arc::new(FfmpegMerger::new(&config.ffmpeg_path, config.process_timeout));

        let orchestrator = Arc::new(DownloadOrchestrator::new(
            extractor,
            merger,
            TempStore::new(&config.temp_dir),
            Arc::clone(&registry),
            OrchestratorConfig {
                public_base_url: config.public_base_url.clone(),
                retention: config.artifact_retention,
                policy: FormatPolicy::new(config.max_video_height, &config.fallback_format),
            },
        ));

        Self {
            config,
            orchestrator,
            registry,
            cancel_token: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Prepare the temp directory and start the sweeper and heartbeat.
    pub async fn start(&mut self) -> Result<()> {
        self.orchestrator.store().init().await?;
        info!(dir = %self.config.temp_dir.display(), "Temp directory ready");

        self.tasks.push(
            self.registry
                .start_sweeper(self.config.sweep_interval, self.cancel_token.clone()),
        );
        self.tasks.push(start_heartbeat(
            self.config.heartbeat_interval,
            Arc::clone(&self.registry),
            self.cancel_token.clone(),
        ));
        Ok(())
    }

    pub fn api_server(&self) -> ApiServer {
        ApiServer::new(
            ApiServerConfig::from(&self.config),
            AppState::new(Arc::clone(&self.orchestrator)),
            self.cancel_token.clone(),
        )
    }

    /// Stop background tasks and wait for them to exit.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
