//! Download orchestration.
//!
//! Resolves a format for the source URL, fetches one or two streams, merges
//! them when needed and registers the final artifact for delayed deletion.
//! Subprocesses run strictly one after another within a request.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::media::{FormatPolicy, FormatSelection, MediaExtractor, StreamMerger};
use crate::storage::{ArtifactRole, ExpiryRegistry, RequestArtifacts, TempStore};
use crate::utils::fs;
use crate::{Error, Result};

/// Settings that shape every resolution.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Base of the advertised retrieval URL (no trailing slash).
    pub public_base_url: String,
    /// Lifetime of an unserved artifact.
    pub retention: Duration,
    pub policy: FormatPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            public_base_url: format!("http://localhost:{}", crate::config::DEFAULT_PORT),
            retention: Duration::from_secs(300),
            policy: FormatPolicy::default(),
        }
    }
}

/// A finished artifact ready to be served.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub filename: String,
    pub path: PathBuf,
    pub retrieval_url: String,
    pub selection: FormatSelection,
}

/// Check the `url` request parameter.
///
/// Missing or blank → "URL missing"; anything that is not an absolute
/// http(s) URL → "Invalid URL".
pub fn validate_source_url(raw: Option<&str>) -> Result<String> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::input("URL missing"))?;

    let parsed = url::Url::parse(raw).map_err(|e| Error::input(format!("Invalid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        scheme => Err(Error::input(format!("Invalid URL: unsupported scheme {scheme}"))),
    }
}

pub struct DownloadOrchestrator {
    extractor: Arc<dyn MediaExtractor>,
    merger: Arc<dyn StreamMerger>,
    store: TempStore,
    registry: Arc<ExpiryRegistry>,
    config: OrchestratorConfig,
}

impl DownloadOrchestrator {
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        merger: Arc<dyn StreamMerger>,
        store: TempStore,
        registry: Arc<ExpiryRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            extractor,
            merger,
            store,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &TempStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ExpiryRegistry> {
        &self.registry
    }

    /// Retrieval URL for an artifact basename.
    pub fn retrieval_url(&self, filename: &str) -> String {
        format!("{}/temp/{}", self.config.public_base_url, filename)
    }

    /// Produce a downloadable artifact for `source_url`.
    pub async fn resolve(&self, source_url: &str) -> Result<ResolvedArtifact> {
        let source_url = validate_source_url(Some(source_url))?;
        let start = Instant::now();

        let descriptor = self
            .extractor
            .resolve(&source_url, &self.config.policy)
            .await?;
        info!(
            url = %source_url,
            extractor = self.extractor.name(),
            format_id = descriptor.format_id.as_deref().unwrap_or("<none>"),
            resolution = descriptor.resolution.as_deref().unwrap_or("<unknown>"),
            ext = descriptor.ext.as_deref().unwrap_or("<unknown>"),
            "Format selected"
        );

        let selection = descriptor.selection()?;
        let artifacts = self.store.allocate();
        let merged = artifacts.path(ArtifactRole::Merged).to_path_buf();

        let outcome = match &selection {
            FormatSelection::Composite { video, audio } => {
                let result = self
                    .build_composite(&source_url, video, audio, &artifacts)
                    .await;
                artifacts.remove_intermediates().await;
                result
            }
            FormatSelection::Single(format_id) => {
                self.build_single(&source_url, format_id, &merged).await
            }
        };

        if let Err(e) = outcome {
            artifacts.remove_merged().await;
            warn!(url = %source_url, token = artifacts.token(), error = %e, "Download failed");
            return Err(e);
        }

        let filename = artifacts.merged_name();
        self.registry
            .schedule(filename.clone(), merged.clone(), self.config.retention);

        info!(
            url = %source_url,
            %filename,
            composite = selection.is_composite(),
            "Artifact ready in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(ResolvedArtifact {
            retrieval_url: self.retrieval_url(&filename),
            filename,
            path: merged,
            selection,
        })
    }

    async fn build_single(&self, source_url: &str, format_id: &str, output: &Path) -> Result<()> {
        self.extractor.fetch(source_url, format_id, output).await?;

        if !fs::file_exists(output).await {
            return Err(Error::download(format!(
                "format {format_id} produced no output file"
            )));
        }
        Ok(())
    }

    async fn build_composite(
        &self,
        source_url: &str,
        video_id: &str,
        audio_id: &str,
        artifacts: &RequestArtifacts,
    ) -> Result<()> {
        let video = artifacts.path(ArtifactRole::Video);
        let audio = artifacts.path(ArtifactRole::Audio);

        debug!(token = artifacts.token(), video_id, "Fetching video stream");
        self.extractor.fetch(source_url, video_id, video).await?;
        debug!(token = artifacts.token(), audio_id, "Fetching audio stream");
        self.extractor.fetch(source_url, audio_id, audio).await?;

        let video_ok = fs::file_exists(video).await;
        let audio_ok = fs::file_exists(audio).await;
        if !video_ok || !audio_ok {
            return Err(Error::download(format!(
                "temporary video or audio missing (video: {video_ok}, audio: {audio_ok})"
            )));
        }

        let merged = artifacts.path(ArtifactRole::Merged);
        info!(merger = self.merger.name(), token = artifacts.token(), "Merging streams");
        self.merger.merge(video, audio, merged).await?;

        if !fs::file_exists(merged).await {
            return Err(Error::Merge("merger produced no output file".to_string()));
        }
        Ok(())
    }
}
