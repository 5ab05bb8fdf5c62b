//! In-process stand-ins for yt-dlp and ffmpeg.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tempfile::TempDir;

use vidmerge::api::AppState;
use vidmerge::api::routes::create_router;
use vidmerge::downloader::{DownloadOrchestrator, OrchestratorConfig};
use vidmerge::media::{FormatDescriptor, FormatPolicy, MediaExtractor, StreamMerger};
use vidmerge::storage::{ExpiryRegistry, TempStore};
use vidmerge::{Error, Result};

pub struct FakeExtractor {
    pub format_id: Option<String>,
    pub skip: HashSet<String>,
    pub delay: Duration,
    pub resolves: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(format_id: Option<&str>) -> Self {
        Self {
            format_id: format_id.map(str::to_string),
            skip: HashSet::new(),
            delay: Duration::ZERO,
            resolves: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn skipping(mut self, id: &str) -> Self {
        self.skip.insert(id.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.resolves.load(Ordering::SeqCst) + self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn resolve(&self, _url: &str, _policy: &FormatPolicy) -> Result<FormatDescriptor> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(FormatDescriptor {
            format_id: self.format_id.clone(),
            resolution: None,
            ext: Some("mp4".to_string()),
        })
    }

    async fn fetch(&self, url: &str, format_id: &str, output: &Path) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.skip.contains(format_id) {
            return Ok(());
        }
        tokio::fs::write(output, format!("{url}|{format_id}")).await?;
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FakeExtractor"
    }
}

#[derive(Default)]
pub struct FakeMerger {
    pub merges: AtomicUsize,
}

#[async_trait]
impl StreamMerger for FakeMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        self.merges.fetch_add(1, Ordering::SeqCst);
        let v = tokio::fs::read_to_string(video).await?;
        let a = tokio::fs::read_to_string(audio).await?;
        tokio::fs::write(output, format!("{v}#{a}"))
            .await
            .map_err(|e| Error::Merge(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "FakeMerger"
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub extractor: Arc<FakeExtractor>,
    pub merger: Arc<FakeMerger>,
    pub orchestrator: Arc<DownloadOrchestrator>,
    pub router: Router,
}

impl TestApp {
    pub fn new(extractor: FakeExtractor) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let extractor = Arc::new(extractor);
        let merger = Arc::new(FakeMerger::default());

        let orchestrator = Arc::new(DownloadOrchestrator::new(
            extractor.clone(),
            merger.clone(),
            TempStore::new(dir.path()),
            Arc::new(ExpiryRegistry::new()),
            OrchestratorConfig::default(),
        ));
        let router = create_router(AppState::new(orchestrator.clone()));

        Self {
            dir,
            extractor,
            merger,
            orchestrator,
            router,
        }
    }

    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("read temp dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
