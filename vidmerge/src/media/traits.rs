//! Seams to the external media tools.

use std::path::Path;

use async_trait::async_trait;

use super::format::{FormatDescriptor, FormatPolicy};
use crate::Result;

/// Metadata resolution and stream fetching (yt-dlp in production).
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Resolve which format(s) `policy` selects for `source_url`.
    async fn resolve(&self, source_url: &str, policy: &FormatPolicy) -> Result<FormatDescriptor>;

    /// Download the stream identified by `format_id` to `output`.
    ///
    /// Returning `Ok` does not guarantee that `output` exists; callers verify.
    async fn fetch(&self, source_url: &str, format_id: &str, output: &Path) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Stream-copy merge of a video and an audio file (ffmpeg in production).
#[async_trait]
pub trait StreamMerger: Send + Sync {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    fn name(&self) -> &'static str;
}
