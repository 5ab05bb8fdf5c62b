//! API request and response models.

use serde::{Deserialize, Serialize};

/// Query of `GET /download`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadQuery {
    /// Source video URL
    #[serde(default)]
    pub url: Option<String>,
}

/// Successful `GET /download` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    /// Where the merged file can be fetched
    #[serde(rename = "videoUrl")]
    pub video_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Artifacts waiting to be served or expired
    pub pending_artifacts: usize,
}
