//! `GET /download`: resolve, fetch and merge a video.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use tracing::{error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{DownloadQuery, DownloadResponse};
use crate::api::server::AppState;
use crate::downloader::validate_source_url;

/// Create the download router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(download))
}

/// Produce a merged artifact and answer with its retrieval URL.
///
/// The work runs on its own task so that a client disconnect neither kills
/// running subprocesses nor skips intermediate cleanup.
async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Json<DownloadResponse>> {
    let url = validate_source_url(query.url.as_deref())?;
    info!(%url, "Download requested");

    let orchestrator = state.orchestrator.clone();
    let artifact = tokio::spawn(async move { orchestrator.resolve(&url).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Download task aborted");
            ApiError::internal(format!("Failed to process video: {e}"))
        })??;

    Ok(Json(DownloadResponse {
        video_url: artifact.retrieval_url,
    }))
}
