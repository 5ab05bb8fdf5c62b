//! `GET /temp/{filename}`: serve a finished artifact once, then delete it.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::utils::fs;

/// Name the client sees for every download.
pub const DOWNLOAD_FILENAME: &str = "video.mp4";

/// Create the artifact router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{filename}", get(serve_artifact))
}

/// Deletes the served file when the response body is finished or dropped.
struct RemoveOnDrop {
    path: PathBuf,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if fs::remove_file_best_effort_sync(&self.path) {
            info!(path = %self.path.display(), "Served artifact removed");
        }
    }
}

fn content_type_for(path: &FsPath) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4" | "m4v") => "video/mp4",
        Some("m4a") => "audio/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

fn plain(status: StatusCode, message: &str) -> ApiError {
    ApiError::new(status, status.as_str(), message).as_plain_text()
}

async fn serve_artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let store = state.orchestrator.store();
    let path = store.resolve_served(&filename).await.map_err(|e| {
        debug!(%filename, error = %e, "Rejected artifact name");
        plain(StatusCode::BAD_REQUEST, "Invalid file name")
    })?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(plain(StatusCode::NOT_FOUND, "File not found"));
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to open artifact");
            return Err(plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to download the file",
            ));
        }
    };

    let metadata = file.metadata().await.map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to stat artifact");
        plain(StatusCode::INTERNAL_SERVER_ERROR, "Failed to download the file")
    })?;
    if !metadata.is_file() {
        return Err(plain(StatusCode::NOT_FOUND, "File not found"));
    }

    // From here on the serve path owns the file, not the expiry sweep.
    state.orchestrator.registry().cancel(&filename);
    info!(%filename, size = metadata.len(), "Serving artifact");

    let content_type = content_type_for(&path);
    let guard = RemoveOnDrop { path };
    let body = futures::stream::unfold(
        (ReaderStream::new(file), guard),
        |(mut chunks, guard)| async move {
            chunks.next().await.map(|chunk| (chunk, (chunks, guard)))
        },
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
            ),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
