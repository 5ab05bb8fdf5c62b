//! Temporary artifact directory.
//!
//! Every request gets its own set of paths derived from a random token, so
//! concurrent composite downloads never write to the same intermediate file.
//! Names handed back by clients are validated before they touch the
//! filesystem and must resolve to a direct child of the root.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::utils::fs;
use crate::{Error, Result};

const VIDEO_PREFIX: &str = "video_";
const AUDIO_PREFIX: &str = "audio_";
const MERGED_PREFIX: &str = "video_merged_";
/// Suffix yt-dlp appends to a file while it is still being written.
const PART_SUFFIX: &str = ".part";

/// `<path>.part`, where an interrupted fetch leaves its data.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Role an artifact plays in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    Video,
    Audio,
    Merged,
}

impl ArtifactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Merged => "merged",
        }
    }
}

/// Paths reserved for a single request.
#[derive(Debug, Clone)]
pub struct RequestArtifacts {
    token: String,
    video: PathBuf,
    audio: PathBuf,
    merged: PathBuf,
}

impl RequestArtifacts {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn path(&self, role: ArtifactRole) -> &Path {
        match role {
            ArtifactRole::Video => &self.video,
            ArtifactRole::Audio => &self.audio,
            ArtifactRole::Merged => &self.merged,
        }
    }

    /// Basename of the final artifact; its identity for the serving endpoint.
    pub fn merged_name(&self) -> String {
        self.merged
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Remove both intermediates and any partial downloads of them.
    /// Missing files are fine.
    pub async fn remove_intermediates(&self) {
        for role in [ArtifactRole::Video, ArtifactRole::Audio] {
            self.remove_role(role).await;
        }
    }

    /// Remove the final artifact and its partial download after a failure.
    pub async fn remove_merged(&self) {
        self.remove_role(ArtifactRole::Merged).await;
    }

    async fn remove_role(&self, role: ArtifactRole) {
        let path = self.path(role);
        if !fs::remove_file_best_effort(path).await {
            debug!(role = role.as_str(), path = %path.display(), "Artifact not removed");
        }
        fs::remove_file_best_effort(&partial_path(path)).await;
    }
}

/// Validate a client-supplied artifact name.
///
/// Accepts a single normal path component only: no separators, no `.`/`..`,
/// no NUL and no `..` anywhere in the segment.
pub fn validate_artifact_name(name: &str) -> Result<&str> {
    let invalid = || Error::input(format!("Invalid file name: {name:?}"));

    if name.is_empty()
        || name.contains(['/', '\\', '\0'])
        || name.contains("..")
        || name.trim() != name
    {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}

fn is_token(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn is_millis(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// The temporary directory that holds all in-flight and finished artifacts.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed and drop leftovers of a previous run.
    ///
    /// Idempotent; called once at startup.
    pub async fn init(&self) -> Result<()> {
        fs::ensure_dir_all_with_op("creating temp directory", &self.root).await?;
        let removed = self.purge_stale().await?;
        if removed > 0 {
            info!(count = removed, dir = %self.root.display(), "Removed stale artifacts");
        }
        Ok(())
    }

    /// Reserve unique paths for one request.
    pub fn allocate(&self) -> RequestArtifacts {
        let token = Uuid::new_v4().simple().to_string();
        let stamp = Utc::now().timestamp_millis();

        RequestArtifacts {
            video: self.root.join(format!("{VIDEO_PREFIX}{token}.mp4")),
            audio: self.root.join(format!("{AUDIO_PREFIX}{token}.m4a")),
            merged: self.root.join(format!("{MERGED_PREFIX}{stamp}_{token}.mp4")),
            token,
        }
    }

    /// Resolve a served artifact name to a path inside the root.
    pub async fn resolve_served(&self, name: &str) -> Result<PathBuf> {
        let name = validate_artifact_name(name)?;
        let candidate = self.root.join(name);

        if candidate.parent() != Some(self.root.as_path()) {
            return Err(Error::input(format!("Invalid file name: {name:?}")));
        }

        // A symlink planted in the directory must not lead outside of it.
        if let (Ok(real), Ok(real_root)) = (
            tokio::fs::canonicalize(&candidate).await,
            tokio::fs::canonicalize(&self.root).await,
        ) && real.parent() != Some(real_root.as_path())
        {
            warn!(name, resolved = %real.display(), "Artifact resolves outside temp directory");
            return Err(Error::input(format!("Invalid file name: {name:?}")));
        }

        Ok(candidate)
    }

    /// Whether `name` has the exact shape [`allocate`](Self::allocate) produces,
    /// optionally with a `.part` suffix.
    fn is_artifact_name(name: &str) -> bool {
        let name = name.strip_suffix(PART_SUFFIX).unwrap_or(name);

        if let Some(rest) = name
            .strip_prefix(MERGED_PREFIX)
            .and_then(|r| r.strip_suffix(".mp4"))
        {
            return rest
                .split_once('_')
                .is_some_and(|(stamp, token)| is_millis(stamp) && is_token(token));
        }

        name.strip_prefix(VIDEO_PREFIX)
            .and_then(|r| r.strip_suffix(".mp4"))
            .or_else(|| {
                name.strip_prefix(AUDIO_PREFIX)
                    .and_then(|r| r.strip_suffix(".m4a"))
            })
            .is_some_and(is_token)
    }

    /// Remove files matching the artifact naming scheme.
    pub async fn purge_stale(&self) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| fs::io_error("reading temp directory", &self.root, e))?;

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| fs::io_error("reading temp directory", &self.root, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if Self::is_artifact_name(name) && fs::remove_file_best_effort(&entry.path()).await {
                removed += 1;
            }
        }

        Ok(removed)
    }
}
