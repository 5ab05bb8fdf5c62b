//! Format-selection policy and interpretation of resolved format descriptors.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Separator between the video and audio ids of a composite format.
pub const COMPOSITE_SEPARATOR: char = '+';

/// Static preference chain handed to the extractor.
///
/// 1. best mp4 video at or under the height cap plus best m4a audio
/// 2. best pre-muxed mp4 under the height cap that carries audio
/// 3. a fixed low-resolution fallback id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPolicy {
    pub max_height: u32,
    pub fallback: String,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self {
            max_height: 1080,
            fallback: "18".to_string(),
        }
    }
}

impl FormatPolicy {
    pub fn new(max_height: u32, fallback: impl Into<String>) -> Self {
        Self {
            max_height,
            fallback: fallback.into(),
        }
    }

    /// The selector expression passed as `-f` to the extractor.
    pub fn selector(&self) -> String {
        let h = self.max_height;
        format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][acodec!=none][ext=mp4]/{}",
            self.fallback
        )
    }
}

/// Outcome of metadata resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
}

impl FormatDescriptor {
    pub fn new(format_id: impl Into<String>) -> Self {
        Self {
            format_id: Some(format_id.into()),
            ..Default::default()
        }
    }

    /// Interpret the descriptor's identifier.
    ///
    /// Missing or blank ids and malformed composites are `NotFound`, since
    /// neither names anything that could be fetched.
    pub fn selection(&self) -> Result<FormatSelection> {
        let id = self
            .format_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::not_found("No video format found"))?;

        FormatSelection::parse(id)
    }
}

/// Which stream(s) must be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelection {
    /// One pre-muxed stream.
    Single(String),
    /// Separate video and audio streams that must be merged.
    Composite { video: String, audio: String },
}

impl FormatSelection {
    pub fn parse(id: &str) -> Result<Self> {
        if !id.contains(COMPOSITE_SEPARATOR) {
            return Ok(Self::Single(id.to_string()));
        }

        let mut parts = id.split(COMPOSITE_SEPARATOR).map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(video), Some(audio), None) if !video.is_empty() && !audio.is_empty() => {
                Ok(Self::Composite {
                    video: video.to_string(),
                    audio: audio.to_string(),
                })
            }
            _ => Err(Error::not_found(format!(
                "Unsupported format combination: {id}"
            ))),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite { .. })
    }
}
