//! Application-wide error types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A required request parameter is missing or malformed.
    #[error("{0}")]
    Input(String),

    /// Metadata resolution produced no usable format.
    #[error("{0}")]
    NotFound(String),

    /// A fetch step did not produce the expected file(s).
    #[error("Download failed: {0}")]
    Download(String),

    /// The merge subprocess failed.
    #[error("Merge failed: {0}")]
    Merge(String),

    /// The fetched streams cannot share the target container without re-encoding.
    #[error("Streams cannot be merged without re-encoding: {0}")]
    IncompatibleStreams(String),

    /// An external tool could not be run or exited unsuccessfully.
    #[error("{tool} failed: {message}")]
    Process { tool: &'static str, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error while {op} {}: {source}", .path.display())]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn process(tool: &'static str, msg: impl Into<String>) -> Self {
        Self::Process {
            tool,
            message: msg.into(),
        }
    }

    /// IO error annotated with the operation and the path it touched.
    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_path_display_includes_context() {
        let err = Error::io_path(
            "creating directory",
            Path::new("/tmp/x"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("creating directory"));
        assert!(msg.contains("/tmp/x"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_process_display() {
        let err = Error::process("yt-dlp", "exit code 1");
        assert_eq!(err.to_string(), "yt-dlp failed: exit code 1");
    }
}
