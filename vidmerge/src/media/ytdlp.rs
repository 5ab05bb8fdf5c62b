//! yt-dlp backed [`MediaExtractor`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use process_utils::{CapturedOutput, tokio_command};
use tracing::debug;

use super::format::{FormatDescriptor, FormatPolicy};
use super::traits::MediaExtractor;
use crate::{Error, Result};

const TOOL: &str = "yt-dlp";

pub struct YtDlp {
    /// Path to the yt-dlp binary.
    binary: String,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn resolve_args(source_url: &str, policy: &FormatPolicy) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "-f".to_string(),
            policy.selector(),
            "--".to_string(),
            source_url.to_string(),
        ]
    }

    fn fetch_args(source_url: &str, format_id: &str, output: &Path) -> Vec<String> {
        vec![
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "-f".to_string(),
            format_id.to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
            "--".to_string(),
            source_url.to_string(),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<CapturedOutput> {
        debug!(binary = %self.binary, ?args, "Running yt-dlp");

        let mut cmd = tokio_command(&self.binary);
        cmd.args(args);

        let output = process_utils::run_captured(&mut cmd, self.timeout)
            .await
            .map_err(|e| Error::process(TOOL, e.to_string()))?;

        if !output.status.success() {
            let reason = output
                .last_stderr_line()
                .unwrap_or_else(|| "no error output".to_string());
            return Err(Error::process(
                TOOL,
                format!(
                    "exit code {}: {}",
                    output.status.code().unwrap_or(-1),
                    reason
                ),
            ));
        }

        Ok(output)
    }

    /// Parse the `--dump-single-json` document.
    fn parse_descriptor(stdout: &str) -> Result<FormatDescriptor> {
        Ok(serde_json::from_str(stdout.trim())?)
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn resolve(&self, source_url: &str, policy: &FormatPolicy) -> Result<FormatDescriptor> {
        let output = self.run(&Self::resolve_args(source_url, policy)).await?;
        Self::parse_descriptor(&output.stdout_lossy())
    }

    async fn fetch(&self, source_url: &str, format_id: &str, output: &Path) -> Result<()> {
        self.run(&Self::fetch_args(source_url, format_id, output))
            .await
            .map(|_| ())
    }

    fn name(&self) -> &'static str {
        "YtDlp"
    }
}
