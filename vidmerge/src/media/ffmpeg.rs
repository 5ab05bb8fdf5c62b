//! ffmpeg backed [`StreamMerger`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use process_utils::tokio_command;
use tracing::{debug, warn};

use super::traits::StreamMerger;
use crate::utils::fs;
use crate::{Error, Result};

/// ffmpeg diagnostics that mean the streams cannot be copied into the target container.
const INCOMPATIBLE_MARKERS: &[&str] = &[
    "could not find tag for codec",
    "not currently supported in container",
    "incompatible with output codec",
];

pub struct FfmpegMerger {
    /// Path to ffmpeg binary.
    binary: String,
    timeout: Duration,
}

impl FfmpegMerger {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Build FFmpeg arguments for a stream-copy merge.
    fn build_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-i".to_string(),
            audio.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ];

        // `-movflags +faststart` only applies to MP4-family containers.
        let ext = output
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if matches!(ext.as_deref(), Some("mp4" | "mov" | "m4v")) {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }

        args.push(output.to_string_lossy().to_string());
        args
    }

    fn is_incompatible(stderr: &str) -> bool {
        let stderr = stderr.to_ascii_lowercase();
        INCOMPATIBLE_MARKERS.iter().any(|m| stderr.contains(m))
    }
}

#[async_trait]
impl StreamMerger for FfmpegMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let args = Self::build_args(video, audio, output);
        debug!("FFmpeg args: {:?}", args);

        let mut cmd = tokio_command(&self.binary);
        cmd.args(&args).env("LC_ALL", "C");

        let command_output = match process_utils::run_captured(&mut cmd, self.timeout).await {
            Ok(output) => output,
            Err(e) => {
                fs::remove_file_best_effort(output).await;
                return Err(Error::Merge(e.to_string()));
            }
        };

        if command_output.status.success() {
            return Ok(());
        }

        fs::remove_file_best_effort(output).await;

        let stderr = command_output.stderr_lossy();
        let reason = command_output
            .last_stderr_line()
            .unwrap_or_else(|| "Unknown ffmpeg error".to_string());
        warn!(
            code = command_output.status.code().unwrap_or(-1),
            %reason,
            "ffmpeg merge failed"
        );

        if Self::is_incompatible(&stderr) {
            return Err(Error::IncompatibleStreams(reason));
        }

        Err(Error::Merge(format!(
            "ffmpeg exited with code {}: {}",
            command_output.status.code().unwrap_or(-1),
            reason
        )))
    }

    fn name(&self) -> &'static str {
        "FfmpegMerger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_build_args_stream_copy() {
        let args = FfmpegMerger::build_args(
            Path::new("/t/video.mp4"),
            Path::new("/t/audio.m4a"),
            Path::new("/t/out.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.starts_with("-y "));
        assert!(joined.contains("-i /t/video.mp4 -i /t/audio.m4a"));
        assert!(joined.contains("-c copy"));
        assert!(joined.contains("-movflags +faststart"));
        assert_eq!(args.last().unwrap(), "/t/out.mp4");
    }

    #[test]
    fn test_no_faststart_for_mkv() {
        let args = FfmpegMerger::build_args(
            Path::new("v.webm"),
            Path::new("a.webm"),
            Path::new("out.mkv"),
        );
        assert!(!args.contains(&"-movflags".to_string()));
    }

    #[test]
    fn test_incompatible_detection() {
        assert!(FfmpegMerger::is_incompatible(
            "[mp4 @ 0x1] Could not find tag for codec opus in stream #1, codec not currently supported in container"
        ));
        assert!(!FfmpegMerger::is_incompatible(
            "/t/video.mp4: No such file or directory"
        ));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        /// Install a shell script standing in for ffmpeg. `$out` is the last argument.
        fn fake_ffmpeg(dir: &TempDir, body: &str) -> FfmpegMerger {
            let path = dir.path().join("ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\neval out=\\${{$#}}\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            FfmpegMerger::new(path.to_string_lossy(), Duration::from_secs(10))
        }

        async fn merge_into(merger: &FfmpegMerger, dir: &TempDir) -> (Result<()>, PathBuf) {
            let output = dir.path().join("out.mp4");
            let result = merger
                .merge(
                    &dir.path().join("video.mp4"),
                    &dir.path().join("audio.m4a"),
                    &output,
                )
                .await;
            (result, output)
        }

        #[tokio::test]
        async fn test_successful_merge() {
            let dir = TempDir::new().unwrap();
            let merger = fake_ffmpeg(&dir, "printf merged > \"$out\"");

            let (result, output) = merge_into(&merger, &dir).await;

            result.unwrap();
            assert_eq!(std::fs::read_to_string(output).unwrap(), "merged");
        }

        #[tokio::test]
        async fn test_codec_mismatch_is_incompatible_streams() {
            let dir = TempDir::new().unwrap();
            let merger = fake_ffmpeg(
                &dir,
                "printf partial > \"$out\"\n\
                 echo '[mp4 @ 0x1] Could not find tag for codec opus in stream #1, codec not currently supported in container' >&2\n\
                 exit 1",
            );

            let (result, output) = merge_into(&merger, &dir).await;

            assert!(matches!(result, Err(Error::IncompatibleStreams(_))));
            assert!(!output.exists());
        }

        #[tokio::test]
        async fn test_other_failure_is_merge_error_with_last_line() {
            let dir = TempDir::new().unwrap();
            let merger = fake_ffmpeg(
                &dir,
                "printf partial > \"$out\"\n\
                 echo 'first line' >&2\n\
                 echo 'video.mp4: Invalid data found when processing input' >&2\n\
                 exit 1",
            );

            let (result, output) = merge_into(&merger, &dir).await;

            match result {
                Err(Error::Merge(msg)) => {
                    assert!(msg.contains("code 1"), "{msg}");
                    assert!(msg.ends_with("Invalid data found when processing input"), "{msg}");
                }
                other => panic!("expected merge error, got {other:?}"),
            }
            assert!(!output.exists());
        }

        #[tokio::test]
        async fn test_hung_ffmpeg_is_killed() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("ffmpeg");
            std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            let merger = FfmpegMerger::new(path.to_string_lossy(), Duration::from_millis(200));

            let (result, _) = merge_into(&merger, &dir).await;

            assert!(matches!(result, Err(Error::Merge(msg)) if msg.contains("timed out")));
        }
    }

    #[test]
    fn test_merger_name() {
        let merger = FfmpegMerger::new("ffmpeg", Duration::from_secs(1));
        assert_eq!(merger.name(), "FfmpegMerger");
    }
}
