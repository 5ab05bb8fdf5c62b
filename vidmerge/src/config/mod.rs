//! Service configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Runtime configuration for the whole service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Directory holding intermediate and merged artifacts
    pub temp_dir: PathBuf,
    /// Base URL advertised in retrieval links (no trailing slash)
    pub public_base_url: String,
    /// How long an unserved artifact is kept before the sweeper removes it
    pub artifact_retention: Duration,
    /// How often the sweeper checks for expired artifacts
    pub sweep_interval: Duration,
    /// Interval of the liveness log line
    pub heartbeat_interval: Duration,
    /// Path to the yt-dlp binary
    pub ytdlp_path: String,
    /// Path to the ffmpeg binary
    pub ffmpeg_path: String,
    /// Height cap used by the format-selection policy
    pub max_video_height: u32,
    /// Format id used when nothing under the height cap is available
    pub fallback_format: String,
    /// Upper bound for any single subprocess
    pub process_timeout: Duration,
    /// Directory for rolling log files; console only when unset
    pub log_dir: Option<PathBuf>,
}

pub const DEFAULT_PORT: u16 = 3000;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            enable_cors: true,
            temp_dir: PathBuf::from("temp"),
            public_base_url: format!("http://localhost:{DEFAULT_PORT}"),
            artifact_retention: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            max_video_height: 1080,
            fallback_format: "18".to_string(),
            process_timeout: Duration::from_secs(30 * 60),
            log_dir: None,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| Error::config(format!("invalid value for {key} ({value:?}): {e}")))
}

impl AppConfig {
    /// Load config from the process environment, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `API_BIND_ADDRESS`, `API_PORT`, `API_ENABLE_CORS`
    /// - `TEMP_DIR`, `PUBLIC_BASE_URL`
    /// - `ARTIFACT_RETENTION_SECS`, `SWEEP_INTERVAL_SECS`, `HEARTBEAT_INTERVAL_SECS`
    /// - `YTDLP_PATH`, `FFMPEG_PATH`, `MAX_VIDEO_HEIGHT`, `FALLBACK_FORMAT`
    /// - `PROCESS_TIMEOUT_SECS`, `LOG_DIR`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through an arbitrary variable lookup.
    ///
    /// Empty values count as unset. Unparsable numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(bind_address) = get("API_BIND_ADDRESS") {
            config.bind_address = bind_address;
        }
        if let Some(port) = get("API_PORT") {
            config.port = parse_var("API_PORT", &port)?;
        }
        if let Some(cors) = get("API_ENABLE_CORS") {
            config.enable_cors = parse_var("API_ENABLE_CORS", &cors)?;
        }
        if let Some(dir) = get("TEMP_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }

        config.public_base_url = match get("PUBLIC_BASE_URL") {
            Some(url) => {
                let parsed = url::Url::parse(url.trim())
                    .map_err(|e| Error::config(format!("invalid PUBLIC_BASE_URL: {e}")))?;
                parsed.as_str().trim_end_matches('/').to_string()
            }
            None => format!("http://localhost:{}", config.port),
        };

        if let Some(secs) = get("ARTIFACT_RETENTION_SECS") {
            config.artifact_retention =
                Duration::from_secs(parse_var("ARTIFACT_RETENTION_SECS", &secs)?);
        }
        if let Some(secs) = get("SWEEP_INTERVAL_SECS") {
            let secs: u64 = parse_var("SWEEP_INTERVAL_SECS", &secs)?;
            if secs == 0 {
                return Err(Error::config("SWEEP_INTERVAL_SECS must be greater than 0"));
            }
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = get("HEARTBEAT_INTERVAL_SECS") {
            let secs: u64 = parse_var("HEARTBEAT_INTERVAL_SECS", &secs)?;
            if secs == 0 {
                return Err(Error::config("HEARTBEAT_INTERVAL_SECS must be greater than 0"));
            }
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(path) = get("YTDLP_PATH") {
            config.ytdlp_path = path;
        }
        if let Some(path) = get("FFMPEG_PATH") {
            config.ffmpeg_path = path;
        }
        if let Some(height) = get("MAX_VIDEO_HEIGHT") {
            config.max_video_height = parse_var("MAX_VIDEO_HEIGHT", &height)?;
        }
        if let Some(format) = get("FALLBACK_FORMAT") {
            config.fallback_format = format.trim().to_string();
        }
        if let Some(secs) = get("PROCESS_TIMEOUT_SECS") {
            config.process_timeout =
                Duration::from_secs(parse_var("PROCESS_TIMEOUT_SECS", &secs)?);
        }
        if let Some(dir) = get("LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.enable_cors);
        assert_eq!(config.artifact_retention, Duration::from_secs(300));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.public_base_url, "http://localhost:3000");
        assert_eq!(config.max_video_height, 1080);
        assert_eq!(config.fallback_format, "18");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_base_url_follows_port() {
        let config = AppConfig::from_lookup(lookup(&[("API_PORT", "8080")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_base_url, "http://localhost:8080");
    }

    #[test]
    fn test_explicit_base_url_trailing_slash_trimmed() {
        let config = AppConfig::from_lookup(lookup(&[(
            "PUBLIC_BASE_URL",
            "https://media.example.com/",
        )]))
        .unwrap();
        assert_eq!(config.public_base_url, "https://media.example.com");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TEMP_DIR", "/var/tmp/vm"),
            ("ARTIFACT_RETENTION_SECS", "60"),
            ("MAX_VIDEO_HEIGHT", "720"),
            ("FALLBACK_FORMAT", " 22 "),
            ("LOG_DIR", "logs"),
        ]))
        .unwrap();
        assert_eq!(config.temp_dir, PathBuf::from("/var/tmp/vm"));
        assert_eq!(config.artifact_retention, Duration::from_secs(60));
        assert_eq!(config.max_video_height, 720);
        assert_eq!(config.fallback_format, "22");
        assert_eq!(config.log_dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config = AppConfig::from_lookup(lookup(&[("API_PORT", "  ")])).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("API_PORT", "http")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("API_PORT"));

        let err = AppConfig::from_lookup(lookup(&[("SWEEP_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
