//! vidmerge library crate.
//!
//! Fetches the best video and audio streams of a URL with yt-dlp, merges them
//! with ffmpeg and serves the result once.

pub mod api;
pub mod config;
pub mod downloader;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod media;
pub mod panic_hook;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
