//! External media tooling: format selection, extraction and merging.

pub mod ffmpeg;
pub mod format;
pub mod traits;
pub mod ytdlp;

pub use ffmpeg::FfmpegMerger;
pub use format::{FormatDescriptor, FormatPolicy, FormatSelection};
pub use traits::{MediaExtractor, StreamMerger};
pub use ytdlp::YtDlp;
