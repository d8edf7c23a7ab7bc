//! Media decoding errors.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,
    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("invalid video: {0}")]
    InvalidVideo(String),
    #[error("invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),
    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffprobe output: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Whether the caller supplied something undecodable, as opposed to a
    /// local tooling or I/O failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MediaError::FileNotFound(_) | MediaError::InvalidVideo(_) | MediaError::InvalidImage(_)
        )
    }
}
