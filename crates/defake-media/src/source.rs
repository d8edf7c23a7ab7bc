//! Caller-supplied media, decoded for one pipeline run.

use crate::error::MediaResult;
use crate::still;
use crate::video::FfmpegVideo;
use defake_core::{Analysis, Pipeline, PipelineError};
use image::RgbImage;
use std::path::Path;

/// A video being decoded or a single still frame.
pub enum MediaSource {
    Video(FfmpegVideo),
    Still(RgbImage),
}

impl MediaSource {
    pub fn open_video(path: &Path) -> MediaResult<Self> {
        FfmpegVideo::open(path).map(MediaSource::Video)
    }

    pub fn video_from_bytes(bytes: &[u8]) -> MediaResult<Self> {
        FfmpegVideo::from_bytes(bytes).map(MediaSource::Video)
    }

    pub fn open_still(path: &Path) -> MediaResult<Self> {
        still::load_image(path).map(MediaSource::Still)
    }

    pub fn still_from_bytes(bytes: &[u8]) -> MediaResult<Self> {
        still::decode_image(bytes).map(MediaSource::Still)
    }

    /// Run the pipeline. `frame_count` only applies to videos; a still is
    /// always a single face.
    pub fn analyze(self, pipeline: &Pipeline, frame_count: usize) -> Result<Analysis, PipelineError> {
        match self {
            MediaSource::Video(mut video) => pipeline.analyze_video(&mut video, frame_count),
            MediaSource::Still(frame) => pipeline.analyze_frame(&frame),
        }
    }
}
