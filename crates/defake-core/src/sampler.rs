//! Evenly spaced frame sampling into a normalized face batch.

use crate::locator::FaceLocator;
use crate::types::{FrameBatch, NormalizedFace, FACE_INPUT_SIZE};
use image::imageops::FilterType;
use image::RgbImage;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("frame decode failed: {0}")]
    Decode(String),
}

/// A decoded, forward-only stream of RGB frames.
pub trait FrameSource {
    /// Total frame count reported or estimated by the container.
    fn total_frames(&self) -> Option<u64>;

    /// Next frame in presentation order; `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError>;
}

/// In-memory frame source.
pub struct FrameSequence {
    frames: VecDeque<RgbImage>,
    total: Option<u64>,
}

impl FrameSequence {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let total = Some(frames.len() as u64);
        Self {
            frames: frames.into(),
            total,
        }
    }

    /// Override the reported total, as a container with a wrong header would.
    pub fn with_reported_total(mut self, total: Option<u64>) -> Self {
        self.total = total;
        self
    }
}

impl FrameSource for FrameSequence {
    fn total_frames(&self) -> Option<u64> {
        self.total
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError> {
        Ok(self.frames.pop_front())
    }
}

/// Resize a face crop to the classifier input size and normalize it.
///
/// Frames are RGB end to end, which is the channel order the classifier
/// was trained on, so no reordering is needed here.
pub fn normalize_crop(crop: &RgbImage) -> NormalizedFace {
    let size = FACE_INPUT_SIZE as u32;
    let resized = image::imageops::resize(crop, size, size, FilterType::Triangle);
    NormalizedFace::from_rgb(&resized)
}

/// Picks frames at a fixed interval and turns each into a normalized face.
#[derive(Clone)]
pub struct FrameSampler {
    locator: FaceLocator,
}

impl FrameSampler {
    pub fn new(locator: FaceLocator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &FaceLocator {
        &self.locator
    }

    /// Sample up to `frame_count` faces.
    ///
    /// Returns `None` when the source reports no frames or no crop could be
    /// produced. A decode error ends the walk early and keeps what was
    /// collected.
    pub fn sample(&self, source: &mut dyn FrameSource, frame_count: usize) -> Option<FrameBatch> {
        let frame_count = frame_count.max(1);
        let total = match source.total_frames() {
            Some(t) if t > 0 => t,
            other => {
                tracing::info!(total = ?other, "video reports no frames");
                return None;
            }
        };
        let interval = (total / frame_count as u64).max(1);

        let mut faces = Vec::with_capacity(frame_count);
        let mut counter: u64 = 0;

        while faces.len() < frame_count {
            let frame = match source.next_frame() {
                Ok(Some(f)) => f,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, frame = counter, "decode failed; stopping early");
                    break;
                }
            };

            if counter % interval == 0 && frame.width() > 0 && frame.height() > 0 {
                let crop = self.locator.crop(&frame);
                faces.push(normalize_crop(&crop));
            }
            counter += 1;
        }

        tracing::debug!(
            total,
            interval,
            walked = counter,
            sampled = faces.len(),
            "frame sampling finished"
        );

        FrameBatch::from_faces(&faces)
    }
}
