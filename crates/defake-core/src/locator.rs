//! Face localization: pick the most prominent face and crop around it.

use crate::detector::FaceDetector;
use crate::types::{FaceBox, FaceCrop};
use image::RgbImage;
use std::sync::Arc;

/// Margin added on every side of the chosen box, as a fraction of its width.
pub const FACE_MARGIN_RATIO: f32 = 0.2;

/// Locates the dominant face in a frame.
///
/// `locate` is total: a detector failure or an empty detection falls back to
/// the centered square crop, so every non-empty frame yields a crop.
#[derive(Clone)]
pub struct FaceLocator {
    detector: Arc<dyn FaceDetector>,
}

impl FaceLocator {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    pub fn locate(&self, frame: &RgbImage) -> FaceCrop {
        let (width, height) = frame.dimensions();
        let gray = image::imageops::grayscale(frame);

        let candidates = match self.detector.detect(&gray) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "face detection failed; using center crop");
                Vec::new()
            }
        };

        match select_largest(&candidates, width, height) {
            Some(face) => expand_with_margin(face, width, height),
            None => {
                tracing::debug!(width, height, "no face found; using center crop");
                center_square_crop(width, height)
            }
        }
    }

    /// Locate and copy out the face region.
    pub fn crop(&self, frame: &RgbImage) -> RgbImage {
        self.locate(frame).extract(frame)
    }
}

/// Pixel-snapped box clamped to the frame, as `(x0, y0, x1, y1)`.
///
/// Returns `None` when nothing of the box remains inside the frame.
pub(crate) fn snap_to_frame(face: &FaceBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let clamp = |v: f32, max: u32| v.clamp(0.0, max as f32) as u32;
    let x0 = clamp(face.x.floor(), width);
    let y0 = clamp(face.y.floor(), height);
    let x1 = clamp((face.x + face.width).ceil(), width);
    let y1 = clamp((face.y + face.height).ceil(), height);
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}

/// Largest usable candidate by area. Strict comparison keeps the first of
/// equally sized boxes.
fn select_largest(candidates: &[FaceBox], width: u32, height: u32) -> Option<&FaceBox> {
    let mut best: Option<&FaceBox> = None;
    for face in candidates {
        if snap_to_frame(face, width, height).is_none() {
            continue;
        }
        if best.map_or(true, |b| face.area() > b.area()) {
            best = Some(face);
        }
    }
    best
}

/// Grow the detector box by the margin on every side, then clamp.
///
/// The margin and edges come from the unclamped box, so a face crossing the
/// frame edge keeps its full margin on the visible sides.
fn expand_with_margin(face: &FaceBox, width: u32, height: u32) -> FaceCrop {
    if snap_to_frame(face, width, height).is_none() {
        return center_square_crop(width, height);
    }
    let margin = (face.width * FACE_MARGIN_RATIO).floor();

    let clamp = |v: f32, max: u32| v.clamp(0.0, max as f32) as u32;
    let left = clamp((face.x - margin).floor(), width);
    let top = clamp((face.y - margin).floor(), height);
    let right = clamp((face.x + face.width + margin).ceil(), width);
    let bottom = clamp((face.y + face.height + margin).ceil(), height);

    FaceCrop {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    }
}

/// Square of side `min(width, height)` centered in the frame.
pub fn center_square_crop(width: u32, height: u32) -> FaceCrop {
    let side = width.min(height);
    FaceCrop {
        x: (width - side) / 2,
        y: (height - side) / 2,
        width: side,
        height: side,
    }
}
