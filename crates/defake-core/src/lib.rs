//! defake-core — Deepfake likelihood scoring.
//!
//! Samples faces from a video or still frame (SCRFD detection with a
//! center-crop fallback), classifies them with an ONNX model, and fuses the
//! result with a Laplacian sharpness heuristic into a verdict.

pub mod classifier;
pub mod detector;
pub mod fusion;
pub mod learn;
pub mod locator;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod sharpness;
pub mod types;

use std::path::PathBuf;

pub use classifier::{Classifier, ClassifierError, OnnxClassifier, FAKE_CLASS_INDEX};
pub use detector::{DetectorError, FaceDetector, NullDetector, ScrfdDetector};
pub use locator::FaceLocator;
pub use pipeline::{LoadError, Pipeline, PipelineError, DEFAULT_VIDEO_FRAME_COUNT};
pub use report::Report;
pub use sampler::{FrameSampler, FrameSequence, FrameSource, FrameSourceError};
pub use types::{Analysis, FaceBox, FaceCrop, FrameBatch, NormalizedFace, Verdict};

/// SCRFD detection model file name.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// Xception real/fake classifier model file name.
pub const CLASSIFIER_MODEL_FILE: &str = "xception_deepfake.onnx";

/// Default model directory: `$XDG_DATA_HOME/defake/models`, else
/// `~/.local/share/defake/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("defake/models")
}
