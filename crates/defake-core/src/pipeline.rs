//! End-to-end scoring: sample faces, classify, run forensics, fuse.

use crate::classifier::{Classifier, ClassifierError, OnnxClassifier};
use crate::detector::{DetectorError, FaceDetector, NullDetector, ScrfdDetector};
use crate::fusion;
use crate::locator::FaceLocator;
use crate::sampler::{normalize_crop, FrameSampler, FrameSource};
use crate::sharpness;
use crate::types::{Analysis, FrameBatch};
use image::RgbImage;
use std::sync::Arc;
use thiserror::Error;

/// Faces sampled per video unless the caller asks otherwise.
pub const DEFAULT_VIDEO_FRAME_COUNT: usize = 2;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Deepfake scoring pipeline.
///
/// Holds only shared, read-only collaborators; every call allocates its own
/// frames and tensors, so one instance can serve concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    sampler: FrameSampler,
    classifier: Arc<dyn Classifier>,
}

impl Pipeline {
    pub fn new(detector: Arc<dyn FaceDetector>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            sampler: FrameSampler::new(FaceLocator::new(detector)),
            classifier,
        }
    }

    /// Load the ONNX models. Without a detector model every frame uses the
    /// centered fallback crop.
    pub fn load(detector_model: Option<&str>, classifier_model: &str) -> Result<Self, LoadError> {
        let detector: Arc<dyn FaceDetector> = match detector_model {
            Some(path) => Arc::new(ScrfdDetector::load(path)?),
            None => {
                tracing::info!("face detection disabled; using center crops");
                Arc::new(NullDetector)
            }
        };
        let classifier = Arc::new(OnnxClassifier::load(classifier_model)?);
        Ok(Self::new(detector, classifier))
    }

    /// Score up to `frame_count` evenly spaced faces from a video.
    pub fn analyze_video(
        &self,
        source: &mut dyn FrameSource,
        frame_count: usize,
    ) -> Result<Analysis, PipelineError> {
        match self.sampler.sample(source, frame_count) {
            Some(batch) => self.score(&batch),
            None => Ok(Analysis::NoFaces),
        }
    }

    /// Score a single still frame.
    pub fn analyze_frame(&self, frame: &RgbImage) -> Result<Analysis, PipelineError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Analysis::NoFaces);
        }
        let crop = self.sampler.locator().crop(frame);
        match FrameBatch::from_faces(&[normalize_crop(&crop)]) {
            Some(batch) => self.score(&batch),
            None => Ok(Analysis::NoFaces),
        }
    }

    fn score(&self, batch: &FrameBatch) -> Result<Analysis, PipelineError> {
        tracing::debug!(faces = batch.len(), "running classifier");
        let probabilities = self.classifier.infer(batch)?;
        let forensic = sharpness::analyze(batch.first());
        let analysis = fusion::fuse(&probabilities, &forensic);

        if let Analysis::Verdict(v) = &analysis {
            tracing::info!(
                faces = batch.len(),
                is_deepfake = v.is_deepfake,
                confidence = v.confidence,
                blur_score = v.sharpness_metric,
                "analysis complete"
            );
        }
        Ok(analysis)
    }
}
