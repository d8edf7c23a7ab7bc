//! Real/fake face classifier via ONNX Runtime.
//!
//! The pipeline only sees the `Classifier` trait: a batch of normalized faces
//! in, one row of class probabilities per face out. `OnnxClassifier` runs an
//! XceptionNet-style export that emits raw logits.

use crate::types::{FrameBatch, FACE_INPUT_SIZE};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Number of output classes.
pub const NUM_CLASSES: usize = 2;

/// Output column holding the "real" probability.
pub const REAL_CLASS_INDEX: usize = 0;

/// Output column holding the "fake" probability.
///
/// Inherited from the training label order, not derived from the model.
/// Weights trained with the opposite order need this flipped.
pub const FAKE_CLASS_INDEX: usize = 1;

/// Per-face class probabilities, indexed by `REAL_CLASS_INDEX` / `FAKE_CLASS_INDEX`.
pub type ClassProbabilities = [f32; NUM_CLASSES];

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Opaque binary classifier.
///
/// Implementations must be safe to call from several requests at once,
/// serializing internally when the runtime is not.
pub trait Classifier: Send + Sync {
    /// One row per face in `batch`, each summing to 1.
    fn infer(&self, batch: &FrameBatch) -> Result<Vec<ClassProbabilities>, ClassifierError>;
}

/// XceptionNet classifier backed by an ONNX session.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn load(model_path: &str) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            input_size = FACE_INPUT_SIZE,
            "loaded classifier model"
        );

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&self, batch: &FrameBatch) -> Result<Vec<ClassProbabilities>, ClassifierError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::InferenceFailed("classifier session poisoned".into()))?;

        let outputs =
            session.run(ort::inputs![TensorRef::from_array_view(batch.tensor().view())?])?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("logit extraction: {e}")))?;

        logits_to_probabilities(logits, batch.len())
    }
}

/// Split a flat `[N, 2]` logit buffer into per-face softmax rows.
pub(crate) fn logits_to_probabilities(
    logits: &[f32],
    rows: usize,
) -> Result<Vec<ClassProbabilities>, ClassifierError> {
    if logits.len() != rows * NUM_CLASSES {
        return Err(ClassifierError::InferenceFailed(format!(
            "expected {rows}x{NUM_CLASSES} logits, got {} values",
            logits.len()
        )));
    }
    Ok(logits
        .chunks_exact(NUM_CLASSES)
        .map(|row| softmax([row[0], row[1]]))
        .collect())
}

fn softmax(logits: ClassProbabilities) -> ClassProbabilities {
    let max = logits[0].max(logits[1]);
    let e0 = (logits[0] - max).exp();
    let e1 = (logits[1] - max).exp();
    let sum = e0 + e1;
    [e0 / sum, e1 / sum]
}
