use crate::config::Config;
use defake_core::{LoadError, Pipeline, PipelineError, Report};
use defake_media::{MediaError, MediaSource};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("media error: {0}")]
    Media(#[from] MediaError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("model load error: {0}")]
    Load(#[from] LoadError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

impl EngineError {
    /// Whether the request itself was unusable (missing or undecodable media).
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, EngineError::Media(e) if e.is_invalid_input())
    }
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    AnalyzeVideo {
        path: PathBuf,
        frame_count: usize,
        reply: oneshot::Sender<Result<Report, EngineError>>,
    },
    AnalyzeFrame {
        path: PathBuf,
        reply: oneshot::Sender<Result<Report, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Sample `frame_count` faces from the video at `path` and score them.
    pub async fn analyze_video(
        &self,
        path: PathBuf,
        frame_count: usize,
    ) -> Result<Report, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::AnalyzeVideo {
                path,
                frame_count,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Score the single image at `path`.
    pub async fn analyze_frame(&self, path: PathBuf) -> Result<Report, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::AnalyzeFrame {
                path,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Load the models named by `config` and spawn the engine.
///
/// Fails fast at startup if a model is missing or unloadable.
pub fn spawn_engine(config: &Config) -> Result<EngineHandle, EngineError> {
    let detector_path = config.detector_model_path();
    let classifier_path = config.classifier_model_path();

    let pipeline = Pipeline::load(detector_path.as_deref(), &classifier_path)?;
    match &detector_path {
        Some(path) => tracing::info!(path = %path, "SCRFD detector loaded"),
        None => tracing::info!("face detection disabled via DEFAKE_DETECTION_ENABLED=0"),
    }
    tracing::info!(path = %classifier_path, "classifier loaded");

    spawn_with_pipeline(pipeline)
}

/// Run `pipeline` on a dedicated OS thread, one request at a time.
pub fn spawn_with_pipeline(pipeline: Pipeline) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("defake-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                let request_id = uuid::Uuid::new_v4();
                match req {
                    EngineRequest::AnalyzeVideo {
                        path,
                        frame_count,
                        reply,
                    } => {
                        let span = tracing::info_span!(
                            "analyze_video",
                            %request_id,
                            path = %path.display(),
                            frame_count
                        );
                        let result = span.in_scope(|| run_video(&pipeline, &path, frame_count));
                        let _ = reply.send(result);
                    }
                    EngineRequest::AnalyzeFrame { path, reply } => {
                        let span = tracing::info_span!(
                            "analyze_frame",
                            %request_id,
                            path = %path.display()
                        );
                        let result = span.in_scope(|| run_frame(&pipeline, &path));
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}

fn run_video(pipeline: &Pipeline, path: &Path, frame_count: usize) -> Result<Report, EngineError> {
    let analysis = MediaSource::open_video(path)?.analyze(pipeline, frame_count)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let report = Report::new(analysis, filename);
    if report.is_no_faces() {
        tracing::info!("no faces sampled");
    }
    Ok(report)
}

fn run_frame(pipeline: &Pipeline, path: &Path) -> Result<Report, EngineError> {
    let analysis = MediaSource::open_still(path)?.analyze(pipeline, 1)?;
    Ok(Report::new(analysis, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use defake_core::classifier::ClassProbabilities;
    use defake_core::{Classifier, ClassifierError, FrameBatch, NullDetector};
    use image::{Rgb, RgbImage};
    use std::sync::Arc;

    struct Confident(f32);

    impl Classifier for Confident {
        fn infer(&self, batch: &FrameBatch) -> Result<Vec<ClassProbabilities>, ClassifierError> {
            Ok(vec![[1.0 - self.0, self.0]; batch.len()])
        }
    }

    fn engine(fake: f32) -> EngineHandle {
        let pipeline = Pipeline::new(Arc::new(NullDetector), Arc::new(Confident(fake)));
        spawn_with_pipeline(pipeline).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_frame_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbImage::from_pixel(80, 60, Rgb([90, 90, 90]))
            .save(&path)
            .unwrap();

        let report = engine(0.9).analyze_frame(path).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();

        // Flat frame: 0.9 * 0.4 + 0.4 * 0.6 = 0.6.
        assert_eq!(json["is_deepfake"], true);
        assert!((json["confidence"].as_f64().unwrap() - 60.0).abs() < 1e-9);
        assert!(json.get("filename").is_none());
        assert!(json["anomalies"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a == "Significant blur detected"));
    }

    #[tokio::test]
    async fn test_missing_frame_is_invalid_input() {
        let err = engine(0.1)
            .analyze_frame(PathBuf::from("/nonexistent/still.png"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_missing_video_is_invalid_input() {
        let err = engine(0.1)
            .analyze_video(PathBuf::from("/nonexistent/clip.mp4"), 2)
            .await
            .unwrap_err();
        assert!(err.is_invalid_input(), "{err}");
    }

    #[tokio::test]
    async fn test_handle_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbImage::from_pixel(40, 40, Rgb([200, 200, 200]))
            .save(&path)
            .unwrap();

        let handle = engine(0.1);
        let other = handle.clone();
        let (a, b) = tokio::join!(handle.analyze_frame(path.clone()), other.analyze_frame(path));
        assert!(!a.unwrap().is_no_faces());
        assert!(!b.unwrap().is_no_faces());
    }
}
