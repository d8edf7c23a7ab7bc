use crate::config::Config;
use crate::engine::{EngineError, EngineHandle};
use std::path::PathBuf;
use zbus::interface;

/// D-Bus interface for the defake scanning daemon.
///
/// Bus name: org.defake.Scanner1
/// Object path: /org/defake/Scanner1
///
/// Every method returns a JSON document as a string.
pub struct ScannerService {
    pub engine: EngineHandle,
    pub config: Config,
}

#[interface(name = "org.defake.Scanner1")]
impl ScannerService {
    /// Analyze the video at `path` by sampling faces across its length.
    async fn analyze_video(&self, path: &str) -> zbus::fdo::Result<String> {
        tracing::info!(path, "analyze_video requested");
        let report = self
            .engine
            .analyze_video(PathBuf::from(path), self.config.frame_count)
            .await
            .map_err(to_fdo)?;
        Ok(report.to_json())
    }

    /// Analyze the still image at `path` as a single face.
    async fn analyze_frame(&self, path: &str) -> zbus::fdo::Result<String> {
        tracing::info!(path, "analyze_frame requested");
        let report = self
            .engine
            .analyze_frame(PathBuf::from(path))
            .await
            .map_err(to_fdo)?;
        Ok(report.to_json())
    }

    /// Today's detection tip and news insights.
    async fn learn_updates(&self) -> zbus::fdo::Result<String> {
        serde_json::to_string(&defake_core::learn::todays_digest())
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        Ok(status_json(&self.config).to_string())
    }
}

fn status_json(config: &Config) -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "models_loaded": true,
        "model_dir": config.model_dir.display().to_string(),
        "detector": config.detector_model_path(),
        "classifier": config.classifier_model_path(),
        "frame_count": config.frame_count,
    })
}

/// Map an engine failure onto a D-Bus error. Unusable input becomes
/// `InvalidArgs`; anything else is an internal failure and is logged.
fn to_fdo(err: EngineError) -> zbus::fdo::Error {
    if err.is_invalid_input() {
        tracing::warn!(error = %err, "rejected request");
        zbus::fdo::Error::InvalidArgs(err.to_string())
    } else {
        tracing::error!(error = %err, "analysis failed");
        zbus::fdo::Error::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defake_media::MediaError;

    #[test]
    fn test_invalid_input_maps_to_invalid_args() {
        let err = EngineError::Media(MediaError::FileNotFound(PathBuf::from("/tmp/x.mp4")));
        assert!(matches!(to_fdo(err), zbus::fdo::Error::InvalidArgs(_)));
    }

    #[test]
    fn test_internal_errors_map_to_failed() {
        assert!(matches!(
            to_fdo(EngineError::ChannelClosed),
            zbus::fdo::Error::Failed(_)
        ));
        assert!(matches!(
            to_fdo(EngineError::Media(MediaError::FfmpegNotFound)),
            zbus::fdo::Error::Failed(_)
        ));
    }

    #[test]
    fn test_status_reports_model_paths() {
        let config = Config {
            model_dir: PathBuf::from("/models"),
            detector_model: "det.onnx".into(),
            classifier_model: "cls.onnx".into(),
            frame_count: 3,
            detection_enabled: false,
            bus: crate::config::BusKind::Session,
        };
        let status = status_json(&config);
        assert_eq!(status["classifier"], "/models/cls.onnx");
        assert!(status["detector"].is_null());
        assert_eq!(status["frame_count"], 3);
    }
}
