use defake_core::{CLASSIFIER_MODEL_FILE, DEFAULT_VIDEO_FRAME_COUNT, DETECTOR_MODEL_FILE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Which D-Bus bus the service registers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    Session,
    System,
}

/// Optional TOML file named by `DEFAKE_CONFIG`. Environment variables win.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    model_dir: Option<PathBuf>,
    detector_model: Option<String>,
    classifier_model: Option<String>,
    frame_count: Option<usize>,
    detection_enabled: Option<bool>,
    bus: Option<BusKind>,
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// SCRFD model file name inside `model_dir`.
    pub detector_model: String,
    /// Classifier model file name inside `model_dir`.
    pub classifier_model: String,
    /// Faces sampled per video.
    pub frame_count: usize,
    /// When false, every frame uses the centered fallback crop.
    pub detection_enabled: bool,
    pub bus: BusKind,
}

impl Config {
    /// Load from `DEFAKE_CONFIG` (if set) and `DEFAKE_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var("DEFAKE_CONFIG") {
            Ok(path) => read_file(Path::new(&path))?,
            Err(_) => FileConfig::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let model_dir = env("DEFAKE_MODEL_DIR")
            .map(PathBuf::from)
            .or(file.model_dir)
            .unwrap_or_else(defake_core::default_model_dir);

        let frame_count = env_parse(&env, "DEFAKE_FRAME_COUNT")
            .or(file.frame_count)
            .unwrap_or(DEFAULT_VIDEO_FRAME_COUNT)
            .max(1);

        let bus = match env("DEFAKE_BUS").as_deref() {
            Some("system") => BusKind::System,
            Some("session") => BusKind::Session,
            _ => file.bus.unwrap_or(BusKind::Session),
        };

        Self {
            model_dir,
            detector_model: env("DEFAKE_DETECTOR_MODEL")
                .or(file.detector_model)
                .unwrap_or_else(|| DETECTOR_MODEL_FILE.to_string()),
            classifier_model: env("DEFAKE_CLASSIFIER_MODEL")
                .or(file.classifier_model)
                .unwrap_or_else(|| CLASSIFIER_MODEL_FILE.to_string()),
            frame_count,
            detection_enabled: env("DEFAKE_DETECTION_ENABLED")
                .map(|v| v != "0")
                .or(file.detection_enabled)
                .unwrap_or(true),
            bus,
        }
    }

    /// Path to the SCRFD model, or `None` when detection is disabled.
    pub fn detector_model_path(&self) -> Option<String> {
        self.detection_enabled.then(|| {
            self.model_dir
                .join(&self.detector_model)
                .to_string_lossy()
                .into_owned()
        })
    }

    pub fn classifier_model_path(&self) -> String {
        self.model_dir
            .join(&self.classifier_model)
            .to_string_lossy()
            .into_owned()
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_parse<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.parse().ok())
}
