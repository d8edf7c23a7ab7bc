//! Caller-facing rendering of an analysis.

use crate::types::{Analysis, Verdict};
use serde::Serialize;

/// Appended to every fake verdict for display compatibility.
pub const GENERIC_FAKE_ANOMALIES: [&str; 2] = [
    "Inconsistent texture detected",
    "High confidence manipulation pattern",
];

pub const NO_FACES_MESSAGE: &str =
    "No faces detected in the video or video could not be processed.";

/// JSON body returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Verdict {
        #[serde(flatten)]
        verdict: Verdict,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    NoFaces {
        error: String,
    },
}

impl Report {
    /// Render `analysis`, tagging video results with their source name.
    pub fn new(analysis: Analysis, filename: Option<String>) -> Self {
        match analysis {
            Analysis::Verdict(mut verdict) => {
                if verdict.is_deepfake {
                    verdict
                        .anomalies
                        .extend(GENERIC_FAKE_ANOMALIES.iter().map(|s| s.to_string()));
                }
                Report::Verdict { verdict, filename }
            }
            Analysis::NoFaces => Report::NoFaces {
                error: NO_FACES_MESSAGE.to_string(),
            },
        }
    }

    pub fn is_no_faces(&self) -> bool {
        matches!(self, Report::NoFaces { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "report serialization failed");
            "{}".to_string()
        })
    }
}
