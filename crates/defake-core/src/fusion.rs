//! Blend the classifier probability with sharpness forensics into a verdict.

use crate::classifier::{ClassProbabilities, FAKE_CLASS_INDEX};
use crate::sharpness::ForensicReport;
use crate::types::{Analysis, Verdict};

/// Weight of the averaged classifier fake probability.
pub const MODEL_WEIGHT: f64 = 0.4;
/// Weight of the sharpness forensic score.
pub const FORENSIC_WEIGHT: f64 = 0.6;
/// Fused probabilities strictly above this are labelled fake.
pub const DEEPFAKE_THRESHOLD: f64 = 0.5;

/// Mean fake-class probability over all rows, `None` for no rows.
pub fn mean_fake_probability(probabilities: &[ClassProbabilities]) -> Option<f64> {
    if probabilities.is_empty() {
        return None;
    }
    let sum: f64 = probabilities
        .iter()
        .map(|row| row[FAKE_CLASS_INDEX] as f64)
        .sum();
    Some(sum / probabilities.len() as f64)
}

/// Weighted blend, clamped to [0, 1].
pub fn combine(model_fake_probability: f64, forensic_score: f64) -> f64 {
    (model_fake_probability * MODEL_WEIGHT + forensic_score * FORENSIC_WEIGHT).clamp(0.0, 1.0)
}

/// Fuse per-face classifier rows with the forensic report.
///
/// An empty batch yields `Analysis::NoFaces`, never a zero-confidence verdict.
pub fn fuse(probabilities: &[ClassProbabilities], forensic: &ForensicReport) -> Analysis {
    let Some(model_fake_probability) = mean_fake_probability(probabilities) else {
        return Analysis::NoFaces;
    };

    let fake_probability = combine(model_fake_probability, forensic.forensic_score);
    let is_deepfake = fake_probability > DEEPFAKE_THRESHOLD;
    let confidence = if is_deepfake {
        fake_probability * 100.0
    } else {
        (1.0 - fake_probability) * 100.0
    };

    let anomalies = if is_deepfake {
        forensic.notes.clone()
    } else {
        Vec::new()
    };

    tracing::debug!(
        model_fake_probability,
        forensic_score = forensic.forensic_score,
        fake_probability,
        is_deepfake,
        "fused scores"
    );

    Analysis::Verdict(Verdict {
        is_deepfake,
        confidence: round2(confidence),
        fake_probability,
        forensic_score: forensic.forensic_score,
        sharpness_metric: forensic.sharpness_metric,
        anomalies,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharpness::BLUR_NOTE;

    fn forensic(score: f64, notes: &[&str]) -> ForensicReport {
        ForensicReport {
            sharpness_metric: 42.0,
            forensic_score: score,
            notes: notes.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn rows(fake: f32) -> Vec<ClassProbabilities> {
        vec![[1.0 - fake, fake]]
    }

    fn verdict(a: Analysis) -> Verdict {
        match a {
            Analysis::Verdict(v) => v,
            Analysis::NoFaces => panic!("expected a verdict"),
        }
    }

    #[test]
    fn test_confident_model_sharp_face_is_real() {
        let v = verdict(fuse(&rows(0.9), &forensic(0.0, &[])));
        assert!((v.fake_probability - 0.36).abs() < 1e-6);
        assert!(!v.is_deepfake);
        assert!((v.confidence - 64.0).abs() < 1e-9);
        assert!(v.anomalies.is_empty());
    }

    #[test]
    fn test_doubtful_model_blurred_face_is_real() {
        let v = verdict(fuse(&rows(0.1), &forensic(0.4, &[BLUR_NOTE])));
        assert!((v.fake_probability - 0.28).abs() < 1e-6);
        assert!(!v.is_deepfake);
        assert!((v.confidence - 72.0).abs() < 1e-9);
        assert!(v.anomalies.is_empty(), "notes only surface on fake verdicts");
    }

    #[test]
    fn test_confident_model_blurred_face_is_fake() {
        let v = verdict(fuse(&rows(0.9), &forensic(0.4, &[BLUR_NOTE])));
        assert!((v.fake_probability - 0.6).abs() < 1e-6);
        assert!(v.is_deepfake);
        assert!((v.confidence - 60.0).abs() < 1e-9);
        assert_eq!(v.anomalies, vec![BLUR_NOTE.to_string()]);
        assert_eq!(v.sharpness_metric, 42.0);
    }

    #[test]
    fn test_averages_across_frames() {
        let probs = vec![[0.8, 0.2], [0.2, 0.8], [0.5, 0.5]];
        assert!((mean_fake_probability(&probs).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_exact_threshold_is_real() {
        // 0.5 * 0.4 + 0.5 * 0.6 = 0.5, which is not strictly above the threshold.
        let v = verdict(fuse(&rows(0.5), &forensic(0.5, &[])));
        assert!(!v.is_deepfake);
        assert!((v.confidence - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_combine_clamps() {
        assert_eq!(combine(2.0, 2.0), 1.0);
        assert_eq!(combine(-1.0, 0.0), 0.0);
    }

    #[test]
    fn test_confidence_rounded_to_two_decimals() {
        let v = verdict(fuse(&rows(0.123_456), &forensic(0.0, &[])));
        let scaled = v.confidence * 100.0;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_batch_is_no_faces() {
        assert_eq!(fuse(&[], &forensic(0.4, &[BLUR_NOTE])), Analysis::NoFaces);
    }
}
