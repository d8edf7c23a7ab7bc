//! Daily "learn" digest: a detection tip plus a few news insights.
//!
//! Selection is seeded from the calendar date, so every caller sees the same
//! digest for the whole day and a new one the next.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

const INSIGHTS_PER_DAY: usize = 3;

const TIPS: [&str; 8] = [
    "Check for unnatural blinking patterns. Deepfakes often blink less frequently or oddly.",
    "Look at the lips. Audio-visual desync is a common sign of manipulation.",
    "Inspect the background. Warping edges around the face are a giveaway.",
    "Watch for skin texture. Overly smooth 'airbrushed' skin can indicate AI generation.",
    "Check lighting consistency. Shadows on the face should match the environment.",
    "Focus on the eyes. Irregular pupil shapes or weird reflections can be a tell.",
    "Listen for robotic artifacts. AI voices might have metallic clipping or lack breathing sounds.",
    "Observe emotion mismatch. Does the facial expression truly match the tone of speech?",
];

const INSIGHTS: [(&str, &str, &str); 6] = [
    (
        "AI Voice Cloning Scams on the Rise",
        "Security researchers warn of a 300% increase in CEO fraud using voice synthesis.",
        "CyberSec Weekly",
    ),
    (
        "New Watermarking Standard Proposed",
        "Tech giants agree on C2PA standard to label AI-generated content automatically.",
        "TechCrunch",
    ),
    (
        "Deepfake Detection Challenge 2026",
        "Global competition launches to find the most robust detection algorithm.",
        "AI Daily",
    ),
    (
        "EU AI Act Enforced",
        "New regulations require mandatory disclosure for all AI-generated media in the EU.",
        "EU Commission",
    ),
    (
        "Real-time Deepfake Calls",
        "Scammers are now using real-time face swapping in video calls to impersonate relatives.",
        "Fraud Watch",
    ),
    (
        "The 'Uncanny Valley' Effect",
        "Why deepfakes feel creepy? Our brains subconsciously detect micro-imperfections.",
        "NeuroScience Today",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub title: String,
    pub summary: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnDigest {
    pub tip_of_the_day: String,
    pub insights: Vec<Insight>,
}

/// Digest for `date`.
pub fn daily_digest(date: NaiveDate) -> LearnDigest {
    let mut rng = StdRng::seed_from_u64(date.num_days_from_ce() as u64);

    let tip_of_the_day = TIPS
        .choose(&mut rng)
        .map(|t| t.to_string())
        .unwrap_or_default();

    let insights = INSIGHTS
        .choose_multiple(&mut rng, INSIGHTS_PER_DAY)
        .map(|(title, summary, source)| Insight {
            title: title.to_string(),
            summary: summary.to_string(),
            source: source.to_string(),
        })
        .collect();

    LearnDigest {
        tip_of_the_day,
        insights,
    }
}

/// Digest for the current local date.
pub fn todays_digest() -> LearnDigest {
    daily_digest(chrono::Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_same_digest() {
        assert_eq!(daily_digest(date(2026, 3, 14)), daily_digest(date(2026, 3, 14)));
    }

    #[test]
    fn test_digest_shape() {
        let digest = daily_digest(date(2026, 10, 17));
        assert!(TIPS.contains(&digest.tip_of_the_day.as_str()));
        assert_eq!(digest.insights.len(), INSIGHTS_PER_DAY);

        let mut titles: Vec<&str> = digest.insights.iter().map(|i| i.title.as_str()).collect();
        titles.sort_unstable();
        titles.dedup();
        assert_eq!(titles.len(), INSIGHTS_PER_DAY, "insights must be distinct");
    }

    #[test]
    fn test_digest_rotates_over_a_month() {
        let first = daily_digest(date(2026, 1, 1));
        let rotated = (2..=31).any(|d| daily_digest(date(2026, 1, d)) != first);
        assert!(rotated);
    }

    #[test]
    fn test_digest_serializes() {
        let json = serde_json::to_value(daily_digest(date(2026, 5, 1))).unwrap();
        assert!(json["tip_of_the_day"].is_string());
        assert_eq!(json["insights"].as_array().unwrap().len(), 3);
        assert!(json["insights"][0]["source"].is_string());
    }
}
