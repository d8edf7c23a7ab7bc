//! Laplacian-variance sharpness forensics.
//!
//! Over-smoothed faces are a common artifact of face-swap pipelines. The
//! variance of the Laplacian response drops as edges soften, and fixed
//! thresholds turn it into a coarse heuristic fake score.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::filter3x3;
use ndarray::ArrayView3;

/// Below this the face is treated as heavily blurred.
pub const BLUR_THRESHOLD: f64 = 50.0;
/// Below this (and above `BLUR_THRESHOLD`) edges are treated as soft.
pub const SOFT_EDGE_THRESHOLD: f64 = 100.0;

pub const BLUR_FORENSIC_SCORE: f64 = 0.4;
pub const SOFT_EDGE_FORENSIC_SCORE: f64 = 0.2;

pub const BLUR_NOTE: &str = "Significant blur detected";
pub const SOFT_EDGE_NOTE: &str = "Soft edges detected";

/// Result of sharpness forensics on one face.
#[derive(Debug, Clone, PartialEq)]
pub struct ForensicReport {
    /// Variance of the Laplacian over the face, in 8-bit intensity units.
    pub sharpness_metric: f64,
    /// Heuristic fake score in [0, 1].
    pub forensic_score: f64,
    pub notes: Vec<String>,
}

/// Analyze a normalized `[3, H, W]` face with values in [0, 1].
pub fn analyze(face: ArrayView3<'_, f32>) -> ForensicReport {
    let gray = luminance(face);
    let sharpness_metric = laplacian_variance(&gray);
    let (forensic_score, note) = score_sharpness(sharpness_metric);

    tracing::debug!(sharpness_metric, forensic_score, "sharpness forensics");

    ForensicReport {
        sharpness_metric,
        forensic_score,
        notes: note.into_iter().map(String::from).collect(),
    }
}

/// Map a sharpness metric to its fixed forensic score and note.
pub fn score_sharpness(metric: f64) -> (f64, Option<&'static str>) {
    if metric < BLUR_THRESHOLD {
        (BLUR_FORENSIC_SCORE, Some(BLUR_NOTE))
    } else if metric < SOFT_EDGE_THRESHOLD {
        (SOFT_EDGE_FORENSIC_SCORE, Some(SOFT_EDGE_NOTE))
    } else {
        (0.0, None)
    }
}

/// 4-neighbour Laplacian kernel.
const LAPLACIAN_KERNEL: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Back to 8-bit RGB, then BT.601 luma, rounded to integer levels.
fn luminance(face: ArrayView3<'_, f32>) -> GrayImage {
    let (_, height, width) = face.dim();
    let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0);
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let r = to_u8(face[[0, y, x]]);
        let g = to_u8(face[[1, y, x]]);
        let b = to_u8(face[[2, y, x]]);
        Luma([(0.299 * r + 0.587 * g + 0.114 * b).round() as u8])
    })
}

/// Copy `gray` into a float image with a one-pixel border that reflects
/// without repeating the edge pixel (`dcb|abcd|cba`).
fn pad_reflect101(gray: &GrayImage) -> ImageBuffer<Luma<f32>, Vec<f32>> {
    let (width, height) = gray.dimensions();
    let reflect = |i: i64, n: u32| -> u32 {
        let n = n as i64;
        if n == 1 {
            return 0;
        }
        let r = if i < 0 {
            -i
        } else if i >= n {
            2 * (n - 1) - i
        } else {
            i
        };
        r as u32
    };
    ImageBuffer::from_fn(width + 2, height + 2, |x, y| {
        let sx = reflect(x as i64 - 1, width);
        let sy = reflect(y as i64 - 1, height);
        Luma([gray.get_pixel(sx, sy).0[0] as f32])
    })
}

/// Population variance of the Laplacian response over every pixel.
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let padded = pad_reflect101(gray);
    let response: ImageBuffer<Luma<f32>, Vec<f32>> = filter3x3(&padded, &LAPLACIAN_KERNEL);

    // The padded ring only feeds its neighbours; score the original pixels.
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in 1..=height {
        for x in 1..=width {
            let lap = response.get_pixel(x, y).0[0] as f64;
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let n = (width as f64) * (height as f64);
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}
