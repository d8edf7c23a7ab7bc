use image::RgbImage;
use ndarray::{Array3, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

/// Side length of the square face tensor fed to the classifier.
pub const FACE_INPUT_SIZE: usize = 299;

/// Candidate face box reported by a detector, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Axis-aligned crop rectangle inside a frame.
///
/// Always non-empty and fully inside the frame it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceCrop {
    /// Copy the cropped region out of `frame`.
    pub fn extract(&self, frame: &RgbImage) -> RgbImage {
        image::imageops::crop_imm(frame, self.x, self.y, self.width, self.height).to_image()
    }

    /// Whether the pixel rectangle `[x0, x1) × [y0, y1)` lies inside this crop.
    pub fn contains_rect(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
        x0 >= self.x && y0 >= self.y && x1 <= self.x + self.width && y1 <= self.y + self.height
    }
}

/// One face as a channel-first `[3, 299, 299]` tensor with values in [0, 1].
#[derive(Debug, Clone)]
pub struct NormalizedFace(Array3<f32>);

impl NormalizedFace {
    /// Build from a 299×299 RGB crop: divide by 255 and move channels first.
    pub fn from_rgb(resized: &RgbImage) -> Self {
        let size = FACE_INPUT_SIZE;
        let mut tensor = Array3::<f32>::zeros((3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            if x >= size || y >= size {
                continue;
            }
            for c in 0..3 {
                tensor[[c, y, x]] = pixel.0[c] as f32 / 255.0;
            }
        }
        Self(tensor)
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.0.view()
    }
}

/// Ordered, non-empty batch of normalized faces, shape `[N, 3, 299, 299]`.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    tensor: Array4<f32>,
}

impl FrameBatch {
    /// Stack faces in order. Returns `None` for an empty input.
    pub fn from_faces(faces: &[NormalizedFace]) -> Option<Self> {
        if faces.is_empty() {
            return None;
        }
        let size = FACE_INPUT_SIZE;
        let mut tensor = Array4::<f32>::zeros((faces.len(), 3, size, size));
        for (i, face) in faces.iter().enumerate() {
            tensor.index_axis_mut(Axis(0), i).assign(&face.0);
        }
        Some(Self { tensor })
    }

    pub fn len(&self) -> usize {
        self.tensor.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The representative face used for sharpness forensics.
    pub fn first(&self) -> ArrayView3<'_, f32> {
        self.tensor.index_axis(Axis(0), 0)
    }

    pub fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }
}

/// Final deepfake verdict for one analyzed video or frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_deepfake: bool,
    /// Confidence in the reported label, 0–100, two decimals.
    pub confidence: f64,
    #[serde(rename = "fake_prob")]
    pub fake_probability: f64,
    pub forensic_score: f64,
    #[serde(rename = "blur_score")]
    pub sharpness_metric: f64,
    pub anomalies: Vec<String>,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Verdict(Verdict),
    /// No usable face crop could be produced; carries no label or confidence.
    NoFaces,
}

impl Analysis {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Analysis::Verdict(v) => Some(v),
            Analysis::NoFaces => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_face_box_area() {
        let b = FaceBox { x: 1.0, y: 2.0, width: 10.0, height: 4.0, confidence: 0.9 };
        assert_eq!(b.area(), 40.0);
        let degenerate = FaceBox { x: 0.0, y: 0.0, width: -3.0, height: 4.0, confidence: 0.9 };
        assert_eq!(degenerate.area(), 0.0);
    }

    #[test]
    fn test_crop_extract_dimensions() {
        let frame = RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]));
        let crop = FaceCrop { x: 8, y: 4, width: 20, height: 30 };
        let out = crop.extract(&frame);
        assert_eq!(out.dimensions(), (20, 30));
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_normalized_face_channel_first() {
        let size = FACE_INPUT_SIZE as u32;
        let mut img = RgbImage::from_pixel(size, size, Rgb([0, 0, 0]));
        img.put_pixel(5, 7, Rgb([255, 51, 0]));
        let face = NormalizedFace::from_rgb(&img);
        let v = face.view();
        assert_eq!(v.shape(), &[3, FACE_INPUT_SIZE, FACE_INPUT_SIZE]);
        assert!((v[[0, 7, 5]] - 1.0).abs() < 1e-6);
        assert!((v[[1, 7, 5]] - 0.2).abs() < 1e-6);
        assert_eq!(v[[2, 7, 5]], 0.0);
        assert!(v.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_frame_batch_preserves_order() {
        let size = FACE_INPUT_SIZE as u32;
        let dark = NormalizedFace::from_rgb(&RgbImage::from_pixel(size, size, Rgb([0, 0, 0])));
        let bright = NormalizedFace::from_rgb(&RgbImage::from_pixel(size, size, Rgb([255, 255, 255])));
        let batch = FrameBatch::from_faces(&[dark, bright]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.tensor().shape(), &[2, 3, FACE_INPUT_SIZE, FACE_INPUT_SIZE]);
        assert_eq!(batch.first()[[0, 0, 0]], 0.0);
        assert_eq!(batch.tensor()[[1, 2, 10, 10]], 1.0);
    }

    #[test]
    fn test_frame_batch_empty_is_none() {
        assert!(FrameBatch::from_faces(&[]).is_none());
    }

    #[test]
    fn test_verdict_serializes_flat_wire_names() {
        let v = Verdict {
            is_deepfake: true,
            confidence: 60.0,
            fake_probability: 0.6,
            forensic_score: 0.4,
            sharpness_metric: 12.5,
            anomalies: vec!["Significant blur detected".into()],
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["is_deepfake"], true);
        assert_eq!(json["fake_prob"], 0.6);
        assert_eq!(json["blur_score"], 12.5);
        assert_eq!(json["anomalies"][0], "Significant blur detected");
        assert!(json.get("fake_probability").is_none());
    }
}
