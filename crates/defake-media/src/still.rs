//! Still image decoding.

use crate::error::{MediaError, MediaResult};
use image::RgbImage;
use std::path::Path;

/// Decode image bytes in any format the `image` crate recognizes.
pub fn decode_image(bytes: &[u8]) -> MediaResult<RgbImage> {
    let decoded = image::load_from_memory(bytes)?;
    tracing::debug!(
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded still image"
    );
    Ok(decoded.to_rgb8())
}

pub fn load_image(path: &Path) -> MediaResult<RgbImage> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let img = RgbImage::from_pixel(12, 9, Rgb([200, 100, 50]));
        let decoded = decode_image(&png_bytes(DynamicImage::ImageRgb8(img))).unwrap();
        assert_eq!(decoded.dimensions(), (12, 9));
        assert_eq!(decoded.get_pixel(3, 3), &Rgb([200, 100, 50]));
    }

    #[test]
    fn test_alpha_is_dropped() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 128]));
        let decoded = decode_image(&png_bytes(DynamicImage::ImageRgba8(img))).unwrap();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_garbage_is_invalid_input() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MediaError::InvalidImage(_)));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        std::fs::write(&path, png_bytes(DynamicImage::ImageRgb8(RgbImage::new(5, 6)))).unwrap();
        assert_eq!(load_image(&path).unwrap().dimensions(), (5, 6));
        assert!(matches!(
            load_image(&dir.path().join("missing.png")),
            Err(MediaError::FileNotFound(_))
        ));
    }
}
