//! Image loading helpers.

use crate::core::errors::AssessError;
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// Fails with [`AssessError::ImageLoad`] when the file cannot be read or
/// decoded as an image.
pub fn load_image(path: &Path) -> Result<RgbImage, AssessError> {
    let img = image::open(path).map_err(AssessError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Decodes an in-memory buffer (an uploaded file, typically) into an
/// RgbImage, guessing the format from its magic bytes.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, AssessError> {
    let img = image::load_from_memory(bytes).map_err(AssessError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_image_load_error() {
        let err = load_image(Path::new("/nonexistent/image.jpg")).unwrap_err();
        assert!(matches!(err, AssessError::ImageLoad(_)));
    }

    #[test]
    fn garbage_bytes_are_image_load_error() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AssessError::ImageLoad(_)));
    }

    #[test]
    fn decode_round_trips_png_bytes() {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(2, 2), &image::Rgb([10, 20, 30]));
    }
}
