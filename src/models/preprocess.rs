//! Letterbox preprocessing for YOLO-family models.
//!
//! The model expects a fixed square input; the image is scaled to fit while
//! keeping its aspect ratio and the remainder is padded with the neutral
//! gray the models were trained with. The returned [`LetterboxMap`] undoes
//! the transform for boxes and polygon points decoded from model output.

use crate::processors::geometry::BoundingBox;
use image::{RgbImage, imageops};
use ndarray::Array4;

/// Neutral gray used by ultralytics-style letterbox padding.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Letterbox resize to a square model input.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    pub size: u32,
}

/// Mapping from letterbox (model input) coordinates back to the source
/// image coordinates.
#[derive(Debug, Clone, Copy)]
pub struct LetterboxMap {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl LetterboxMap {
    /// Maps a box from model-input space back to source-image space.
    pub fn unmap_box(&self, bbox: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            (bbox.x1 - self.pad_x) / self.scale,
            (bbox.y1 - self.pad_y) / self.scale,
            (bbox.x2 - self.pad_x) / self.scale,
            (bbox.y2 - self.pad_y) / self.scale,
        )
    }

    /// Maps a single point from model-input space back to source-image
    /// space.
    pub fn unmap_point(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

impl Letterbox {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    /// Produces the normalized NCHW input tensor plus the inverse mapping.
    pub fn apply(&self, image: &RgbImage) -> (Array4<f32>, LetterboxMap) {
        let (width, height) = image.dimensions();
        let size = self.size;

        let scale = (size as f32 / width.max(1) as f32).min(size as f32 / height.max(1) as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);

        let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);
        let pad_x = (size - new_w) / 2;
        let pad_y = (size - new_h) / 2;

        let mut tensor = Array4::from_elem((1, 3, size as usize, size as usize), PAD_VALUE);
        for (x, y, pixel) in resized.enumerate_pixels() {
            let tx = (x + pad_x) as usize;
            let ty = (y + pad_y) as usize;
            tensor[[0, 0, ty, tx]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, ty, tx]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, ty, tx]] = pixel[2] as f32 / 255.0;
        }

        (
            tensor,
            LetterboxMap {
                scale,
                pad_x: pad_x as f32,
                pad_y: pad_y as f32,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_has_model_input_shape() {
        let img = RgbImage::new(200, 100);
        let (tensor, _) = Letterbox::new(64).apply(&img);
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
    }

    #[test]
    fn wide_image_pads_vertically() {
        let img = RgbImage::from_pixel(200, 100, image::Rgb([255, 255, 255]));
        let (tensor, map) = Letterbox::new(64).apply(&img);
        assert_eq!(map.scale, 64.0 / 200.0);
        assert_eq!(map.pad_x, 0.0);
        assert_eq!(map.pad_y, 16.0);
        // Padding rows keep the neutral gray, content rows are white.
        assert_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE);
        assert_eq!(tensor[[0, 0, 32, 32]], 1.0);
    }

    #[test]
    fn unmap_box_round_trips() {
        let img = RgbImage::new(200, 100);
        let (_, map) = Letterbox::new(64).apply(&img);
        // A box in source space, mapped to letterbox space manually.
        let source = BoundingBox::new(50.0, 25.0, 150.0, 75.0);
        let mapped = BoundingBox::new(
            source.x1 * map.scale + map.pad_x,
            source.y1 * map.scale + map.pad_y,
            source.x2 * map.scale + map.pad_x,
            source.y2 * map.scale + map.pad_y,
        );
        let back = map.unmap_box(&mapped);
        assert!((back.x1 - source.x1).abs() < 1e-4);
        assert!((back.y1 - source.y1).abs() < 1e-4);
        assert!((back.x2 - source.x2).abs() < 1e-4);
        assert!((back.y2 - source.y2).abs() < 1e-4);
    }
}
