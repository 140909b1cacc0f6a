//! Image loading and result visualization helpers.

pub mod image;
pub mod visualization;

pub use image::{decode_image, load_image};
pub use visualization::{VisualizationConfig, render_assessment};
