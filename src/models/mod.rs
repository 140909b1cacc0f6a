//! ONNX Runtime-backed implementations of the model capability traits.

pub mod preprocess;
pub mod yolo;
pub mod yolo_seg;

pub use preprocess::{Letterbox, LetterboxMap};
pub use yolo::YoloDetector;
pub use yolo_seg::YoloSegmentor;
