//! Error types for the damage assessment pipeline.
//!
//! A single error enum covers every failure kind the pipeline can surface:
//! model loading, image decoding, inference, configuration, and output
//! writing. Per-request errors (image decode, output write) are meant to be
//! converted into a failure response by the caller; model-load errors are
//! fatal at construction time.

use std::path::PathBuf;
use thiserror::Error;

/// Convenient result alias for assessment operations.
pub type AssessResult<T> = Result<T, AssessError>;

/// Errors produced by the damage assessment pipeline.
#[derive(Error, Debug)]
pub enum AssessError {
    /// The input could not be decoded as an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A model artifact could not be loaded. Fatal at construction: the
    /// pipeline refuses to come up without both models.
    #[error("model load failed for '{path}': {message}")]
    ModelLoad {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<ort::Error>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError { message: String },

    /// The annotated result image could not be written.
    #[error("failed to write result image to '{path}'")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error (output directory creation, temp files).
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl AssessError {
    /// Creates an error for invalid input with the given message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AssessError::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config_error(message: impl Into<String>) -> Self {
        AssessError::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a model-load error for the given artifact path.
    pub fn model_load(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<ort::Error>,
    ) -> Self {
        AssessError::ModelLoad {
            path: path.into(),
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_load_error_mentions_path() {
        let err = AssessError::model_load("models/missing.onnx", "file not found", None);
        let msg = err.to_string();
        assert!(msg.contains("models/missing.onnx"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn invalid_input_constructor() {
        let err = AssessError::invalid_input("empty image");
        assert!(matches!(err, AssessError::InvalidInput { .. }));
    }
}
