//! ONNX Runtime-backed YOLO damage detector.
//!
//! Wraps an exported YOLO detection model (output `[1, 4 + classes, anchors]`,
//! boxes as center/size in letterbox space) behind the [`DamageDetector`]
//! capability trait. The session is guarded by a mutex: detection runs are
//! serialized, so concurrent pipeline invocations never race a session.

use crate::core::errors::{AssessError, AssessResult};
use crate::core::traits::{DamageDetector, Detection};
use crate::models::preprocess::Letterbox;
use crate::processors::geometry::BoundingBox;
use image::RgbImage;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// A decoded prediction in letterbox space, before label lookup.
pub(crate) struct RawPrediction {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub confidence: f32,
    /// Anchor column this prediction came from, needed by segmentation
    /// models to look up the matching mask coefficients.
    pub anchor: usize,
}

/// Damage detector backed by an ONNX YOLO model.
pub struct YoloDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    labels: Vec<String>,
    letterbox: Letterbox,
    model_path: PathBuf,
}

impl YoloDetector {
    /// Loads the model from an `.onnx` file. Fails fatally when the
    /// artifact is missing or unreadable.
    ///
    /// `labels` maps class ids to class names; ids beyond the list render
    /// as `class_<id>`.
    pub fn from_file(
        path: impl AsRef<Path>,
        labels: Vec<String>,
        input_size: u32,
    ) -> AssessResult<Self> {
        let path = path.as_ref();
        let session = load_session(path)?;
        let (input_name, output_name) = io_names(&session, path)?;
        debug!(
            model = %path.display(),
            input = %input_name,
            output = %output_name,
            "loaded damage detection model"
        );
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            labels,
            letterbox: Letterbox::new(input_size),
            model_path: path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn label_for(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }
}

impl DamageDetector for YoloDetector {
    fn detect(&self, image: &RgbImage, confidence_floor: f32) -> AssessResult<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let (tensor, map) = self.letterbox.apply(image);
        let input = TensorRef::from_array_view(tensor.view())?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AssessError::invalid_input("damage model session lock poisoned"))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;
        let (shape, data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

        let raw = decode_predictions(data, &dims, 0, confidence_floor)?;
        let detections = raw
            .into_iter()
            .map(|p| Detection {
                bbox: map
                    .unmap_box(&p.bbox)
                    .clamp_to(width as f32, height as f32),
                label: self.label_for(p.class_id),
                confidence: p.confidence,
            })
            .collect();
        Ok(detections)
    }
}

/// Creates an ONNX session for a model artifact, converting failures into
/// fatal model-load errors.
pub(crate) fn load_session(path: &Path) -> AssessResult<Session> {
    Session::builder()
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| {
            AssessError::model_load(
                path,
                "failed to create ONNX session; verify the model file exists and is readable",
                Some(e),
            )
        })
}

/// Resolves the names of the first input and first output of a session.
pub(crate) fn io_names(session: &Session, path: &Path) -> AssessResult<(String, String)> {
    let input = session
        .inputs
        .first()
        .map(|i| i.name.clone())
        .ok_or_else(|| AssessError::model_load(path, "model declares no inputs", None))?;
    let output = session
        .outputs
        .first()
        .map(|o| o.name.clone())
        .ok_or_else(|| AssessError::model_load(path, "model declares no outputs", None))?;
    Ok((input, output))
}

/// Decodes a YOLO detection head of shape `[1, 4 + classes + extra, anchors]`.
///
/// `extra` is the number of trailing per-anchor attributes that are not
/// class scores (32 mask coefficients for segmentation models, 0 for plain
/// detection). Rows are `[cx, cy, w, h, class scores..., extra...]` laid
/// out attribute-major. Predictions below `confidence_floor` are skipped.
pub(crate) fn decode_predictions(
    data: &[f32],
    dims: &[usize],
    extra: usize,
    confidence_floor: f32,
) -> AssessResult<Vec<RawPrediction>> {
    if dims.len() != 3 || dims[0] != 1 {
        return Err(AssessError::invalid_input(format!(
            "unexpected detection output shape {dims:?}, expected [1, attrs, anchors]"
        )));
    }
    let attrs = dims[1];
    let anchors = dims[2];
    if attrs < 4 + 1 + extra || data.len() < attrs * anchors {
        return Err(AssessError::invalid_input(format!(
            "detection output too small: {attrs} attributes, {} values",
            data.len()
        )));
    }
    let num_classes = attrs - 4 - extra;

    let at = |attr: usize, anchor: usize| data[attr * anchors + anchor];

    let mut predictions = Vec::new();
    for i in 0..anchors {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, at(4 + c, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 { cur } else { best }
            });
        if confidence < confidence_floor {
            continue;
        }

        let cx = at(0, i);
        let cy = at(1, i);
        let w = at(2, i);
        let h = at(3, i);
        if w <= 0.0 || h <= 0.0 {
            continue;
        }
        predictions.push(RawPrediction {
            bbox: BoundingBox::new(
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
            ),
            class_id,
            confidence,
            anchor: i,
        });
    }
    Ok(predictions)
}
