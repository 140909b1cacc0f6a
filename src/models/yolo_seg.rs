//! ONNX Runtime-backed YOLO segmentation model for vehicle parts.
//!
//! A YOLO segmentation export has two outputs: the detection head
//! `[1, 4 + classes + 32, anchors]` whose last 32 attributes are mask
//! coefficients, and a prototype tensor `[1, 32, mh, mw]`. Each instance
//! mask is the sigmoid of the coefficient-weighted sum of prototypes,
//! thresholded and restricted to the instance box; the mask bitmap is then
//! turned into a polygon by contour extraction, the same way bitmap
//! post-processing works in text detection.

use crate::core::errors::{AssessError, AssessResult};
use crate::core::traits::{PartRegion, PartSegmentor};
use crate::models::preprocess::{Letterbox, LetterboxMap};
use crate::models::yolo::{decode_predictions, load_session};
use crate::processors::geometry::{BoundingBox, Point, polygon_from_contour};
use crate::processors::suppression::greedy_nms;
use image::{GrayImage, RgbImage};
use imageproc::contours::find_contours;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Number of mask coefficients in YOLO segmentation heads.
const MASK_COEFFS: usize = 32;

/// IoU threshold for suppressing duplicate part instances. The exported
/// model has no built-in suppression, so the raw anchors need it.
const PART_NMS_IOU: f32 = 0.45;

/// Part segmentor backed by an ONNX YOLO segmentation model.
pub struct YoloSegmentor {
    session: Mutex<Session>,
    input_name: String,
    det_output: String,
    proto_output: String,
    labels: Vec<String>,
    letterbox: Letterbox,
    model_path: PathBuf,
}

impl YoloSegmentor {
    /// Loads the model from an `.onnx` file. Fails fatally when the
    /// artifact is missing, unreadable, or not a segmentation export.
    pub fn from_file(
        path: impl AsRef<Path>,
        labels: Vec<String>,
        input_size: u32,
    ) -> AssessResult<Self> {
        let path = path.as_ref();
        let session = load_session(path)?;
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| AssessError::model_load(path, "model declares no inputs", None))?;
        let mut output_names = session.outputs.iter().map(|o| o.name.clone());
        let det_output = output_names.next().ok_or_else(|| {
            AssessError::model_load(path, "model declares no outputs", None)
        })?;
        let proto_output = output_names.next().ok_or_else(|| {
            AssessError::model_load(
                path,
                "expected a segmentation model with a second (prototype) output",
                None,
            )
        })?;
        debug!(
            model = %path.display(),
            det = %det_output,
            proto = %proto_output,
            "loaded part segmentation model"
        );
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            det_output,
            proto_output,
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

impl PartSegmentor for YoloSegmentor {
    fn segment(&self, image: &RgbImage, confidence_floor: f32) -> AssessResult<Vec<PartRegion>> {
        let (width, height) = image.dimensions();
        let (tensor, map) = self.letterbox.apply(image);
        let input = TensorRef::from_array_view(tensor.view())?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AssessError::invalid_input("parts model session lock poisoned"))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;

        let (det_shape, det_data) =
            outputs[self.det_output.as_str()].try_extract_tensor::<f32>()?;
        let det_dims: Vec<usize> = det_shape.iter().map(|&d| d as usize).collect();
        let (proto_shape, proto_data) =
            outputs[self.proto_output.as_str()].try_extract_tensor::<f32>()?;
        let proto_dims: Vec<usize> = proto_shape.iter().map(|&d| d as usize).collect();

        if proto_dims.len() != 4 || proto_dims[1] != MASK_COEFFS {
            return Err(AssessError::invalid_input(format!(
                "unexpected prototype tensor shape {proto_dims:?}, expected [1, {MASK_COEFFS}, mh, mw]"
            )));
        }
        let (mask_h, mask_w) = (proto_dims[2], proto_dims[3]);

        let predictions = decode_predictions(det_data, &det_dims, MASK_COEFFS, confidence_floor)?;

        // Gather mask coefficients for each surviving prediction. The
        // detection head is attribute-major: coefficient k of anchor i sits
        // at (4 + classes + k) * anchors + i.
        let attrs = det_dims[1];
        let anchors = det_dims[2];
        let num_classes = attrs - 4 - MASK_COEFFS;

        let boxes: Vec<BoundingBox> = predictions.iter().map(|p| p.bbox).collect();
        let scores: Vec<f32> = predictions.iter().map(|p| p.confidence).collect();
        let keep = greedy_nms(&boxes, &scores, PART_NMS_IOU, confidence_floor);

        let mut regions = Vec::with_capacity(keep.len());
        for &idx in &keep {
            let pred = &predictions[idx];
            let coeffs: Vec<f32> = (0..MASK_COEFFS)
                .map(|k| det_data[(4 + num_classes + k) * anchors + pred.anchor])
                .collect();

            let mask = instance_mask(
                &coeffs,
                proto_data,
                mask_h,
                mask_w,
                &pred.bbox,
                self.letterbox.size,
            );
            let polygon = mask_polygon(&mask, mask_w, self.letterbox.size, &map)
                .unwrap_or_else(|| box_polygon(&map.unmap_box(&pred.bbox)));

            let bbox = map
                .unmap_box(&pred.bbox)
                .clamp_to(width as f32, height as f32);
            regions.push(PartRegion {
                label: self.label_for(pred.class_id),
                polygon,
                bbox,
                confidence: pred.confidence,
            });
        }
        Ok(regions)
    }
}

/// Builds the binary instance mask in prototype space: sigmoid of the
/// coefficient-weighted prototype sum, thresholded at 0.5 and restricted to
/// the instance box. `sigmoid(s) > 0.5` is equivalent to `s > 0`.
fn instance_mask(
    coeffs: &[f32],
    proto: &[f32],
    mask_h: usize,
    mask_w: usize,
    bbox_letterbox: &BoundingBox,
    letterbox_size: u32,
) -> GrayImage {
    let ratio_x = mask_w as f32 / letterbox_size as f32;
    let ratio_y = mask_h as f32 / letterbox_size as f32;
    let x0 = ((bbox_letterbox.x1 * ratio_x).floor().max(0.0)) as usize;
    let y0 = ((bbox_letterbox.y1 * ratio_y).floor().max(0.0)) as usize;
    let x1 = ((bbox_letterbox.x2 * ratio_x).ceil() as usize).min(mask_w);
    let y1 = ((bbox_letterbox.y2 * ratio_y).ceil() as usize).min(mask_h);

    let mut mask = GrayImage::new(mask_w as u32, mask_h as u32);
    for y in y0..y1 {
        for x in x0..x1 {
            let mut s = 0.0f32;
            for (k, &c) in coeffs.iter().enumerate() {
                s += c * proto[k * mask_h * mask_w + y * mask_w + x];
            }
            if s > 0.0 {
                mask.put_pixel(x as u32, y as u32, image::Luma([255]));
            }
        }
    }
    mask
}

/// Extracts the dominant contour of a mask bitmap and maps it to
/// source-image coordinates. Returns `None` when the mask is empty.
fn mask_polygon(
    mask: &GrayImage,
    mask_w: usize,
    letterbox_size: u32,
    map: &LetterboxMap,
) -> Option<Vec<Point>> {
    let contours = find_contours::<u32>(mask);
    let contour = contours.iter().max_by_key(|c| c.points.len())?;
    if contour.points.len() < 3 {
        return None;
    }

    let upscale = letterbox_size as f32 / mask_w as f32;
    let polygon = polygon_from_contour(contour)
        .into_iter()
        .map(|p| {
            let (x, y) = map.unmap_point(p.x * upscale, p.y * upscale);
            Point::new(x, y)
        })
        .collect();
    Some(polygon)
}

/// Fallback polygon for an instance whose mask collapsed to nothing: the
/// box corners themselves.
fn box_polygon(bbox: &BoundingBox) -> Vec<Point> {
    vec![
        Point::new(bbox.x1, bbox.y1),
        Point::new(bbox.x2, bbox.y1),
        Point::new(bbox.x2, bbox.y2),
        Point::new(bbox.x1, bbox.y2),
    ]
}
