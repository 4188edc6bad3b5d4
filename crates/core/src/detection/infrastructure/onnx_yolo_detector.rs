/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and NMS post-processing.
/// Confidence filtering against the session threshold happens later in
/// the detector adapter; this stage only drops obvious noise.
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::detection::domain::face_detector::{
    DetectorError, DetectorLoader, FaceDetector, ModelLoadError,
};
use crate::detection::infrastructure::model_resolver::{self, ProgressFn};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::ModelSource;
use crate::shared::frame::Frame;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Candidates below this never reach NMS.
pub const RAW_CONFIDENCE_FLOOR: f64 = 0.05;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence_floor: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence_floor: f64) -> Result<Self, ort::Error> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        // NCHW: [1, 3, H, W]
        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence_floor,
            input_size,
        })
    }

    fn run(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        // YOLO output is [1, features, detections] or [1, detections, features].
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = Vec::new();
        for i in 0..num_dets {
            let feature = |f: usize| {
                if transposed {
                    data[f * num_dets + i]
                } else {
                    data[i * num_feats + f]
                }
            };

            // [cx, cy, w, h, conf, ...keypoints]
            if num_feats < 5 {
                continue;
            }
            let conf = feature(4) as f64;
            if conf < self.confidence_floor {
                continue;
            }

            let cx = feature(0) as f64;
            let cy = feature(1) as f64;
            let w = feature(2) as f64;
            let h = feature(3) as f64;

            // Letterbox coords back to frame coords
            let x1 = ((cx - w / 2.0) - pad_x as f64) / scale;
            let y1 = ((cy - h / 2.0) - pad_y as f64) / scale;
            let x2 = ((cx + w / 2.0) - pad_x as f64) / scale;
            let y2 = ((cy + h / 2.0) - pad_y as f64) / scale;

            candidates.push(BoundingBox::from_corners(x1, y1, x2, y2, conf));
        }

        Ok(nms(&mut candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|b| b.clamp_to(frame.width(), frame.height()))
            .filter(|b| b.area() > 0.0)
            .collect())
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError> {
        self.run(frame)
            .map_err(|e| DetectorError::Inference(e.to_string()))
    }
}

/// Resolves the YOLO model file and opens an ONNX Runtime session on it.
#[derive(Default)]
pub struct OnnxYoloLoader;

impl DetectorLoader for OnnxYoloLoader {
    fn load(&self, source: &ModelSource) -> Result<Box<dyn FaceDetector>, ModelLoadError> {
        let path = model_resolver::resolve(
            source,
            Some(download_progress_logger(source.name.clone())),
        )
        .map_err(|e| ModelLoadError::Resolve {
            name: source.name.clone(),
            reason: e.to_string(),
        })?;

        let detector = OnnxYoloDetector::new(&path, RAW_CONFIDENCE_FLOOR).map_err(|e| {
            ModelLoadError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        log::info!(
            "Loaded face model {} (input {}px)",
            path.display(),
            detector.input_size
        );
        Ok(Box::new(detector))
    }
}

/// Logs download progress in 10% steps.
fn download_progress_logger(name: String) -> ProgressFn {
    let last_decile = AtomicU64::new(u64::MAX);
    Box::new(move |downloaded, total| {
        if total == 0 {
            return;
        }
        let decile = downloaded * 10 / total;
        if last_decile.swap(decile, Ordering::Relaxed) != decile {
            log::info!("Downloading {name}: {}%", decile * 10);
        }
    })
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114/255 gray padding, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [BoundingBox], iou_thresh: f64) -> Vec<BoundingBox> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i]);
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && dets[i].iou(&dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}
