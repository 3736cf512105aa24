/// Hand landmark detector using ONNX Runtime via `ort`.
///
/// Runs a MediaPipe-style single-hand landmark model over the whole frame
/// and reports at most one `HandLandmarkSet` when the model's hand presence
/// score clears the configured threshold.
use std::path::Path;

use crate::detection::domain::hand_detector::HandDetector;
use crate::detection::domain::hand_landmarks::HandLandmarkSet;
use crate::shared::constants::{DEFAULT_HAND_MODEL_INPUT_SIZE, HAND_LANDMARK_COUNT};
use crate::shared::frame::Frame;
use crate::shared::startup_error::StartupError;
use crate::shared::tensor_layout::{batch, InputGeometry, TensorLayout};

/// Values per landmark in the model output (x, y, z).
const VALUES_PER_LANDMARK: usize = 3;

/// Hand landmark detector backed by an ONNX Runtime session.
pub struct OnnxHandDetector {
    session: ort::session::Session,
    min_confidence: f64,
    layout: TensorLayout,
    input_size: u32,
}

impl OnnxHandDetector {
    /// Load a hand landmark ONNX model.
    ///
    /// The input resolution and layout are read from the model's input shape.
    /// Falls back to 224 NHWC if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, min_confidence: f64) -> Result<Self, StartupError> {
        let session = ort::session::Session::builder()
            .map_err(|e| StartupError::model_load(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| StartupError::model_load(model_path, e))?;

        let geometry = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                InputGeometry::from_shape(shape)
            } else {
                None
            }
        });
        let (input_size, layout) = square_input(geometry)?;

        log::info!(
            "Loaded hand model {} ({input_size}x{input_size}, {layout:?})",
            model_path.display()
        );

        Ok(Self {
            session,
            min_confidence,
            layout,
            input_size,
        })
    }
}

/// Input side length and layout of a landmark model.
///
/// Landmarks are normalized by a single side length, so a model declaring
/// different fixed height and width is rejected.
fn square_input(geometry: Option<InputGeometry>) -> Result<(u32, TensorLayout), StartupError> {
    let Some(g) = geometry else {
        return Ok((DEFAULT_HAND_MODEL_INPUT_SIZE, TensorLayout::Nhwc));
    };
    match (g.height, g.width) {
        (Some(h), Some(w)) if h != w => Err(StartupError::ShapeMismatch {
            expected: "square hand model input (height == width)".to_string(),
            configured: format!("{h}x{w}"),
        }),
        (h, w) => Ok((h.or(w).unwrap_or(DEFAULT_HAND_MODEL_INPUT_SIZE), g.layout)),
    }
}

impl HandDetector for OnnxHandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandLandmarkSet>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Err(format!(
                "cannot run hand detection on a {}x{} frame",
                frame.width(),
                frame.height()
            )
            .into());
        }

        // 1. Preprocess: stretch to the model input, normalize to [0,1]
        let input_tensor = batch(preprocess(frame, self.input_size), self.layout);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Outputs: landmarks [1, 63] in input pixels, hand presence [1, 1]
        if outputs.len() < 2 {
            return Err(format!(
                "hand landmark model expected 2 outputs, got {}",
                outputs.len()
            )
            .into());
        }
        let landmarks = outputs[0].try_extract_array::<f32>()?;
        let presence = outputs[1].try_extract_array::<f32>()?;
        let landmark_data = landmarks.as_slice().ok_or("Cannot get landmark slice")?;
        let presence_data = presence.as_slice().ok_or("Cannot get presence slice")?;

        let score = *presence_data.first().ok_or("Empty hand presence output")? as f64;
        if score < self.min_confidence {
            log::debug!("Hand presence {score:.3} below threshold");
            return Ok(Vec::new());
        }

        Ok(vec![decode_landmarks(landmark_data, self.input_size)?])
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` and normalize to [0,1] HWC float32.
///
/// Each axis is scaled independently, so landmark coordinates divided by
/// `size` are already fractions of the original frame.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array3<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array3::<f32>::zeros((s, s, 3));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[y, x, c]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

fn decode_landmarks(data: &[f32], input_size: u32) -> Result<HandLandmarkSet, String> {
    let needed = HAND_LANDMARK_COUNT * VALUES_PER_LANDMARK;
    if data.len() < needed {
        return Err(format!(
            "hand landmark output has {} values, expected {needed}",
            data.len()
        ));
    }

    let size = input_size as f64;
    let points = data[..needed]
        .chunks_exact(VALUES_PER_LANDMARK)
        .map(|p| (p[0] as f64 / size, p[1] as f64 / size))
        .collect();
    Ok(HandLandmarkSet::new(points))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
