//! Sign classifier using ONNX Runtime via `ort`.
//!
//! The model's declared input and output shapes are checked against the
//! configured tensor size and label catalog when the session is created, so
//! a mismatched model never reaches the request path.
use std::path::Path;

use crate::classification::domain::classifier::Classifier;
use crate::imaging::domain::normalizer::NormalizedTensor;
use crate::shared::frame::CHANNELS;
use crate::shared::startup_error::StartupError;
use crate::shared::tensor_layout::{batch, InputGeometry, TensorLayout};

/// Classifier backed by an ONNX Runtime session (e.g. an exported Keras CNN).
pub struct OnnxClassifier {
    session: ort::session::Session,
    layout: TensorLayout,
    target_width: u32,
    target_height: u32,
}

impl OnnxClassifier {
    /// Load a classifier whose input must be `target_width × target_height × 3`
    /// and whose output must have `catalog_len` classes.
    pub fn new(
        model_path: &Path,
        target_width: u32,
        target_height: u32,
        catalog_len: usize,
    ) -> Result<Self, StartupError> {
        let session = ort::session::Session::builder()
            .map_err(|e| StartupError::model_load(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| StartupError::model_load(model_path, e))?;

        let input_shape = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                Some(shape.to_vec())
            } else {
                None
            }
        });
        let output_shape = session.outputs().first().and_then(|output| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = output.dtype() {
                Some(shape.to_vec())
            } else {
                None
            }
        });

        let layout = check_input_shape(input_shape.as_deref(), target_width, target_height)?;
        check_output_shape(output_shape.as_deref(), catalog_len)?;

        log::info!(
            "Loaded classifier {} ({target_width}x{target_height}, {layout:?}, {catalog_len} classes)",
            model_path.display()
        );

        Ok(Self {
            session,
            layout,
            target_width,
            target_height,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, tensor: &NormalizedTensor) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        if tensor.width() != self.target_width || tensor.height() != self.target_height {
            return Err(format!(
                "tensor is {}x{}, classifier expects {}x{}",
                tensor.width(),
                tensor.height(),
                self.target_width,
                self.target_height
            )
            .into());
        }

        let input_tensor = batch(tensor.as_array().clone(), self.layout);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Classifier produced no outputs".into());
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        let confidences: Vec<f32> = scores.iter().copied().collect();
        if confidences.is_empty() {
            return Err("Classifier produced an empty distribution".into());
        }
        Ok(confidences)
    }
}

/// Validates a rank-4 image input against the configured size and returns
/// its layout. Dynamic dimensions are accepted.
fn check_input_shape(
    shape: Option<&[i64]>,
    target_width: u32,
    target_height: u32,
) -> Result<TensorLayout, StartupError> {
    let configured = format!("[1, {target_height}, {target_width}, {CHANNELS}]");
    let mismatch = |expected: String| StartupError::ShapeMismatch {
        expected,
        configured: configured.clone(),
    };

    let Some(shape) = shape else {
        return Err(mismatch("a non-tensor input".into()));
    };
    let geometry = InputGeometry::from_shape(shape).ok_or_else(|| mismatch(format!("{shape:?}")))?;

    let matches = |declared: Option<u32>, wanted: u32| declared.map_or(true, |d| d == wanted);
    if matches(geometry.height, target_height)
        && matches(geometry.width, target_width)
        && matches(geometry.channels, CHANNELS as u32)
    {
        Ok(geometry.layout)
    } else {
        Err(mismatch(format!("{shape:?}")))
    }
}

fn check_output_shape(shape: Option<&[i64]>, catalog_len: usize) -> Result<(), StartupError> {
    match shape.and_then(|s| s.last().copied()) {
        Some(classes) if classes > 0 && classes as usize != catalog_len => {
            Err(StartupError::CatalogMismatch {
                outputs: classes as usize,
                labels: catalog_len,
            })
        }
        _ => Ok(()),
    }
}
