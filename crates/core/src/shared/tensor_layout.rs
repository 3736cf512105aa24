//! Image tensor layouts accepted by the ONNX adapters.

use ndarray::{Array3, Array4, Axis};

/// Memory order of a batched image tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[N, H, W, C]`, the Keras / TFLite convention.
    Nhwc,
    /// `[N, C, H, W]`, the PyTorch convention.
    Nchw,
}

/// Spatial geometry declared by a model input.
///
/// `None` dimensions are dynamic (declared as `-1` or `0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputGeometry {
    pub layout: TensorLayout,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub channels: Option<u32>,
}

impl InputGeometry {
    /// Interprets a rank-4 model input shape.
    ///
    /// A channel count of 3 in the last position selects NHWC, in the second
    /// position NCHW. When neither is conclusive NHWC is assumed.
    pub fn from_shape(shape: &[i64]) -> Option<Self> {
        if shape.len() != 4 {
            return None;
        }
        let dim = |d: i64| (d > 0).then_some(d as u32);
        if shape[1] == 3 && shape[3] != 3 {
            Some(Self {
                layout: TensorLayout::Nchw,
                height: dim(shape[2]),
                width: dim(shape[3]),
                channels: dim(shape[1]),
            })
        } else {
            Some(Self {
                layout: TensorLayout::Nhwc,
                height: dim(shape[1]),
                width: dim(shape[2]),
                channels: dim(shape[3]),
            })
        }
    }
}

/// Adds the batch axis and reorders an `[H, W, C]` tensor for `layout`.
pub fn batch(tensor: Array3<f32>, layout: TensorLayout) -> Array4<f32> {
    let batched = tensor.insert_axis(Axis(0));
    match layout {
        TensorLayout::Nhwc => batched,
        TensorLayout::Nchw => batched.permuted_axes([0, 3, 1, 2]).as_standard_layout().into_owned(),
    }
}
