//! Geometry and normalization of a detected hand region.
//!
//! `landmarks → bounding box → crop → aspect-preserving pad-resize → [0,1] tensor`.
//! All functions here are pure and deterministic.

use ndarray::{s, Array3};

use crate::detection::domain::hand_landmarks::HandLandmarkSet;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::{Frame, CHANNELS};

/// Fixed-size `[height, width, 3]` float tensor with values in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedTensor {
    data: Array3<f32>,
}

impl NormalizedTensor {
    pub fn width(&self) -> u32 {
        self.data.shape()[1] as u32
    }

    pub fn height(&self) -> u32 {
        self.data.shape()[0] as u32
    }

    pub fn as_array(&self) -> &Array3<f32> {
        &self.data
    }
}

/// Pixel bounding box of a landmark set in a `width × height` image.
///
/// Takes the per-axis min/max of the normalized points, scales by the image
/// size and truncates. No margin is added. An empty set yields a zero-area
/// box at the origin.
pub fn bounding_box(landmarks: &HandLandmarkSet, width: u32, height: u32) -> BoundingBox {
    let Some((x1, y1, x2, y2)) = landmarks.extent() else {
        return BoundingBox::new(0, 0, 0, 0);
    };
    let w = width as f64;
    let h = height as f64;
    BoundingBox::new(
        (x1 * w) as u32,
        (y1 * h) as u32,
        (x2 * w) as u32,
        (y2 * h) as u32,
    )
}

/// Copies the pixels inside `bbox` (clamped to the frame) into a new frame.
///
/// A degenerate box produces an empty frame (zero width or height).
pub fn crop(frame: &Frame, bbox: &BoundingBox) -> Frame {
    let b = bbox.clamp_to(frame.width(), frame.height());
    if b.is_degenerate() {
        return Frame::new(Vec::new(), b.width(), b.height());
    }

    let src = frame.as_ndarray();
    let region = src.slice(s![
        b.y_min as usize..b.y_max as usize,
        b.x_min as usize..b.x_max as usize,
        ..
    ]);
    Frame::new(region.iter().copied().collect(), b.width(), b.height())
}

/// Size of a `src_w × src_h` image scaled by
/// `min(target_w / src_w, target_h / src_h)`, floored per axis.
///
/// Computed in integers so the limiting axis lands exactly on the target.
/// Neither side collapses below one pixel.
pub fn scaled_size(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let (sw, sh) = (src_w.max(1) as u64, src_h.max(1) as u64);
    let (tw, th) = (target_w as u64, target_h as u64);
    if tw * sh <= th * sw {
        (target_w, ((sh * tw / sw) as u32).clamp(1, target_h.max(1)))
    } else {
        (((sw * th / sh) as u32).clamp(1, target_w.max(1)), target_h)
    }
}

/// Aspect-preserving resize onto a zero-filled `target_w × target_h` canvas.
///
/// The image is scaled by a single uniform factor and centered with
/// floor-divided offsets. Canvas pixels outside the pasted image stay zero.
/// An image already at the target size is returned unchanged.
pub fn resize_with_padding(image: &Frame, target_w: u32, target_h: u32) -> Frame {
    let mut canvas = Frame::zeroed(target_w, target_h);
    if image.is_empty() || target_w == 0 || target_h == 0 {
        return canvas;
    }

    let (new_w, new_h) = scaled_size(image.width(), image.height(), target_w, target_h);
    let resized = resize_area(image, new_w, new_h);
    let x_offset = ((target_w - new_w) / 2) as usize;
    let y_offset = ((target_h - new_h) / 2) as usize;

    canvas
        .as_ndarray_mut()
        .slice_mut(s![
            y_offset..y_offset + new_h as usize,
            x_offset..x_offset + new_w as usize,
            ..
        ])
        .assign(&resized.as_ndarray());
    canvas
}

/// Scales 8-bit pixel values into `[0, 1]`.
pub fn to_tensor(image: &Frame) -> NormalizedTensor {
    NormalizedTensor {
        data: image.as_ndarray().mapv(|v| v as f32 / 255.0),
    }
}

// ---------------------------------------------------------------------------
// Area resampling
// ---------------------------------------------------------------------------

/// Resample by averaging the source area each destination pixel covers,
/// weighting partially covered source pixels by their overlap.
fn resize_area(src: &Frame, new_w: u32, new_h: u32) -> Frame {
    if src.width() == new_w && src.height() == new_h {
        return src.clone();
    }

    let rows = coverage(src.height() as usize, new_h as usize);
    let cols = coverage(src.width() as usize, new_w as usize);
    let pixels = src.as_ndarray();
    let mut out = Frame::zeroed(new_w, new_h);
    let mut dst = out.as_ndarray_mut();

    for (y, row_span) in rows.iter().enumerate() {
        for (x, col_span) in cols.iter().enumerate() {
            let mut acc = [0.0f64; CHANNELS];
            let mut total = 0.0f64;
            for &(sy, wy) in row_span {
                for &(sx, wx) in col_span {
                    let w = wy * wx;
                    total += w;
                    for (c, a) in acc.iter_mut().enumerate() {
                        *a += pixels[[sy, sx, c]] as f64 * w;
                    }
                }
            }
            for (c, a) in acc.iter().enumerate() {
                dst[[y, x, c]] = (a / total).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

/// For each destination index, the source indices it overlaps and the
/// length of each overlap.
fn coverage(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f64)>> {
    let step = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * step;
            let end = start + step;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|i| {
                    let overlap = end.min(i as f64 + 1.0) - start.max(i as f64);
                    (overlap > 0.0).then_some((i, overlap))
                })
                .collect()
        })
        .collect()
}
