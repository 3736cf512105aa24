//! Normalized hand landmark points as produced by a region detector.

/// One detected hand: an ordered sequence of points whose coordinates are
/// fractions of the source image width and height.
///
/// Coordinates are clamped into `[0, 1]` on construction so that pixel
/// bounds derived from them always lie inside the image.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarkSet {
    points: Vec<(f64, f64)>,
}

impl HandLandmarkSet {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        let points = points
            .into_iter()
            .map(|(x, y)| (clamp_unit(x), clamp_unit(y)))
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Per-axis `(x_min, y_min, x_max, y_max)` over all points, or `None`
    /// for an empty set.
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let (&(x0, y0), rest) = self.points.split_first()?;
        Some(rest.iter().fold((x0, y0, x0, y0), |(x1, y1, x2, y2), &(x, y)| {
            (x1.min(x), y1.min(y), x2.max(x), y2.max(y))
        }))
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
