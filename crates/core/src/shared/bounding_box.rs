/// Axis-aligned pixel rectangle enclosing a detected hand.
///
/// Bounds are inclusive-exclusive when used for cropping: columns
/// `x_min..x_max` and rows `y_min..y_max`. No margin is added around the
/// landmark extent, and a zero-area box is a valid value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        debug_assert!(x_min <= x_max, "x_min must not exceed x_max");
        debug_assert!(y_min <= y_max, "y_min must not exceed y_max");
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Restricts the box to a `width × height` image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x_min = self.x_min.min(width);
        let y_min = self.y_min.min(height);
        Self::new(
            x_min,
            y_min,
            self.x_max.clamp(x_min, width),
            self.y_max.clamp(y_min, height),
        )
    }
}
