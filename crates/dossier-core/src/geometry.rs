/// Bounding box with top-left origin coordinate system.
///
/// Used for OCR word boxes in rasterized-image pixel space, where the origin
/// sits at the top-left corner (matching what OCR engines report):
/// - `x0`: left edge
/// - `top`: top edge (distance from top of image)
/// - `x1`: right edge
/// - `bottom`: bottom edge (distance from top of image)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Vertical center of the bounding box.
    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}
