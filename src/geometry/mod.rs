//! Box representations and pairwise geometry.
//!
//! [`BBox`] is the canonical corner form `(x1, y1, x2, y2)` used from decoding
//! onward; [`CenterBox`] is the center form `(cx, cy, h, w)` emitted by the
//! detector head. Both are plain `Copy` values with exact conversions.

pub mod iou;

pub use iou::{intersection_area, iou, union_area};

/// Axis-aligned box in corner form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
}

/// Axis-aligned box in center form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CenterBox {
    /// Center x coordinate.
    pub cx: f32,
    /// Center y coordinate.
    pub cy: f32,
    /// Box height.
    pub h: f32,
    /// Box width.
    pub w: f32,
}

impl BBox {
    /// Creates a box from its corners.
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Horizontal extent; negative for a malformed box.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Vertical extent; negative for a malformed box.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area clamped at zero for degenerate or malformed boxes.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Returns true when the box encloses no area.
    pub fn is_degenerate(&self) -> bool {
        self.area() <= 0.0
    }

    /// Scales x coordinates by `sx` and y coordinates by `sy`.
    pub fn scale(self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }

    /// Converts to center form.
    pub fn to_center(self) -> CenterBox {
        CenterBox {
            cx: (self.x1 + self.x2) * 0.5,
            cy: (self.y1 + self.y2) * 0.5,
            h: self.y2 - self.y1,
            w: self.x2 - self.x1,
        }
    }

    /// Returns the corners as `[x1, y1, x2, y2]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl CenterBox {
    /// Creates a box from its center and extent.
    pub const fn new(cx: f32, cy: f32, h: f32, w: f32) -> Self {
        Self { cx, cy, h, w }
    }

    /// Converts to corner form.
    ///
    /// For non-negative `h` and `w` the result satisfies `x1 <= x2` and
    /// `y1 <= y2`.
    pub fn to_corners(self) -> BBox {
        let half_w = self.w * 0.5;
        let half_h = self.h * 0.5;
        BBox {
            x1: self.cx - half_w,
            y1: self.cy - half_h,
            x2: self.cx + half_w,
            y2: self.cy + half_h,
        }
    }
}

impl From<CenterBox> for BBox {
    fn from(c: CenterBox) -> Self {
        c.to_corners()
    }
}

impl From<BBox> for CenterBox {
    fn from(b: BBox) -> Self {
        b.to_center()
    }
}
