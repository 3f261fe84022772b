//! Image-space corner boxes and normalized center boxes.

use serde::{Deserialize, Serialize};

use super::GeometryError;
use super::rect::Point;

/// A box in image pixels given by its corners, `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PixelBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from two corners given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x2, self.y2)
    }
}

/// A YOLO-style box: center and size as fractions of the image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub xc: f64,
    pub yc: f64,
    pub bw: f64,
    pub bh: f64,
}

impl NormalizedBox {
    pub const fn new(xc: f64, yc: f64, bw: f64, bh: f64) -> Self {
        Self { xc, yc, bw, bh }
    }

    /// True when all four values lie in `[0, 1]`. NaN is never in range.
    pub fn is_within_unit(&self) -> bool {
        [self.xc, self.yc, self.bw, self.bh]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }

    pub fn has_area(&self) -> bool {
        self.bw > 0.0 && self.bh > 0.0
    }
}

/// Convert an ordered image-space box into normalized label space.
///
/// The output is not clamped. Boxes reaching outside the image produce
/// values outside `[0, 1]` that the caller has to reject.
pub fn to_normalized(
    rect: &PixelBox,
    width: u32,
    height: u32,
) -> Result<NormalizedBox, GeometryError> {
    if width == 0 || height == 0 {
        return Err(GeometryError::UndefinedTransform {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
        });
    }
    debug_assert!(rect.x2 >= rect.x1 && rect.y2 >= rect.y1, "unordered corners: {rect:?}");

    let (w, h) = (f64::from(width), f64::from(height));
    Ok(NormalizedBox {
        xc: (rect.x1 + rect.x2) / (2.0 * w),
        yc: (rect.y1 + rect.y2) / (2.0 * h),
        bw: (rect.x2 - rect.x1) / w,
        bh: (rect.y2 - rect.y1) / h,
    })
}

/// Convert a normalized box back into image pixels.
pub fn to_image_space(nb: &NormalizedBox, width: u32, height: u32) -> PixelBox {
    let (w, h) = (f64::from(width), f64::from(height));
    let half_w = nb.bw / 2.0;
    let half_h = nb.bh / 2.0;
    PixelBox {
        x1: (nb.xc - half_w) * w,
        y1: (nb.yc - half_h) * h,
        x2: (nb.xc + half_w) * w,
        y2: (nb.yc + half_h) * h,
    }
}
