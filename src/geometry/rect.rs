//! Points, integer rectangles, clamping and intersection.

use std::fmt;
use std::str::FromStr;

use super::ParseGeometryError;

/// A pointer position in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The same position as a continuous point.
    pub fn to_point(self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y))
    }
}

impl fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for PixelPoint {
    type Err = ParseGeometryError;

    /// Parse `"X,Y"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseGeometryError::new(s, "X,Y");
        let (x, y) = s.split_once(',').ok_or_else(err)?;
        let x = x.trim().parse().map_err(|_| err())?;
        let y = y.trim().parse().map_err(|_| err())?;
        Ok(Self { x, y })
    }
}

/// A continuous 2D point, used for image-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned integer rectangle covering `[x, x + width) x [y, y + height)`.
///
/// A rectangle with a non-positive width or height is empty. Empty results
/// are ordinary values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle spanning two corner points, in any drag direction.
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// The pixel cells between and including two corner cells.
    pub fn covering_cells(a: PixelPoint, b: PixelPoint) -> Self {
        let r = Self::from_corners(a, b);
        Self::new(r.x, r.y, r.width + 1, r.height + 1)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    pub fn top_left(&self) -> PixelPoint {
        PixelPoint::new(self.x, self.y)
    }

    /// Check if a pixel cell lies inside the rectangle.
    pub fn contains(&self, p: PixelPoint) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Compute the intersection of two rectangles.
    ///
    /// Without overlap the result has zero width and height, anchored at the
    /// point where the overlap would have started.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return Rect::new(x1, y1, 0, 0);
        }
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }
}

/// Clamp a point onto the last cell of `rect` on each axis.
///
/// Both axes land in `[origin, origin + extent - 1]`. An empty rectangle
/// pins the point to its origin so the operation stays total.
pub fn clamp_point_to_rect(point: PixelPoint, rect: &Rect) -> PixelPoint {
    let max_x = (rect.right() - 1).max(rect.x);
    let max_y = (rect.bottom() - 1).max(rect.y);
    PixelPoint::new(
        point.x.max(rect.x).min(max_x),
        point.y.max(rect.y).min(max_y),
    )
}

/// Intersection of two rectangles; see [`Rect::intersect`].
pub fn intersect_rects(a: &Rect, b: &Rect) -> Rect {
    a.intersect(b)
}
