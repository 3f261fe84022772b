//! Letterboxed placement of an image inside a viewport, and the mappings
//! between image space and display space.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::rect::{PixelPoint, Point, Rect, clamp_point_to_rect};
use super::{GeometryError, ParseGeometryError};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = ParseGeometryError;

    /// Parse `"WIDTHxHEIGHT"`, e.g. `"800x600"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseGeometryError::new(s, "WIDTHxHEIGHT");
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(err)?;
        let width = w.trim().parse().map_err(|_| err())?;
        let height = h.trim().parse().map_err(|_| err())?;
        Ok(Self { width, height })
    }
}

/// Where a scaled image sits inside the viewport.
///
/// The displayed rectangle is `[offset_x, offset_x + width) x [offset_y, offset_y + height)`.
/// The source image dimensions travel with the placement so that both
/// directions of the transform can be computed from it alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub offset_x: i32,
    pub offset_y: i32,
    /// Displayed width in pixels
    pub width: i32,
    /// Displayed height in pixels
    pub height: i32,
    /// Source image width in pixels
    pub image_width: u32,
    /// Source image height in pixels
    pub image_height: u32,
}

impl Placement {
    /// The all-zero placement used when the image or the viewport has no area.
    pub fn degenerate(image: Size) -> Self {
        Self {
            image_width: image.width,
            image_height: image.height,
            ..Self::default()
        }
    }

    /// The displayed image rectangle in viewport pixels.
    pub fn rect(&self) -> Rect {
        Rect::new(self.offset_x, self.offset_y, self.width, self.height)
    }

    /// True when nothing of the image is visible.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0 || self.image_width == 0 || self.image_height == 0
    }

    /// Display pixels per image pixel on each axis.
    pub fn scale(&self) -> (f64, f64) {
        if self.is_degenerate() {
            return (0.0, 0.0);
        }
        (
            f64::from(self.width) / f64::from(self.image_width),
            f64::from(self.height) / f64::from(self.image_height),
        )
    }
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Fit an image into a viewport, preserving aspect ratio, centered.
///
/// `s = min(VW / W, VH / H)`, the displayed size is `round(W * s) x round(H * s)`
/// and the offsets split the remaining padding with the odd pixel going to
/// the right/bottom.
pub fn compute_placement(image: Size, viewport: Size) -> Placement {
    if image.is_empty() || viewport.is_empty() {
        return Placement::degenerate(image);
    }

    let (w, h) = (f64::from(image.width), f64::from(image.height));
    let (vw, vh) = (to_i32(viewport.width), to_i32(viewport.height));
    let scale = (f64::from(vw) / w).min(f64::from(vh) / h);

    let width = ((w * scale).round() as i32).min(vw);
    let height = ((h * scale).round() as i32).min(vh);

    Placement {
        offset_x: (vw - width) / 2,
        offset_y: (vh - height) / 2,
        width,
        height,
        image_width: image.width,
        image_height: image.height,
    }
}

/// Map an image-space point into viewport pixels.
///
/// Only used to draw overlays; stored boxes are never rewritten.
pub fn image_to_display(point: Point, placement: &Placement) -> Point {
    let (sx, sy) = placement.scale();
    Point::new(
        f64::from(placement.offset_x) + point.x * sx,
        f64::from(placement.offset_y) + point.y * sy,
    )
}

/// Map a viewport point back into image space.
///
/// Fails with [`GeometryError::UndefinedTransform`] when the displayed image
/// has no extent. The product is taken before the division so that the
/// displayed edges map exactly onto `0` and the image size.
pub fn display_to_image(point: Point, placement: &Placement) -> Result<Point, GeometryError> {
    if placement.is_degenerate() {
        return Err(GeometryError::UndefinedTransform {
            width: placement.width,
            height: placement.height,
        });
    }

    let dx = point.x - f64::from(placement.offset_x);
    let dy = point.y - f64::from(placement.offset_y);
    Ok(Point::new(
        dx * f64::from(placement.image_width) / f64::from(placement.width),
        dy * f64::from(placement.image_height) / f64::from(placement.height),
    ))
}

/// Keep a pointer position on the visible part of the image.
pub fn clamp_to_display_rect(point: PixelPoint, placement: &Placement) -> PixelPoint {
    clamp_point_to_rect(point, &placement.rect())
}
