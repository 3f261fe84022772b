//! Coordinate spaces and the conversions between them.
//!
//! Three spaces are involved when labeling an image:
//! - **image space**: pixels of the original, unscaled frame
//! - **display space**: pixels inside the on-screen viewport after letterboxing
//! - **normalized label space**: center/size boxes scaled to `[0, 1]`
//!
//! Everything in this module is a pure function of its inputs. Placement is
//! recomputed on every use instead of being cached next to the image.

mod label_box;
mod rect;
mod transform;

pub use label_box::{NormalizedBox, PixelBox, to_image_space, to_normalized};
pub use rect::{PixelPoint, Point, Rect, clamp_point_to_rect, intersect_rects};
pub use transform::{
    Placement, Size, clamp_to_display_rect, compute_placement, display_to_image, image_to_display,
};

use thiserror::Error;

/// Failures of coordinate conversions.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    /// Inverse transform requested while the displayed image has no extent.
    #[error("transform undefined for a {width}x{height} display area")]
    UndefinedTransform {
        /// Displayed width in pixels
        width: i32,
        /// Displayed height in pixels
        height: i32,
    },

    /// A rectangle collapsed to zero width or height (single click, empty viewport).
    #[error("degenerate geometry: {width}x{height}")]
    DegenerateGeometry {
        /// Width of the collapsed rectangle
        width: f64,
        /// Height of the collapsed rectangle
        height: f64,
    },
}

/// Failure to parse a size or point from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse '{input}': expected {expected}")]
pub struct ParseGeometryError {
    input: String,
    expected: &'static str,
}

impl ParseGeometryError {
    pub(crate) fn new(input: &str, expected: &'static str) -> Self {
        Self {
            input: input.to_string(),
            expected,
        }
    }
}
