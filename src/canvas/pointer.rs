//! Crosshair guide following the cursor.

use crate::geometry::PixelPoint;

/// Last known pointer position inside the viewport, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerGuide {
    position: Option<PixelPoint>,
}

impl PointerGuide {
    pub fn track(&mut self, position: PixelPoint) {
        self.position = Some(position);
    }

    pub fn clear(&mut self) {
        self.position = None;
    }

    pub fn position(&self) -> Option<PixelPoint> {
        self.position
    }
}
