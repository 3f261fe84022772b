//! Press-drag-release gesture that produces one normalized box.

use crate::geometry::{
    GeometryError, NormalizedBox, PixelBox, PixelPoint, Placement, Rect, clamp_to_display_rect,
    display_to_image, to_normalized,
};

/// Drag state. Both points are display pixels already clamped onto the
/// visible image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        anchor: PixelPoint,
        current: PixelPoint,
    },
}

/// Tracks one bounding-box drag at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragGesture {
    state: DragState,
}

impl DragGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Start a drag. A press while already dragging restarts from `pos`.
    pub fn press(&mut self, pos: PixelPoint, placement: &Placement) {
        let anchor = clamp_to_display_rect(pos, placement);
        log::trace!("Drag started at {anchor} (pointer {pos})");
        self.state = DragState::Dragging {
            anchor,
            current: anchor,
        };
    }

    /// Move the free corner. Returns true if a drag is in progress.
    pub fn drag_to(&mut self, pos: PixelPoint, placement: &Placement) -> bool {
        match &mut self.state {
            DragState::Dragging { current, .. } => {
                *current = clamp_to_display_rect(pos, placement);
                true
            }
            DragState::Idle => false,
        }
    }

    /// Finish the drag.
    ///
    /// Returns `None` when no drag was active. A drag whose corners share a
    /// row or a column yields [`GeometryError::DegenerateGeometry`].
    pub fn release(
        &mut self,
        pos: PixelPoint,
        placement: &Placement,
    ) -> Option<Result<NormalizedBox, GeometryError>> {
        let DragState::Dragging { anchor, .. } = self.state else {
            return None;
        };
        self.state = DragState::Idle;

        let current = clamp_to_display_rect(pos, placement);
        Some(finish(anchor, current, placement))
    }

    /// Drop the drag without emitting anything.
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::debug!("Drag cancelled");
        }
        self.state = DragState::Idle;
    }

    /// The rectangle to preview while dragging, clipped to the visible image.
    pub fn live_rect(&self, placement: &Placement) -> Option<Rect> {
        match self.state {
            DragState::Dragging { anchor, current } => {
                let rect = Rect::covering_cells(anchor, current).intersect(&placement.rect());
                (!rect.is_empty()).then_some(rect)
            }
            DragState::Idle => None,
        }
    }
}

/// Turn two clamped display corners into a normalized label box.
fn finish(
    anchor: PixelPoint,
    current: PixelPoint,
    placement: &Placement,
) -> Result<NormalizedBox, GeometryError> {
    let span = Rect::from_corners(anchor, current);
    if span.is_empty() {
        return Err(GeometryError::DegenerateGeometry {
            width: f64::from(span.width),
            height: f64::from(span.height),
        });
    }

    let selection = Rect::covering_cells(anchor, current).intersect(&placement.rect());
    if selection.is_empty() {
        return Err(GeometryError::DegenerateGeometry {
            width: f64::from(selection.width),
            height: f64::from(selection.height),
        });
    }

    let top_left = display_to_image(selection.top_left().to_point(), placement)?;
    let bottom_right = display_to_image(
        PixelPoint::new(selection.right(), selection.bottom()).to_point(),
        placement,
    )?;
    let bbox = PixelBox::from_corners(top_left, bottom_right);
    let normalized = to_normalized(&bbox, placement.image_width, placement.image_height)?;

    if !normalized.has_area() {
        return Err(GeometryError::DegenerateGeometry {
            width: bbox.width(),
            height: bbox.height(),
        });
    }
    debug_assert!(
        normalized.is_within_unit(),
        "selection {selection:?} left the image: {normalized:?}"
    );
    Ok(normalized)
}
