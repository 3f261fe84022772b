//! The annotation canvas: one image, its overlay boxes, a drag gesture and a
//! crosshair, projected into a resizable viewport.
//!
//! The canvas is passive. The host feeds it pointer events and resize
//! notifications and asks it for a draw list; finished boxes come back as
//! [`CanvasEvent`]s instead of callbacks.

mod gesture;
mod overlay;
mod pointer;
mod raster;
mod render;

pub use gesture::DragGesture;
pub use overlay::{OverlayBox, OverlayStore};
pub use pointer::PointerGuide;
pub use raster::{RenderError, load_font, rasterize};
pub use render::{Color, DrawCommand, render};

use std::sync::Arc;

use ab_glyph::FontArc;
use image::RgbaImage;

use crate::geometry::{NormalizedBox, PixelPoint, Placement, Size, compute_placement};

/// Output of the canvas towards its host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    /// A drag finished with a valid box, in normalized label space
    BoxFinalized(NormalizedBox),
}

/// Canvas state. Placement is derived from the image and viewport on demand.
#[derive(Debug, Clone)]
pub struct AnnotationCanvas {
    image: Option<Arc<RgbaImage>>,
    viewport: Size,
    overlay: OverlayStore,
    gesture: DragGesture,
    pointer: PointerGuide,
}

impl AnnotationCanvas {
    pub fn new(viewport: Size) -> Self {
        Self {
            image: None,
            viewport,
            overlay: OverlayStore::new(),
            gesture: DragGesture::new(),
            pointer: PointerGuide::default(),
        }
    }

    /// Show a different image. Any drag in progress belongs to the old one
    /// and is dropped.
    pub fn set_image(&mut self, image: Arc<RgbaImage>, boxes: Vec<OverlayBox>) {
        log::debug!("Canvas image set: {}x{}", image.width(), image.height());
        self.gesture.cancel();
        self.image = Some(image);
        self.overlay.set_boxes(boxes);
    }

    /// Swap in the next frame of a live stream.
    ///
    /// A drag survives only if the frame has the same dimensions, since its
    /// corners are stored in display pixels of the current placement.
    pub fn replace_frame(&mut self, frame: Arc<RgbaImage>, boxes: Vec<OverlayBox>) {
        let same_size = self
            .image
            .as_ref()
            .is_some_and(|old| old.dimensions() == frame.dimensions());
        if !same_size {
            self.gesture.cancel();
        }
        self.image = Some(frame);
        self.overlay.set_boxes(boxes);
    }

    pub fn clear_image(&mut self) {
        self.gesture.cancel();
        self.image = None;
        self.overlay.clear();
    }

    pub fn set_boxes(&mut self, boxes: Vec<OverlayBox>) {
        self.overlay.set_boxes(boxes);
    }

    pub fn boxes(&self) -> &[OverlayBox] {
        self.overlay.boxes()
    }

    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    pub fn image_size(&self) -> Option<Size> {
        self.image
            .as_ref()
            .map(|img| Size::new(img.width(), img.height()))
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Current placement, or `None` without an image.
    pub fn placement(&self) -> Option<Placement> {
        self.image_size()
            .map(|size| compute_placement(size, self.viewport))
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_active()
    }

    /// The viewport changed size; an unfinished drag is cancelled.
    pub fn on_resize(&mut self, viewport: Size) {
        if viewport != self.viewport {
            log::debug!("Canvas resized {} -> {}", self.viewport, viewport);
            self.gesture.cancel();
            self.viewport = viewport;
        }
    }

    /// Start a drag. Ignored without an image or while nothing is visible.
    pub fn on_pointer_down(&mut self, pos: PixelPoint) {
        self.pointer.track(pos);
        match self.placement() {
            Some(placement) if !placement.is_degenerate() => self.gesture.press(pos, &placement),
            _ => log::debug!("Press at {pos} ignored: no visible image"),
        }
    }

    pub fn on_pointer_move(&mut self, pos: PixelPoint) {
        self.pointer.track(pos);
        if let Some(placement) = self.placement() {
            self.gesture.drag_to(pos, &placement);
        }
    }

    /// Finish a drag. Degenerate drags are logged and produce no event.
    pub fn on_pointer_up(&mut self, pos: PixelPoint) -> Option<CanvasEvent> {
        self.pointer.track(pos);
        let Some(placement) = self.placement() else {
            self.gesture.cancel();
            return None;
        };
        match self.gesture.release(pos, &placement)? {
            Ok(nb) => {
                log::debug!(
                    "Box finalized: xc={:.4} yc={:.4} w={:.4} h={:.4}",
                    nb.xc,
                    nb.yc,
                    nb.bw,
                    nb.bh
                );
                Some(CanvasEvent::BoxFinalized(nb))
            }
            Err(e) => {
                log::debug!("Drag suppressed: {e}");
                None
            }
        }
    }

    /// The pointer left the canvas. Hides the crosshair; a drag keeps going.
    pub fn on_pointer_leave(&mut self) {
        self.pointer.clear();
    }

    pub fn cancel_gesture(&mut self) {
        self.gesture.cancel();
    }

    /// Draw list for the current state.
    pub fn render(&self) -> Vec<DrawCommand> {
        let gesture = self
            .placement()
            .and_then(|placement| self.gesture.live_rect(&placement));
        render(
            self.image_size(),
            self.viewport,
            &self.overlay,
            gesture,
            self.pointer.position(),
        )
    }

    /// Render the current state into pixels.
    pub fn rasterize(&self, font: Option<&FontArc>) -> Result<RgbaImage, RenderError> {
        rasterize(&self.render(), self.image.as_deref(), self.viewport, font)
    }
}

impl Default for AnnotationCanvas {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_VIEWPORT)
    }
}
