//! Boxes drawn on top of the displayed image.

use crate::geometry::PixelBox;

/// A detection or ground-truth box in image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
    /// Box corners in image space
    pub bbox: PixelBox,
    /// Class name to print next to the box
    pub label: Option<String>,
    /// Detector confidence in `[0, 1]`; absent for ground truth
    pub confidence: Option<f32>,
}

impl OverlayBox {
    /// A detector result.
    pub fn detection(bbox: PixelBox, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            label: Some(label.into()),
            confidence: Some(confidence),
        }
    }

    /// A box loaded from a label file.
    pub fn ground_truth(bbox: PixelBox, label: Option<String>) -> Self {
        Self {
            bbox,
            label,
            confidence: None,
        }
    }

    /// Caption text, if the box carries a label.
    pub fn caption(&self) -> Option<String> {
        let label = self.label.as_deref()?;
        Some(match self.confidence {
            Some(conf) => format!("{label} [{conf:.2}]"),
            None => label.to_string(),
        })
    }
}

/// The set of boxes currently shown.
///
/// Every update replaces the whole set: detector results arrive as complete
/// batches and ground truth is reloaded whenever the image changes.
#[derive(Debug, Clone, Default)]
pub struct OverlayStore {
    boxes: Vec<OverlayBox>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the overlay set.
    pub fn set_boxes(&mut self, boxes: Vec<OverlayBox>) {
        log::trace!("Overlay replaced: {} -> {} boxes", self.boxes.len(), boxes.len());
        self.boxes = boxes;
    }

    pub fn boxes(&self) -> &[OverlayBox] {
        &self.boxes
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}
