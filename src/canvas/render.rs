//! Backend-independent draw list for one canvas frame.

use crate::constants::style;
use crate::geometry::{PixelPoint, Point, Rect, Size, compute_placement, image_to_display};

use super::overlay::OverlayStore;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// A single drawing primitive, in viewport pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Fill the whole viewport
    Clear { color: Color },
    /// Scale the current image into `rect`
    DrawImage { rect: Rect },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f32,
        dashed: bool,
    },
    DrawText {
        text: String,
        position: PixelPoint,
        color: Color,
        size: f32,
    },
    DrawLine {
        from: PixelPoint,
        to: PixelPoint,
        color: Color,
        width: f32,
        dashed: bool,
    },
}

fn floor_point(p: Point) -> PixelPoint {
    PixelPoint::new(p.x.floor() as i32, p.y.floor() as i32)
}

/// Build the draw list for the current canvas state.
///
/// Order is background, image, overlay boxes with captions, the live drag
/// rectangle and finally the crosshair. Without an image only the
/// background and the crosshair are emitted.
pub fn render(
    image: Option<Size>,
    viewport: Size,
    overlay: &OverlayStore,
    gesture: Option<Rect>,
    pointer: Option<PixelPoint>,
) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Clear {
        color: style::BACKGROUND,
    }];

    if let Some(image) = image {
        let placement = compute_placement(image, viewport);
        if !placement.is_degenerate() {
            commands.push(DrawCommand::DrawImage {
                rect: placement.rect(),
            });

            for item in overlay.boxes() {
                let tl = floor_point(image_to_display(item.bbox.top_left(), &placement));
                let br = floor_point(image_to_display(item.bbox.bottom_right(), &placement));
                commands.push(DrawCommand::StrokeRect {
                    rect: Rect::new(tl.x, tl.y, br.x - tl.x, br.y - tl.y),
                    color: style::BOX_COLOR,
                    width: style::BOX_WIDTH,
                    dashed: false,
                });
                if let Some(text) = item.caption() {
                    let (dx, dy) = style::LABEL_OFFSET;
                    commands.push(DrawCommand::DrawText {
                        text,
                        position: PixelPoint::new(tl.x + dx, tl.y + dy),
                        color: style::LABEL_COLOR,
                        size: style::LABEL_SIZE,
                    });
                }
            }

            if let Some(rect) = gesture {
                let clipped = rect.intersect(&placement.rect());
                if !clipped.is_empty() {
                    commands.push(DrawCommand::StrokeRect {
                        rect: clipped,
                        color: style::GESTURE_COLOR,
                        width: style::GESTURE_WIDTH,
                        dashed: true,
                    });
                }
            }
        }
    }

    if let Some(pos) = pointer {
        push_crosshair(&mut commands, pos, viewport);
    }

    commands
}

fn push_crosshair(commands: &mut Vec<DrawCommand>, pos: PixelPoint, viewport: Size) {
    let right = i32::try_from(viewport.width).unwrap_or(i32::MAX);
    let bottom = i32::try_from(viewport.height).unwrap_or(i32::MAX);
    commands.push(DrawCommand::DrawLine {
        from: PixelPoint::new(0, pos.y),
        to: PixelPoint::new(right, pos.y),
        color: style::GUIDE_COLOR,
        width: style::GUIDE_WIDTH,
        dashed: true,
    });
    commands.push(DrawCommand::DrawLine {
        from: PixelPoint::new(pos.x, 0),
        to: PixelPoint::new(pos.x, bottom),
        color: style::GUIDE_COLOR,
        width: style::GUIDE_WIDTH,
        dashed: true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::OverlayBox;
    use crate::geometry::PixelBox;

    fn store_with(boxes: Vec<OverlayBox>) -> OverlayStore {
        let mut store = OverlayStore::new();
        store.set_boxes(boxes);
        store
    }

    #[test]
    fn test_empty_canvas_only_clears() {
        let cmds = render(None, Size::new(800, 480), &OverlayStore::new(), None, None);
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], DrawCommand::Clear { .. }));
    }

    #[test]
    fn test_image_drawn_into_placement() {
        let cmds = render(
            Some(Size::new(640, 480)),
            Size::new(800, 480),
            &OverlayStore::new(),
            None,
            None,
        );
        assert_eq!(
            cmds[1],
            DrawCommand::DrawImage {
                rect: Rect::new(80, 0, 640, 480)
            }
        );
    }

    #[test]
    fn test_overlay_mapped_to_display() {
        // 1280x960 shown at half size in 640x480
        let store = store_with(vec![OverlayBox::detection(
            PixelBox::new(100.0, 200.0, 301.0, 400.0),
            "cat",
            0.9,
        )]);
        let cmds = render(
            Some(Size::new(1280, 960)),
            Size::new(640, 480),
            &store,
            None,
            None,
        );

        assert_eq!(
            cmds[2],
            DrawCommand::StrokeRect {
                rect: Rect::new(50, 100, 100, 100),
                color: style::BOX_COLOR,
                width: style::BOX_WIDTH,
                dashed: false,
            }
        );
        assert_eq!(
            cmds[3],
            DrawCommand::DrawText {
                text: "cat [0.90]".into(),
                position: PixelPoint::new(54, 116),
                color: style::LABEL_COLOR,
                size: style::LABEL_SIZE,
            }
        );
    }

    #[test]
    fn test_gesture_clipped_to_image() {
        let cmds = render(
            Some(Size::new(640, 480)),
            Size::new(800, 480),
            &OverlayStore::new(),
            Some(Rect::new(0, 10, 200, 50)),
            None,
        );
        let gesture = cmds
            .iter()
            .find_map(|c| match c {
                DrawCommand::StrokeRect {
                    rect, dashed: true, ..
                } => Some(*rect),
                _ => None,
            })
            .unwrap();
        assert_eq!(gesture, Rect::new(80, 10, 120, 50));
    }

    #[test]
    fn test_crosshair_spans_viewport_and_is_last() {
        let cmds = render(
            Some(Size::new(640, 480)),
            Size::new(800, 480),
            &OverlayStore::new(),
            None,
            Some(PixelPoint::new(10, 20)),
        );
        let n = cmds.len();
        assert_eq!(
            cmds[n - 2],
            DrawCommand::DrawLine {
                from: PixelPoint::new(0, 20),
                to: PixelPoint::new(800, 20),
                color: style::GUIDE_COLOR,
                width: style::GUIDE_WIDTH,
                dashed: true,
            }
        );
        assert!(matches!(
            cmds[n - 1],
            DrawCommand::DrawLine { from, .. } if from == PixelPoint::new(10, 0)
        ));
    }

    #[test]
    fn test_degenerate_viewport_skips_image() {
        let store = store_with(vec![OverlayBox::ground_truth(PixelBox::default(), None)]);
        let cmds = render(Some(Size::new(640, 480)), Size::new(0, 0), &store, None, None);
        assert_eq!(cmds.len(), 1);
    }
}
