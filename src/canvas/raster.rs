//! Software execution of a draw list into an RGBA buffer.
//!
//! Shapes go through tiny-skia; captions are drawn afterwards with imageproc
//! since tiny-skia has no text support.

use std::path::Path;

use ab_glyph::FontArc;
use image::{Rgba, RgbaImage, imageops::FilterType};
use imageproc::drawing::draw_text_mut;
use thiserror::Error;
use tiny_skia::{
    ColorU8, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, StrokeDash, Transform,
};

use crate::constants::style;
use crate::geometry::{PixelPoint, Rect, Size};

use super::render::{Color, DrawCommand};

/// Rasterization failures.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot allocate a {0} pixel buffer")]
    Allocation(Size),

    #[error("draw list references an image but none was supplied")]
    MissingImage,
}

/// Fonts tried when no font is configured or the configured one fails.
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Helvetica.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn read_font(path: &Path) -> Option<FontArc> {
    let bytes = std::fs::read(path).ok()?;
    FontArc::try_from_vec(bytes).ok()
}

/// Find a TrueType font for captions.
///
/// The preferred path is tried first, then a list of common system fonts.
/// Returns `None` when nothing usable is installed; captions are then skipped.
pub fn load_font(preferred: Option<&Path>) -> Option<FontArc> {
    if let Some(path) = preferred {
        match read_font(path) {
            Some(font) => return Some(font),
            None => log::warn!("Cannot use font {}, trying system fonts", path.display()),
        }
    }

    let font = FALLBACK_FONTS
        .iter()
        .find_map(|candidate| read_font(Path::new(candidate)));
    if font.is_none() {
        log::warn!("No usable font found, captions will not be drawn");
    }
    font
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = false;
    paint
}

fn stroke_for(width: f32, dashed: bool) -> Stroke {
    let [on, off] = style::DASH_PATTERN;
    Stroke {
        width,
        dash: if dashed {
            StrokeDash::new(vec![on, off], 0.0)
        } else {
            None
        },
        ..Default::default()
    }
}

/// Premultiplied copy of `image` scaled to `rect`.
fn scaled_pixmap(image: &RgbaImage, rect: Rect) -> Option<Pixmap> {
    let width = u32::try_from(rect.width).ok()?;
    let height = u32::try_from(rect.height).ok()?;
    let scaled = image::imageops::resize(image, width, height, FilterType::Triangle);

    let mut pixmap = Pixmap::new(width, height)?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(scaled.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn stroke_rect(pixmap: &mut Pixmap, rect: Rect, color: Color, width: f32, dashed: bool) {
    // Center the pen on the pixel cells so a 1px line covers exactly one row
    let inset = 0.5;
    let Some(r) = tiny_skia::Rect::from_xywh(
        rect.x as f32 + inset,
        rect.y as f32 + inset,
        (rect.width as f32 - 1.0).max(0.0),
        (rect.height as f32 - 1.0).max(0.0),
    ) else {
        return;
    };
    let path = PathBuilder::from_rect(r);
    pixmap.stroke_path(
        &path,
        &paint_for(color),
        &stroke_for(width, dashed),
        Transform::identity(),
        None,
    );
}

fn stroke_line(
    pixmap: &mut Pixmap,
    from: PixelPoint,
    to: PixelPoint,
    color: Color,
    width: f32,
    dashed: bool,
) {
    let mut pb = PathBuilder::new();
    pb.move_to(from.x as f32 + 0.5, from.y as f32 + 0.5);
    pb.line_to(to.x as f32 + 0.5, to.y as f32 + 0.5);
    let Some(path) = pb.finish() else {
        return;
    };
    pixmap.stroke_path(
        &path,
        &paint_for(color),
        &stroke_for(width, dashed),
        Transform::identity(),
        None,
    );
}

/// Execute a draw list into a `viewport`-sized RGBA buffer.
///
/// `image` is the source for [`DrawCommand::DrawImage`]. Text commands are
/// skipped when `font` is `None`.
pub fn rasterize(
    commands: &[DrawCommand],
    image: Option<&RgbaImage>,
    viewport: Size,
    font: Option<&FontArc>,
) -> Result<RgbaImage, RenderError> {
    let mut pixmap =
        Pixmap::new(viewport.width, viewport.height).ok_or(RenderError::Allocation(viewport))?;
    let mut captions = Vec::new();

    for command in commands {
        match command {
            DrawCommand::Clear { color } => {
                pixmap.fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
            }
            DrawCommand::DrawImage { rect } => {
                let source = image.ok_or(RenderError::MissingImage)?;
                if let Some(scaled) = scaled_pixmap(source, *rect) {
                    pixmap.draw_pixmap(
                        rect.x,
                        rect.y,
                        scaled.as_ref(),
                        &PixmapPaint::default(),
                        Transform::identity(),
                        None,
                    );
                }
            }
            DrawCommand::StrokeRect {
                rect,
                color,
                width,
                dashed,
            } => stroke_rect(&mut pixmap, *rect, *color, *width, *dashed),
            DrawCommand::DrawLine {
                from,
                to,
                color,
                width,
                dashed,
            } => stroke_line(&mut pixmap, *from, *to, *color, *width, *dashed),
            DrawCommand::DrawText { .. } => captions.push(command),
        }
    }

    let mut output = RgbaImage::new(viewport.width, viewport.height);
    for (dst, src) in output.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }

    if let Some(font) = font {
        for command in captions {
            if let DrawCommand::DrawText {
                text,
                position,
                color,
                size,
            } = command
            {
                // Captions are anchored at their baseline; imageproc wants the top edge
                let top = position.y - size.round() as i32;
                draw_text_mut(
                    &mut output,
                    Rgba([color.r, color.g, color.b, color.a]),
                    position.x,
                    top,
                    *size,
                    font,
                    text,
                );
            }
        }
    }

    Ok(output)
}
