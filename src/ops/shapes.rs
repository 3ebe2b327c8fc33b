use image::Rgba;

use crate::canvas::PixelBuffer;
use crate::ops::brush::{thick_line, PaintMode};

/// Primitives committed on pointer release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Rect,
    Circle,
}

/// Normalized inclusive rectangle spanned by two corner points.
pub fn normalized_rect(a: (i32, i32), b: (i32, i32)) -> (i32, i32, i32, i32) {
    (a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
}

/// Center (midpoint) and radius (half the distance) of the circle spanned
/// by a drag from `a` to `b`.
pub fn circle_from_drag(a: (i32, i32), b: (i32, i32)) -> ((f32, f32), f32) {
    let center = ((a.0 + b.0) as f32 / 2.0, (a.1 + b.1) as f32 / 2.0);
    let (dx, dy) = ((b.0 - a.0) as f32, (b.1 - a.1) as f32);
    (center, (dx * dx + dy * dy).sqrt() / 2.0)
}

/// 1px unfilled outline of the rectangle spanned by `a` and `b`.
pub fn draw_rect_outline(buf: &mut PixelBuffer, a: (i32, i32), b: (i32, i32), color: Rgba<u8>) {
    let (x0, y0, x1, y1) = normalized_rect(a, b);
    for x in x0..=x1 {
        buf.set(x, y0, color);
        buf.set(x, y1, color);
    }
    for y in y0..=y1 {
        buf.set(x0, y, color);
        buf.set(x1, y, color);
    }
}

/// 1px unfilled circle outline (midpoint algorithm).
pub fn draw_circle_outline(buf: &mut PixelBuffer, center: (i32, i32), radius: i32, color: Rgba<u8>) {
    let (cx, cy) = center;
    if radius <= 0 {
        buf.set(cx, cy, color);
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            buf.set(cx + px, cy + py, color);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Rasterize one primitive into a fresh transparent buffer of the canvas
/// size. The same buffer serves as the drag preview and, composited onto
/// the layer, as the committed result.
pub fn rasterize_shape(
    kind: ShapeKind,
    start: (i32, i32),
    end: (i32, i32),
    pen_width: f32,
    color: Rgba<u8>,
    width: u32,
    height: u32,
) -> PixelBuffer {
    let mut scratch = PixelBuffer::new(width, height);
    match kind {
        ShapeKind::Line => thick_line(&mut scratch, start, end, pen_width, color, PaintMode::Paint),
        ShapeKind::Rect => draw_rect_outline(&mut scratch, start, end, color),
        ShapeKind::Circle => {
            let (center, radius) = circle_from_drag(start, end);
            draw_circle_outline(
                &mut scratch,
                (center.0.round() as i32, center.1.round() as i32),
                radius.round() as i32,
                color,
            );
        }
    }
    scratch
}
