use image::Rgba;

use crate::canvas::PixelBuffer;

/// How a stroke writes into the target buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintMode {
    /// Alpha-composite the color over the existing pixel.
    Paint,
    /// Subtract the color from the existing pixel (eraser).
    Erase,
}

// ============================================================================
// COVERAGE MASK
// ============================================================================

/// Boolean mask over the bounding box of one stroke segment. Each covered
/// pixel is written exactly once, so overlapping stamps inside a segment
/// never double-blend translucent colors.
struct Coverage {
    min_x: i32,
    min_y: i32,
    w: usize,
    h: usize,
    mask: Vec<bool>,
}

impl Coverage {
    /// Mask over the given inclusive bounds, clipped to `buf`. `None` when
    /// nothing of it lands on the buffer.
    fn new(buf: &PixelBuffer, min: (i32, i32), max: (i32, i32)) -> Option<Self> {
        let min_x = min.0.max(0);
        let min_y = min.1.max(0);
        let max_x = max.0.min(buf.width() as i32 - 1);
        let max_y = max.1.min(buf.height() as i32 - 1);
        if min_x > max_x || min_y > max_y {
            return None;
        }
        let w = (max_x - min_x + 1) as usize;
        let h = (max_y - min_y + 1) as usize;
        Some(Self {
            min_x,
            min_y,
            w,
            h,
            mask: vec![false; w * h],
        })
    }

    #[inline]
    fn mark(&mut self, x: i32, y: i32) {
        let lx = x - self.min_x;
        let ly = y - self.min_y;
        if lx >= 0 && ly >= 0 && (lx as usize) < self.w && (ly as usize) < self.h {
            self.mask[ly as usize * self.w + lx as usize] = true;
        }
    }

    fn mark_where(&mut self, inside: impl Fn(i32, i32) -> bool) {
        for ly in 0..self.h {
            for lx in 0..self.w {
                let x = self.min_x + lx as i32;
                let y = self.min_y + ly as i32;
                if inside(x, y) {
                    self.mask[ly * self.w + lx] = true;
                }
            }
        }
    }

    fn apply(&self, buf: &mut PixelBuffer, color: Rgba<u8>, mode: PaintMode) {
        for ly in 0..self.h {
            for lx in 0..self.w {
                if !self.mask[ly * self.w + lx] {
                    continue;
                }
                let x = self.min_x + lx as i32;
                let y = self.min_y + ly as i32;
                match mode {
                    PaintMode::Paint => buf.blend(x, y, color),
                    PaintMode::Erase => buf.subtract(x, y, color),
                }
            }
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Visit every Bresenham step from `a` to `b`, both ends included.
pub fn bresenham(a: (i32, i32), b: (i32, i32), mut visit: impl FnMut(i32, i32)) {
    let (mut x0, mut y0) = a;
    let (x1, y1) = b;
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    loop {
        visit(x0, y0);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Squared distance from `p` to the segment `a`-`b`, and whether the
/// projection of `p` falls within the segment.
fn segment_distance_sq(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> (f32, bool) {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        let (ex, ey) = (p.0 - a.0, p.1 - a.1);
        return (ex * ex + ey * ey, true);
    }
    let t = ((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq;
    let cx = a.0 + t * dx;
    let cy = a.1 + t * dy;
    let (ex, ey) = (p.0 - cx, p.1 - cy);
    (ex * ex + ey * ey, (0.0..=1.0).contains(&t))
}

#[inline]
fn to_f32(p: (i32, i32)) -> (f32, f32) {
    (p.0 as f32, p.1 as f32)
}

/// Half-width used for round strokes; never below half a pixel so size 1
/// still marks the pixels the path crosses.
#[inline]
fn half_width(size: f32) -> f32 {
    (size / 2.0).max(0.5)
}

/// Integer edge length of a square stamp.
#[inline]
pub fn square_side(size: f32) -> i32 {
    (size.round() as i32).max(1)
}

// ============================================================================
// STROKES
// ============================================================================

/// Capless thick line of the given width. A zero-length segment becomes a
/// disc so a click still leaves a mark.
pub fn thick_line(buf: &mut PixelBuffer, a: (i32, i32), b: (i32, i32), width: f32, color: Rgba<u8>, mode: PaintMode) {
    let r = half_width(width);
    let pad = r.ceil() as i32;
    let Some(mut cov) = Coverage::new(
        buf,
        (a.0.min(b.0) - pad, a.1.min(b.1) - pad),
        (a.0.max(b.0) + pad, a.1.max(b.1) + pad),
    ) else {
        return;
    };
    let (fa, fb) = (to_f32(a), to_f32(b));
    let r_sq = r * r;
    cov.mark_where(|x, y| {
        let (d_sq, within) = segment_distance_sq((x as f32, y as f32), fa, fb);
        within && d_sq <= r_sq
    });
    cov.apply(buf, color, mode);
}

/// Round pen segment: a line of width `size` plus a disc of radius `size/2`
/// at `b`.
pub fn round_segment(buf: &mut PixelBuffer, a: (i32, i32), b: (i32, i32), size: f32, color: Rgba<u8>, mode: PaintMode) {
    let r = half_width(size);
    let pad = r.ceil() as i32;
    let Some(mut cov) = Coverage::new(
        buf,
        (a.0.min(b.0) - pad, a.1.min(b.1) - pad),
        (a.0.max(b.0) + pad, a.1.max(b.1) + pad),
    ) else {
        return;
    };
    let (fa, fb) = (to_f32(a), to_f32(b));
    let r_sq = r * r;
    cov.mark_where(|x, y| {
        let p = (x as f32, y as f32);
        let (d_sq, within) = segment_distance_sq(p, fa, fb);
        let (ex, ey) = (p.0 - fb.0, p.1 - fb.1);
        (within && d_sq <= r_sq) || ex * ex + ey * ey <= r_sq
    });
    cov.apply(buf, color, mode);
}

/// Square pen segment: stamp a `size`×`size` square centered on every
/// Bresenham step from `a` to `b`. Consecutive steps are at most one pixel
/// apart, so the stroke has no gaps at any slope.
pub fn square_segment(buf: &mut PixelBuffer, a: (i32, i32), b: (i32, i32), size: f32, color: Rgba<u8>, mode: PaintMode) {
    let side = square_side(size);
    let left = side / 2;
    let right = side - left - 1;
    let Some(mut cov) = Coverage::new(
        buf,
        (a.0.min(b.0) - left, a.1.min(b.1) - left),
        (a.0.max(b.0) + right, a.1.max(b.1) + right),
    ) else {
        return;
    };
    bresenham(a, b, |cx, cy| {
        for y in cy - left..=cy + right {
            for x in cx - left..=cx + right {
                cov.mark(x, y);
            }
        }
    });
    cov.apply(buf, color, mode);
}
