use image::Rgba;

use crate::canvas::PixelBuffer;

/// Tolerance check for the bucket tool: Chebyshev distance over RGBA.
/// Fully transparent pixels match each other whatever their color channels
/// hold; transparent vs. non-transparent compares alpha only.
#[inline]
pub fn colors_match(pixel: Rgba<u8>, target: Rgba<u8>, tolerance: u8) -> bool {
    let tol = tolerance as i16;
    if target[3] == 0 && pixel[3] == 0 {
        return true;
    }
    if target[3] == 0 || pixel[3] == 0 {
        return (target[3] as i16 - pixel[3] as i16).abs() <= tol;
    }
    (0..4)
        .map(|c| (target[c] as i16 - pixel[c] as i16).abs())
        .max()
        .unwrap_or(0)
        <= tol
}

/// Mask of the 4-connected region around `(start_x, start_y)` whose pixels
/// match the start pixel within `tolerance`. `None` when the start is off
/// the buffer.
pub fn fill_region(
    buf: &PixelBuffer,
    start_x: i32,
    start_y: i32,
    tolerance: u8,
) -> Option<Vec<bool>> {
    if !buf.in_bounds(start_x, start_y) {
        return None;
    }
    let w = buf.width() as usize;
    let h = buf.height() as usize;
    let target = buf.get(start_x, start_y);

    // mask doubles as the visited set and the output
    let mut mask = vec![false; w * h];
    let seed = start_y as usize * w + start_x as usize;
    mask[seed] = true;

    let mut stack: Vec<usize> = Vec::with_capacity(4096);
    stack.push(seed);

    while let Some(idx) = stack.pop() {
        let x = idx % w;
        let y = idx / w;

        let mut visit = |nx: usize, ny: usize, stack: &mut Vec<usize>| {
            let n = ny * w + nx;
            if !mask[n] && colors_match(buf.get(nx as i32, ny as i32), target, tolerance) {
                mask[n] = true;
                stack.push(n);
            }
        };

        if x > 0 {
            visit(x - 1, y, &mut stack);
        }
        if x + 1 < w {
            visit(x + 1, y, &mut stack);
        }
        if y > 0 {
            visit(x, y - 1, &mut stack);
        }
        if y + 1 < h {
            visit(x, y + 1, &mut stack);
        }
    }

    Some(mask)
}

/// Flood fill the region under the start pixel with `color` (written as-is,
/// no blending). Returns the number of pixels written.
pub fn flood_fill(buf: &mut PixelBuffer, start_x: i32, start_y: i32, color: Rgba<u8>, tolerance: u8) -> usize {
    let Some(mask) = fill_region(buf, start_x, start_y, tolerance) else {
        return 0;
    };
    let w = buf.width() as usize;
    let mut filled = 0;
    for (idx, _) in mask.iter().enumerate().filter(|(_, m)| **m) {
        buf.set((idx % w) as i32, (idx / w) as i32, color);
        filled += 1;
    }
    filled
}
