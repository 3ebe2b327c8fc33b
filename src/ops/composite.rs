use rayon::prelude::*;

use crate::canvas::{blend_over, Layer, PixelBuffer, TRANSPARENT};

/// A transient raster (primitive-shape preview) drawn on top of one layer's
/// content before that layer's opacity is applied.
#[derive(Clone, Copy)]
pub struct Overlay<'a> {
    pub layer_index: usize,
    pub pixels: &'a PixelBuffer,
}

/// Flattens an ordered layer list into a single buffer.
///
/// The output buffer is kept between calls and only reallocated when the
/// canvas size changes.
pub struct CompositeEngine {
    output: PixelBuffer,
}

impl CompositeEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            output: PixelBuffer::new(width, height),
        }
    }

    /// Compose `layers` back-to-front (index 0 at the bottom) into the
    /// output buffer. Invisible layers are skipped; locked layers render
    /// like any other.
    pub fn compose(&mut self, layers: &[Layer], width: u32, height: u32, overlay: Option<Overlay<'_>>) -> &PixelBuffer {
        if self.output.width() != width.max(1) || self.output.height() != height.max(1) {
            self.output = PixelBuffer::new(width, height);
        }
        let w = self.output.width() as usize;

        self.output
            .as_raw_mut()
            .par_chunks_mut(w * 4)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as i32;
                for x in 0..w {
                    let px = composite_pixel(layers, overlay, x as i32, y);
                    row[x * 4..x * 4 + 4].copy_from_slice(&px.0);
                }
            });

        &self.output
    }

    /// Last composed image.
    pub fn output(&self) -> &PixelBuffer {
        &self.output
    }
}

fn composite_pixel(layers: &[Layer], overlay: Option<Overlay<'_>>, x: i32, y: i32) -> image::Rgba<u8> {
    // Skip everything beneath the topmost fully opaque pixel of a layer at
    // full opacity.
    let mut start = 0;
    for (idx, layer) in layers.iter().enumerate().rev() {
        if layer.visible && layer.opacity >= 1.0 && layer.pixels.get(x, y)[3] == 255 {
            start = idx;
            break;
        }
    }

    let mut acc = TRANSPARENT;
    for (idx, layer) in layers.iter().enumerate().skip(start) {
        if !layer.visible {
            continue;
        }
        let mut top = layer.pixels.get(x, y);
        if let Some(o) = overlay.filter(|o| o.layer_index == idx) {
            top = blend_over(top, o.pixels.get(x, y), 1.0);
        }
        acc = blend_over(acc, top, layer.opacity);
    }
    acc
}

/// Composited color of a single pixel, as `compose` would produce it.
pub fn sample_composite(layers: &[Layer], x: i32, y: i32) -> image::Rgba<u8> {
    composite_pixel(layers, None, x, y)
}

/// Stateless convenience: compose into a new buffer.
pub fn flatten(layers: &[Layer], width: u32, height: u32) -> PixelBuffer {
    let mut engine = CompositeEngine::new(width, height);
    engine.compose(layers, width, height, None);
    engine.output
}

/// Composite `image` over an opaque background color, dropping alpha.
pub fn flatten_onto(image: &PixelBuffer, background: image::Rgba<u8>) -> image::RgbImage {
    let mut out = image::RgbImage::new(image.width(), image.height());
    for (x, y, px) in out.enumerate_pixels_mut() {
        let c = blend_over(background, image.get(x as i32, y as i32), 1.0);
        *px = image::Rgb([c[0], c[1], c[2]]);
    }
    out
}
