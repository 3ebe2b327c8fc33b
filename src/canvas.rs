use image::{Rgba, RgbaImage};
use uuid::Uuid;

// ============================================================================
// COLORS
// ============================================================================

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Straight-alpha "over" compositing of `top` onto `base`.
/// `opacity` scales the top pixel's alpha before blending.
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    // Fast path: nothing to blend
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }

    // Fast path: fully opaque top pixel at full opacity just overwrites
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.min(1.0);
    let top_a = (top[3] as f32 / 255.0) * opacity;
    let base_a = base[3] as f32 / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let channel = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let c = (t * top_a + b * base_a * (1.0 - top_a)) / out_a;
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(top[0], base[0]),
        channel(top[1], base[1]),
        channel(top[2], base[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Subtractive blend used by the eraser (ONE/ONE subtract): every channel
/// of `base`, alpha included, is reduced by the raw matching channel of
/// `top`, saturating at zero. Opaque white therefore clears the pixel and a
/// top alpha of `a` removes exactly `a` from the base alpha.
pub fn blend_subtract(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    Rgba([
        base[0].saturating_sub(top[0]),
        base[1].saturating_sub(top[1]),
        base[2].saturating_sub(top[2]),
        base[3].saturating_sub(top[3]),
    ])
}

// ============================================================================
// PIXEL BUFFER – contiguous RGBA8 raster
// ============================================================================

/// A fixed-size grid of straight-alpha RGBA8 pixels.
///
/// Rows are stored **top-down**: row 0 is the top edge of the image, the same
/// orientation the `image` crate uses for PNG/JPEG. Buffers coming from a
/// bottom-up source (GPU render targets, BMP-style dumps) must go through
/// [`PixelBuffer::from_bottom_up`] / [`PixelBuffer::to_bottom_up`], which are
/// the only places a vertical flip happens.
///
/// Out-of-range writes are ignored and out-of-range reads return
/// [`TRANSPARENT`].
#[derive(Clone)]
pub struct PixelBuffer {
    pixels: RgbaImage,
}

impl PixelBuffer {
    /// Create a fully transparent buffer. Zero dimensions are bumped to 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let mut buf = Self::new(width, height);
        if color != TRANSPARENT {
            buf.clear(color);
        }
        buf
    }

    pub fn from_rgba_image(pixels: RgbaImage) -> Self {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Self::new(1, 1);
        }
        Self { pixels }
    }

    /// Build from a tightly packed RGBA buffer whose first row is the
    /// *bottom* of the image.
    pub fn from_bottom_up(width: u32, height: u32, data: &[u8]) -> Option<Self> {
        let row = width as usize * 4;
        if width == 0 || height == 0 || data.len() != row * height as usize {
            return None;
        }
        let mut flipped = Vec::with_capacity(data.len());
        for src_row in data.chunks_exact(row).rev() {
            flipped.extend_from_slice(src_row);
        }
        RgbaImage::from_raw(width, height, flipped).map(|pixels| Self { pixels })
    }

    /// Tightly packed RGBA bytes with the bottom row first.
    pub fn to_bottom_up(&self) -> Vec<u8> {
        let row = self.pixels.width() as usize * 4;
        let mut out = Vec::with_capacity(self.pixels.as_raw().len());
        for src_row in self.pixels.as_raw().chunks_exact(row).rev() {
            out.extend_from_slice(src_row);
        }
        out
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    /// Read a pixel; anything outside the buffer is transparent.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Rgba<u8> {
        if !self.in_bounds(x, y) {
            return TRANSPARENT;
        }
        *self.pixels.get_pixel(x as u32, y as u32)
    }

    /// Read a pixel with coordinates clamped to the nearest edge.
    pub fn sample(&self, x: i32, y: i32) -> Rgba<u8> {
        let cx = x.clamp(0, self.width() as i32 - 1);
        let cy = y.clamp(0, self.height() as i32 - 1);
        *self.pixels.get_pixel(cx as u32, cy as u32)
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if self.in_bounds(x, y) {
            self.pixels.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Composite `color` over the existing pixel.
    #[inline]
    pub fn blend(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if self.in_bounds(x, y) {
            let px = self.pixels.get_pixel_mut(x as u32, y as u32);
            *px = blend_over(*px, color, 1.0);
        }
    }

    /// Subtract `color` from the existing pixel (eraser).
    #[inline]
    pub fn subtract(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if self.in_bounds(x, y) {
            let px = self.pixels.get_pixel_mut(x as u32, y as u32);
            *px = blend_subtract(*px, color);
        }
    }

    pub fn clear(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    /// Composite `source` over this buffer with its top-left corner at
    /// (`dest_x`, `dest_y`). `src_alpha` scales the source alpha; the parts of
    /// the source that fall outside this buffer are dropped.
    pub fn blit(&mut self, source: &PixelBuffer, dest_x: i32, dest_y: i32, src_alpha: f32) {
        if src_alpha <= 0.0 {
            return;
        }
        for sy in 0..source.height() as i32 {
            let dy = dest_y + sy;
            if dy < 0 || dy as u32 >= self.height() {
                continue;
            }
            for sx in 0..source.width() as i32 {
                let dx = dest_x + sx;
                if dx < 0 || dx as u32 >= self.width() {
                    continue;
                }
                let top = source.get(sx, sy);
                if top[3] == 0 {
                    continue;
                }
                let px = self.pixels.get_pixel_mut(dx as u32, dy as u32);
                *px = blend_over(*px, top, src_alpha);
            }
        }
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Number of pixels that are not fully transparent.
    pub fn count_opaque(&self) -> usize {
        self.pixels.pixels().filter(|p| p[3] != 0).count()
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self.as_raw() == other.as_raw()
    }
}

impl Eq for PixelBuffer {}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// LAYER
// ============================================================================

pub struct Layer {
    /// Stable identity, survives reordering and is never reused.
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    /// Locked layers reject every pixel mutation.
    pub locked: bool,
    /// 0.0..=1.0, scales the layer's alpha when compositing.
    pub opacity: f32,
    pub pixels: PixelBuffer,
}

impl Layer {
    pub fn new(name: impl Into<String>, width: u32, height: u32, fill_color: Rgba<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 1.0,
            pixels: PixelBuffer::new_filled(width, height, fill_color),
        }
    }

    /// Pixel-identical copy with the same flags and a fresh identity.
    pub fn duplicate(&self, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: self.visible,
            locked: self.locked,
            opacity: self.opacity,
            pixels: self.pixels.clone(),
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("visible", &self.visible)
            .field("locked", &self.locked)
            .field("opacity", &self.opacity)
            .field("pixels", &self.pixels)
            .finish()
    }
}
