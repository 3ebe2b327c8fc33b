// ============================================================================
// VIEW TRANSFORM – screen <-> canvas mapping under zoom/pan
// ============================================================================

pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 8.0;
/// Relative zoom change per wheel notch.
pub const WHEEL_ZOOM_STEP: f32 = 0.1;
/// Screen position of the canvas viewport's top-left corner (tool panel
/// width, top bar height).
pub const DEFAULT_ORIGIN: (f32, f32) = (100.0, 50.0);

/// Maps screen coordinates to canvas coordinates and back.
///
/// `screen = origin + pan + canvas * zoom`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan: (f32, f32),
    pub origin: (f32, f32),
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: (0.0, 0.0),
            origin: DEFAULT_ORIGIN,
        }
    }
}

impl ViewTransform {
    /// Canvas pixel under a screen point. Truncates toward zero, so points
    /// just left/above the canvas within one pixel still map to 0.
    pub fn screen_to_canvas(&self, screen: (f32, f32)) -> (i32, i32) {
        let (cx, cy) = self.screen_to_canvas_f32(screen);
        (cx as i32, cy as i32)
    }

    pub fn screen_to_canvas_f32(&self, screen: (f32, f32)) -> (f32, f32) {
        (
            (screen.0 - self.origin.0 - self.pan.0) / self.zoom,
            (screen.1 - self.origin.1 - self.pan.1) / self.zoom,
        )
    }

    pub fn canvas_to_screen(&self, canvas: (f32, f32)) -> (f32, f32) {
        (
            self.origin.0 + self.pan.0 + canvas.0 * self.zoom,
            self.origin.1 + self.pan.1 + canvas.1 * self.zoom,
        )
    }

    /// Apply a wheel movement, keeping the canvas point under `anchor`
    /// (screen space) fixed.
    pub fn zoom_at_screen(&mut self, wheel: f32, anchor: (f32, f32)) {
        if wheel == 0.0 {
            return;
        }
        let target = self.zoom * (1.0 + wheel * WHEEL_ZOOM_STEP);
        self.zoom_to(target, anchor);
    }

    /// Scale the zoom by `factor`, keeping `canvas` at the same screen spot.
    pub fn zoom_at_canvas(&mut self, factor: f32, canvas: (f32, f32)) {
        let anchor = self.canvas_to_screen(canvas);
        self.zoom_to(self.zoom * factor, anchor);
    }

    fn zoom_to(&mut self, target: f32, anchor: (f32, f32)) {
        let before = self.screen_to_canvas_f32(anchor);
        self.zoom = target.clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan.0 = anchor.0 - self.origin.0 - before.0 * self.zoom;
        self.pan.1 = anchor.1 - self.origin.1 - before.1 * self.zoom;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    /// Grab-pan: the canvas point grabbed at `from` ends up under the cursor
    /// that now reports `to` (both in canvas space of the current view).
    pub fn drag(&mut self, from: (i32, i32), to: (i32, i32)) {
        self.pan_by(
            (to.0 - from.0) as f32 * self.zoom,
            (to.1 - from.1) as f32 * self.zoom,
        );
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = (0.0, 0.0);
    }

    pub fn zoom_percent(&self) -> f32 {
        self.zoom * 100.0
    }
}
