use image::Rgba;

use crate::canvas::{PixelBuffer, BLACK, WHITE};
use crate::components::history::HistoryEngine;
use crate::components::layers::LayerStack;
use crate::ops::brush::{round_segment, square_segment, PaintMode};
use crate::ops::composite::sample_composite;
use crate::ops::fill::flood_fill;
use crate::ops::shapes::{rasterize_shape, ShapeKind};
use crate::view::ViewTransform;

pub const MIN_PEN_SIZE: f32 = 1.0;
pub const MAX_PEN_SIZE: f32 = 50.0;
pub const DEFAULT_PEN_SIZE: f32 = 4.0;
/// The eraser works at twice the nominal pen size.
pub const ERASER_SIZE_MULTIPLIER: f32 = 2.0;
/// Zoom factor applied by one click of the zoom tool.
pub const ZOOM_TOOL_STEP: f32 = 1.25;

// ============================================================================
// TOOL
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tool {
    #[default]
    Pen,
    Brush,
    Eraser,
    Bucket,
    Eyedropper,
    Line,
    Rect,
    Circle,
    Move,
    Zoom,
}

impl Tool {
    pub const ALL: [Tool; 10] = [
        Tool::Pen,
        Tool::Brush,
        Tool::Eraser,
        Tool::Bucket,
        Tool::Eyedropper,
        Tool::Line,
        Tool::Rect,
        Tool::Circle,
        Tool::Move,
        Tool::Zoom,
    ];

    /// Upper-case name shown in the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pen => "PEN",
            Tool::Brush => "BRUSH",
            Tool::Eraser => "ERASER",
            Tool::Bucket => "FILL",
            Tool::Eyedropper => "PICKER",
            Tool::Line => "LINE",
            Tool::Rect => "RECT",
            Tool::Circle => "CIRCLE",
            Tool::Move => "MOVE",
            Tool::Zoom => "ZOOM",
        }
    }

    /// Case-insensitive lookup by label or variant name.
    pub fn from_name(name: &str) -> Option<Tool> {
        let upper = name.trim().to_ascii_uppercase();
        Tool::ALL.into_iter().find(|t| {
            t.label() == upper || format!("{t:?}").to_ascii_uppercase() == upper
        })
    }

    /// Continuous stroke tools (snapshot on pointer-down).
    pub fn is_stroke(&self) -> bool {
        matches!(self, Tool::Pen | Tool::Brush | Tool::Eraser)
    }

    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Tool::Line => Some(ShapeKind::Line),
            Tool::Rect => Some(ShapeKind::Rect),
            Tool::Circle => Some(ShapeKind::Circle),
            _ => None,
        }
    }

    /// Whether using the tool changes layer pixels.
    pub fn mutates_layer(&self) -> bool {
        !matches!(self, Tool::Eyedropper | Tool::Move | Tool::Zoom)
    }

    /// Tag recorded in history for edits made with this tool.
    pub fn history_tag(&self) -> &'static str {
        match self {
            Tool::Pen | Tool::Brush => "draw",
            Tool::Eraser => "erase",
            Tool::Bucket => "fill",
            Tool::Line => "line",
            Tool::Rect => "rect",
            Tool::Circle => "circle",
            Tool::Eyedropper | Tool::Move | Tool::Zoom => "view",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PenShape {
    #[default]
    Round,
    Square,
}

// ============================================================================
// TOOL STATE – parameters shared by every tool
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolState {
    pub tool: Tool,
    pen_size: f32,
    pub pen_shape: PenShape,
    pub color: Rgba<u8>,
    /// Bucket tolerance, 0 = exact match.
    pub fill_tolerance: u8,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            tool: Tool::Pen,
            pen_size: DEFAULT_PEN_SIZE,
            pen_shape: PenShape::Round,
            color: BLACK,
            fill_tolerance: 0,
        }
    }
}

impl ToolState {
    pub fn pen_size(&self) -> f32 {
        self.pen_size
    }

    pub fn set_pen_size(&mut self, size: f32) {
        if size.is_nan() {
            return;
        }
        self.pen_size = size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE);
    }

    /// Rasterize one stroke segment of the current stroke tool into `pixels`.
    /// Does nothing for non-stroke tools.
    pub fn stroke_segment(&self, pixels: &mut PixelBuffer, from: (i32, i32), to: (i32, i32)) {
        let (size, color, mode) = match self.tool {
            Tool::Pen | Tool::Brush => (self.pen_size, self.color, PaintMode::Paint),
            Tool::Eraser => (self.pen_size * ERASER_SIZE_MULTIPLIER, WHITE, PaintMode::Erase),
            _ => return,
        };
        match self.pen_shape {
            PenShape::Round => round_segment(pixels, from, to, size, color, mode),
            PenShape::Square => square_segment(pixels, from, to, size, color, mode),
        }
    }

    /// Rasterize the current primitive tool's shape into a canvas-sized
    /// transparent buffer. `None` for non-primitive tools.
    pub fn rasterize_primitive(&self, start: (i32, i32), end: (i32, i32), width: u32, height: u32) -> Option<PixelBuffer> {
        let kind = self.tool.shape_kind()?;
        Some(rasterize_shape(kind, start, end, self.pen_size, self.color, width, height))
    }
}

// ============================================================================
// DRAW CONTEXT
// ============================================================================

/// Everything a gesture may touch, borrowed explicitly for one event.
pub struct DrawContext<'a> {
    pub layers: &'a mut LayerStack,
    pub history: &'a mut HistoryEngine,
    pub tools: &'a mut ToolState,
    pub view: &'a mut ViewTransform,
}

/// What an input event did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GestureOutcome {
    /// Layer pixels changed.
    pub raster_changed: bool,
    /// The current color changed (eyedropper).
    pub color_changed: bool,
    /// Zoom or pan changed.
    pub view_changed: bool,
}

impl GestureOutcome {
    const RASTER: Self = Self {
        raster_changed: true,
        color_changed: false,
        view_changed: false,
    };
    const COLOR: Self = Self {
        raster_changed: false,
        color_changed: true,
        view_changed: false,
    };
    const VIEW: Self = Self {
        raster_changed: false,
        color_changed: false,
        view_changed: true,
    };
}

// ============================================================================
// GESTURE – per-tool pointer state machine
// ============================================================================

/// `Idle -> Active -> Committed -> (next pointer-down) -> Active ...`
///
/// A stroke tool paints while `Active`. A primitive tool only previews while
/// `Active` and commits one shape on release over the canvas. Releasing off
/// the canvas or switching tools cancels back to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Gesture {
    #[default]
    Idle,
    Active {
        tool: Tool,
        start: (i32, i32),
        last: (i32, i32),
    },
    Committed {
        tool: Tool,
        start: (i32, i32),
        end: (i32, i32),
    },
}

impl Gesture {
    pub fn is_active(&self) -> bool {
        matches!(self, Gesture::Active { .. })
    }

    /// Drop an in-progress gesture without committing anything.
    pub fn cancel(&mut self) {
        if self.is_active() {
            *self = Gesture::Idle;
        }
    }

    pub fn pointer_down(&mut self, ctx: &mut DrawContext<'_>, point: (i32, i32)) -> GestureOutcome {
        let tool = ctx.tools.tool;

        if tool.mutates_layer() && !ctx.layers.active_is_editable() {
            log::debug!(
                "{} ignored: layer '{}' is locked",
                tool.label(),
                ctx.layers.active_layer().name
            );
            *self = Gesture::Idle;
            return GestureOutcome::default();
        }

        match tool {
            Tool::Pen | Tool::Brush | Tool::Eraser => {
                let active = ctx.layers.active_index();
                ctx.history.record_snapshot(ctx.layers, active, tool.history_tag());
                ctx.tools.stroke_segment(&mut ctx.layers.active_layer_mut().pixels, point, point);
                *self = Gesture::Active {
                    tool,
                    start: point,
                    last: point,
                };
                GestureOutcome::RASTER
            }
            Tool::Line | Tool::Rect | Tool::Circle | Tool::Move => {
                *self = Gesture::Active {
                    tool,
                    start: point,
                    last: point,
                };
                GestureOutcome::default()
            }
            Tool::Bucket => {
                *self = Gesture::Committed {
                    tool,
                    start: point,
                    end: point,
                };
                let layer = ctx.layers.active_layer();
                if !layer.pixels.in_bounds(point.0, point.1) {
                    return GestureOutcome::default();
                }
                let active = ctx.layers.active_index();
                ctx.history.record_snapshot(ctx.layers, active, tool.history_tag());
                let color = ctx.tools.color;
                let tolerance = ctx.tools.fill_tolerance;
                let filled = flood_fill(&mut ctx.layers.active_layer_mut().pixels, point.0, point.1, color, tolerance);
                log::debug!("fill: {} pixels at {:?}", filled, point);
                GestureOutcome::RASTER
            }
            Tool::Eyedropper => {
                *self = Gesture::Committed {
                    tool,
                    start: point,
                    end: point,
                };
                if point.0 < 0
                    || point.1 < 0
                    || point.0 as u32 >= ctx.layers.width()
                    || point.1 as u32 >= ctx.layers.height()
                {
                    return GestureOutcome::default();
                }
                ctx.tools.color = sample_composite(ctx.layers.layers(), point.0, point.1);
                GestureOutcome::COLOR
            }
            Tool::Zoom => {
                *self = Gesture::Committed {
                    tool,
                    start: point,
                    end: point,
                };
                ctx.view.zoom_at_canvas(ZOOM_TOOL_STEP, (point.0 as f32, point.1 as f32));
                GestureOutcome::VIEW
            }
        }
    }

    pub fn pointer_move(&mut self, ctx: &mut DrawContext<'_>, point: (i32, i32)) -> GestureOutcome {
        let Gesture::Active { tool, start, last } = *self else {
            return GestureOutcome::default();
        };
        if point == last {
            return GestureOutcome::default();
        }
        *self = Gesture::Active {
            tool,
            start,
            last: point,
        };

        if tool.is_stroke() {
            if !ctx.layers.active_is_editable() {
                return GestureOutcome::default();
            }
            ctx.tools.stroke_segment(&mut ctx.layers.active_layer_mut().pixels, last, point);
            return GestureOutcome::RASTER;
        }
        if tool == Tool::Move {
            // `point` is reported in the view being dragged, so the grabbed
            // canvas point stays `start`.
            ctx.view.drag(start, point);
            *self = Gesture::Active { tool, start, last: start };
            return GestureOutcome::VIEW;
        }
        GestureOutcome::default()
    }

    pub fn pointer_up(&mut self, ctx: &mut DrawContext<'_>, point: (i32, i32)) -> GestureOutcome {
        let Gesture::Active { tool, start, last } = *self else {
            return GestureOutcome::default();
        };

        if tool.is_stroke() {
            let mut outcome = GestureOutcome::default();
            if point != last && ctx.layers.active_is_editable() {
                ctx.tools.stroke_segment(&mut ctx.layers.active_layer_mut().pixels, last, point);
                outcome = GestureOutcome::RASTER;
            }
            *self = Gesture::Committed { tool, start, end: point };
            return outcome;
        }

        if tool == Tool::Move {
            *self = Gesture::Committed { tool, start, end: point };
            return GestureOutcome::default();
        }

        // primitive
        let (w, h) = (ctx.layers.width(), ctx.layers.height());
        if point.0 < 0 || point.1 < 0 || point.0 as u32 >= w || point.1 as u32 >= h {
            log::debug!("{} cancelled: released off canvas", tool.label());
            *self = Gesture::Idle;
            return GestureOutcome::default();
        }
        if !ctx.layers.active_is_editable() || ctx.tools.tool != tool {
            *self = Gesture::Idle;
            return GestureOutcome::default();
        }
        let Some(shape) = ctx.tools.rasterize_primitive(start, point, w, h) else {
            *self = Gesture::Idle;
            return GestureOutcome::default();
        };
        let active = ctx.layers.active_index();
        ctx.history.record_snapshot(ctx.layers, active, tool.history_tag());
        ctx.layers.active_layer_mut().pixels.blit(&shape, 0, 0, 1.0);
        *self = Gesture::Committed { tool, start, end: point };
        GestureOutcome::RASTER
    }

    /// Transient raster for an in-progress primitive drag.
    pub fn preview(&self, tools: &ToolState, width: u32, height: u32) -> Option<PixelBuffer> {
        match *self {
            Gesture::Active { tool, start, last } if tool.shape_kind().is_some() && tool == tools.tool => {
                tools.rasterize_primitive(start, last, width, height)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;

    struct Fixture {
        layers: LayerStack,
        history: HistoryEngine,
        tools: ToolState,
        view: ViewTransform,
        gesture: Gesture,
    }

    impl Fixture {
        fn new(tool: Tool) -> Self {
            let mut tools = ToolState::default();
            tools.tool = tool;
            Self {
                layers: LayerStack::default_document(32, 32),
                history: HistoryEngine::new(10),
                tools,
                view: ViewTransform::default(),
                gesture: Gesture::Idle,
            }
        }

        fn down(&mut self, p: (i32, i32)) -> GestureOutcome {
            let mut ctx = DrawContext {
                layers: &mut self.layers,
                history: &mut self.history,
                tools: &mut self.tools,
                view: &mut self.view,
            };
            self.gesture.pointer_down(&mut ctx, p)
        }

        fn drag(&mut self, p: (i32, i32)) -> GestureOutcome {
            let mut ctx = DrawContext {
                layers: &mut self.layers,
                history: &mut self.history,
                tools: &mut self.tools,
                view: &mut self.view,
            };
            self.gesture.pointer_move(&mut ctx, p)
        }

        fn up(&mut self, p: (i32, i32)) -> GestureOutcome {
            let mut ctx = DrawContext {
                layers: &mut self.layers,
                history: &mut self.history,
                tools: &mut self.tools,
                view: &mut self.view,
            };
            self.gesture.pointer_up(&mut ctx, p)
        }

        fn active_pixels(&self) -> &PixelBuffer {
            &self.layers.active_layer().pixels
        }
    }

    #[test]
    fn labels_and_lookup() {
        assert_eq!(Tool::Bucket.label(), "FILL");
        assert_eq!(Tool::Eyedropper.label(), "PICKER");
        assert_eq!(Tool::from_name("picker"), Some(Tool::Eyedropper));
        assert_eq!(Tool::from_name("Bucket"), Some(Tool::Bucket));
        assert_eq!(Tool::from_name("lasso"), None);
    }

    #[test]
    fn pen_size_is_clamped() {
        let mut tools = ToolState::default();
        tools.set_pen_size(0.0);
        assert_eq!(tools.pen_size(), MIN_PEN_SIZE);
        tools.set_pen_size(400.0);
        assert_eq!(tools.pen_size(), MAX_PEN_SIZE);
    }

    #[test]
    fn pen_stroke_records_once_and_paints() {
        let mut f = Fixture::new(Tool::Pen);
        assert!(f.down((4, 4)).raster_changed);
        assert_eq!(f.history.len(), 1);
        assert_eq!(f.active_pixels().get(4, 4), BLACK);

        f.drag((12, 4));
        f.drag((20, 10));
        f.up((20, 10));
        assert_eq!(f.history.len(), 1);
        assert_eq!(f.active_pixels().get(8, 4), BLACK);
        assert!(matches!(f.gesture, Gesture::Committed { tool: Tool::Pen, .. }));
    }

    #[test]
    fn eraser_clears_at_double_size() {
        let mut f = Fixture::new(Tool::Eraser);
        f.layers.active_layer_mut().pixels.clear(BLACK);
        f.tools.set_pen_size(2.0);
        f.down((10, 10));
        f.up((10, 10));
        assert_eq!(f.active_pixels().get(10, 10), TRANSPARENT);
        assert_eq!(f.active_pixels().get(12, 10), TRANSPARENT);
        assert_eq!(f.active_pixels().get(14, 10), BLACK);
    }

    #[test]
    fn primitive_previews_until_release() {
        let mut f = Fixture::new(Tool::Rect);
        f.down((2, 2));
        f.drag((10, 8));
        assert_eq!(f.active_pixels().count_opaque(), 0);
        assert!(f.history.is_empty());

        let preview = f.gesture.preview(&f.tools, 32, 32).unwrap();
        assert_eq!(preview.get(10, 8), BLACK);

        assert!(f.up((10, 8)).raster_changed);
        assert_eq!(f.history.len(), 1);
        assert_eq!(f.active_pixels(), &preview);
        assert!(f.gesture.preview(&f.tools, 32, 32).is_none());
    }

    #[test]
    fn primitive_release_off_canvas_cancels() {
        let mut f = Fixture::new(Tool::Line);
        f.down((2, 2));
        f.drag((40, 2));
        assert!(!f.up((40, 2)).raster_changed);
        assert_eq!(f.gesture, Gesture::Idle);
        assert!(f.history.is_empty());
        assert_eq!(f.active_pixels().count_opaque(), 0);
    }

    #[test]
    fn switching_tool_mid_drag_does_not_commit() {
        let mut f = Fixture::new(Tool::Circle);
        f.down((5, 5));
        f.drag((15, 5));
        f.tools.tool = Tool::Pen;
        assert!(!f.up((15, 5)).raster_changed);
        assert_eq!(f.active_pixels().count_opaque(), 0);
    }

    #[test]
    fn locked_layer_rejects_mutation() {
        for tool in [Tool::Pen, Tool::Eraser, Tool::Bucket, Tool::Line] {
            let mut f = Fixture::new(tool);
            f.layers.toggle_lock();
            f.down((3, 3));
            f.drag((9, 9));
            f.up((9, 9));
            assert_eq!(f.active_pixels().count_opaque(), 0, "{tool:?}");
            assert!(f.history.is_empty(), "{tool:?}");
        }
    }

    #[test]
    fn bucket_fills_active_layer() {
        let mut f = Fixture::new(Tool::Bucket);
        f.tools.color = Rgba([0, 255, 0, 255]);
        assert!(f.down((0, 0)).raster_changed);
        assert_eq!(f.active_pixels().count_opaque(), 32 * 32);
        assert_eq!(f.history.undo_description(), Some("fill"));
        assert!(!f.down((-1, 0)).raster_changed);
    }

    #[test]
    fn eyedropper_samples_composite_even_when_locked() {
        let mut f = Fixture::new(Tool::Eyedropper);
        f.layers.toggle_lock();
        assert!(f.down((3, 3)).color_changed);
        assert_eq!(f.tools.color, WHITE);
        assert!(f.history.is_empty());
    }

    #[test]
    fn zoom_tool_zooms_in_around_point() {
        let mut f = Fixture::new(Tool::Zoom);
        let before = f.view.canvas_to_screen((8.0, 8.0));
        assert!(f.down((8, 8)).view_changed);
        assert_eq!(f.view.zoom, ZOOM_TOOL_STEP);
        let after = f.view.canvas_to_screen((8.0, 8.0));
        assert!((before.0 - after.0).abs() < 1e-3);
    }

    #[test]
    fn move_tool_pans_view() {
        let mut f = Fixture::new(Tool::Move);
        f.layers.toggle_lock();
        f.down((10, 10));
        assert!(f.drag((14, 7)).view_changed);
        assert_eq!(f.view.pan, (4.0, -3.0));
        f.up((14, 7));
        assert!(f.history.is_empty());
    }

    #[test]
    fn cancel_only_affects_active_gesture() {
        let mut g = Gesture::Committed {
            tool: Tool::Pen,
            start: (0, 0),
            end: (1, 1),
        };
        g.cancel();
        assert!(matches!(g, Gesture::Committed { .. }));
        let mut g = Gesture::Active {
            tool: Tool::Line,
            start: (0, 0),
            last: (1, 1),
        };
        g.cancel();
        assert_eq!(g, Gesture::Idle);
    }
}
