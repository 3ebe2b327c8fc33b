use deluxe_draw::canvas::{BLACK, TRANSPARENT, WHITE};
use deluxe_draw::components::tools::{Gesture, PenShape, Tool};
use deluxe_draw::ops::composite::sample_composite;
use deluxe_draw::settings::Settings;
use deluxe_draw::{Editor, LayerStack};
use image::Rgba;
use pretty_assertions::assert_eq;

const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn editor(width: u32, height: u32) -> Editor {
    Editor::new(Settings {
        canvas_width: width,
        canvas_height: height,
        ..Settings::default()
    })
}

// ============================================================================
// Eyedropper
// ============================================================================

#[test]
fn test_eyedropper_reads_composite_not_layer() {
    let mut layers = LayerStack::new(8, 8);
    layers.get_mut(0).unwrap().pixels.clear(BLUE);
    layers.add("LAYER 1");
    assert_eq!(layers.active_layer().pixels.get(3, 3), TRANSPARENT);
    assert_eq!(sample_composite(layers.layers(), 3, 3), BLUE);

    let mut ed = editor(8, 8);
    ed.layers_mut().get_mut(0).unwrap().pixels.clear(BLUE);
    ed.on_tool_select(Tool::Eyedropper);
    let outcome = ed.on_pointer_down((3, 3));
    assert!(outcome.color_changed);
    assert!(!outcome.raster_changed);
    assert_eq!(ed.tools.color, BLUE);
    assert!(ed.project.history.is_empty());
}

#[test]
fn test_eyedropper_outside_canvas_keeps_color() {
    let mut ed = editor(8, 8);
    ed.on_color_select(RED);
    ed.on_tool_select(Tool::Eyedropper);
    let outcome = ed.on_pointer_down((8, 2));
    assert!(!outcome.color_changed);
    assert_eq!(ed.tools.color, RED);
}

// ============================================================================
// Locked layers
// ============================================================================

#[test]
fn test_locked_layer_rejects_every_mutating_tool() {
    let mut ed = editor(16, 16);
    assert!(ed.toggle_layer_lock());

    for tool in [Tool::Pen, Tool::Brush, Tool::Eraser, Tool::Bucket, Tool::Line, Tool::Rect, Tool::Circle] {
        ed.on_tool_select(tool);
        ed.on_pointer_down((4, 4));
        ed.on_pointer_move((9, 9));
        ed.on_pointer_up((9, 9));
    }

    assert_eq!(ed.layers().active_layer().pixels.count_opaque(), 0);
    assert!(ed.project.history.is_empty());
}

#[test]
fn test_locked_layer_still_composites() {
    let mut ed = editor(8, 8);
    ed.on_pointer_down((2, 2));
    ed.on_pointer_up((2, 2));
    ed.toggle_layer_lock();
    assert_eq!(ed.display_buffer().get(2, 2), BLACK);
}

// ============================================================================
// Strokes
// ============================================================================

#[test]
fn test_stroke_is_one_history_action() {
    let mut ed = editor(32, 32);
    ed.on_pen_shape_select(PenShape::Square);
    ed.on_pen_size_change(1.0);
    ed.on_pointer_down((0, 0));
    ed.on_pointer_move((5, 0));
    ed.on_pointer_move((10, 0));
    ed.on_pointer_up((10, 0));

    assert_eq!(ed.project.history.len(), 1);
    let pixels = &ed.layers().active_layer().pixels;
    for x in 0..=10 {
        assert_eq!(pixels.get(x, 0), BLACK, "gap at x={x}");
    }
    assert_eq!(pixels.count_opaque(), 11);
}

#[test]
fn test_eraser_clears_alpha() {
    let mut ed = editor(32, 32);
    ed.on_pen_size_change(2.0);
    ed.on_tool_select(Tool::Eraser);
    ed.select_layer(0);
    ed.layers_mut().get_mut(0).unwrap().pixels.clear(RED);
    ed.on_pointer_down((10, 10));
    ed.on_pointer_up((10, 10));

    let pixels = &ed.layers().get(0).unwrap().pixels;
    assert_eq!(pixels.get(10, 10), TRANSPARENT);
    // 2x nominal size: radius 2 around the click
    assert_eq!(pixels.get(12, 10), TRANSPARENT);
    assert_eq!(pixels.get(13, 10), RED);
    assert_eq!(pixels.get(0, 0), RED);
}

#[test]
fn test_bucket_fills_region_and_undoes() {
    let mut ed = editor(16, 16);
    ed.select_layer(0);
    ed.on_color_select(RED);
    ed.on_tool_select(Tool::Bucket);
    let outcome = ed.on_pointer_down((1, 1));
    ed.on_pointer_up((1, 1));
    assert!(outcome.raster_changed);
    assert_eq!(ed.layers().get(0).unwrap().pixels.get(15, 15), RED);

    assert!(ed.undo());
    assert_eq!(ed.layers().get(0).unwrap().pixels.get(15, 15), WHITE);
}

// ============================================================================
// Primitives
// ============================================================================

#[test]
fn test_rect_previews_then_commits_on_release() {
    let mut ed = editor(32, 32);
    ed.on_tool_select(Tool::Rect);
    ed.on_pointer_down((2, 2));
    ed.on_pointer_move((10, 10));

    assert!(ed.gesture().is_active());
    assert_eq!(ed.display_buffer().get(10, 2), BLACK);
    assert_eq!(ed.layers().active_layer().pixels.get(10, 2), TRANSPARENT);
    assert!(ed.project.history.is_empty());

    let outcome = ed.on_pointer_up((10, 10));
    assert!(outcome.raster_changed);
    assert!(matches!(ed.gesture(), Gesture::Committed { tool: Tool::Rect, .. }));
    let pixels = &ed.layers().active_layer().pixels;
    assert_eq!(pixels.get(10, 2), BLACK);
    assert_eq!(pixels.get(2, 10), BLACK);
    assert_eq!(pixels.get(6, 6), TRANSPARENT);
    assert_eq!(ed.project.history.len(), 1);
    assert_eq!(ed.project.history.undo_description(), Some("rect"));
}

#[test]
fn test_primitive_released_off_canvas_is_cancelled() {
    let mut ed = editor(32, 32);
    ed.on_tool_select(Tool::Line);
    ed.on_pointer_down((2, 2));
    ed.on_pointer_move((20, 20));
    ed.on_pointer_up((40, 40));

    assert_eq!(*ed.gesture(), Gesture::Idle);
    assert_eq!(ed.layers().active_layer().pixels.count_opaque(), 0);
    assert!(ed.project.history.is_empty());
    assert_eq!(ed.display_buffer().get(10, 10), WHITE);
}

#[test]
fn test_circle_commits_through_midpoint() {
    let mut ed = editor(32, 32);
    ed.on_tool_select(Tool::Circle);
    ed.on_pointer_down((4, 10));
    ed.on_pointer_move((16, 10));
    ed.on_pointer_up((16, 10));

    let pixels = &ed.layers().active_layer().pixels;
    // center (10,10), radius 6
    assert_eq!(pixels.get(4, 10), BLACK);
    assert_eq!(pixels.get(16, 10), BLACK);
    assert_eq!(pixels.get(10, 4), BLACK);
    assert_eq!(pixels.get(10, 10), TRANSPARENT);
}

// ============================================================================
// View tools
// ============================================================================

#[test]
fn test_zoom_tool_keeps_clicked_point_fixed() {
    let mut ed = editor(64, 64);
    ed.on_tool_select(Tool::Zoom);
    let before = ed.view.canvas_to_screen((20.0, 30.0));
    let outcome = ed.on_pointer_down((20, 30));
    assert!(outcome.view_changed);
    assert_eq!(ed.view.zoom, 1.25);
    let after = ed.view.canvas_to_screen((20.0, 30.0));
    assert!((before.0 - after.0).abs() < 1e-3);
    assert!((before.1 - after.1).abs() < 1e-3);
}

#[test]
fn test_move_tool_pans_without_touching_pixels() {
    let mut ed = editor(64, 64);
    ed.on_tool_select(Tool::Move);
    ed.on_pointer_down((10, 10));
    ed.on_pointer_move((15, 12));
    ed.on_pointer_up((15, 12));

    assert_eq!(ed.view.pan, (5.0, 2.0));
    assert!(ed.project.history.is_empty());
    assert!(!ed.project.is_dirty);
}

// ============================================================================
// Undo / redo
// ============================================================================

#[test]
fn test_undo_redo_across_strokes() {
    let mut ed = editor(32, 32);
    ed.on_pointer_down((4, 4));
    ed.on_pointer_up((4, 4));
    ed.on_color_select(RED);
    ed.on_pointer_down((20, 20));
    ed.on_pointer_up((20, 20));

    assert!(ed.undo());
    assert_eq!(ed.display_buffer().get(20, 20), WHITE);
    assert_eq!(ed.display_buffer().get(4, 4), BLACK);
    assert!(ed.undo());
    assert_eq!(ed.display_buffer().get(4, 4), WHITE);
    assert!(!ed.undo());

    assert!(ed.redo());
    assert!(ed.redo());
    assert_eq!(ed.display_buffer().get(4, 4), BLACK);
    assert_eq!(ed.display_buffer().get(20, 20), RED);
    assert!(!ed.redo());
}

#[test]
fn test_new_stroke_after_undo_drops_redo_branch() {
    let mut ed = editor(32, 32);
    ed.on_pointer_down((4, 4));
    ed.on_pointer_up((4, 4));
    ed.undo();
    ed.on_pointer_down((8, 8));
    ed.on_pointer_up((8, 8));

    assert!(!ed.redo());
    assert_eq!(ed.project.history.len(), 1);
    assert_eq!(ed.display_buffer().get(4, 4), WHITE);
    assert_eq!(ed.display_buffer().get(8, 8), BLACK);
}
