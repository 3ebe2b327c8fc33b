use image::Rgba;
use std::path::{Path, PathBuf};

use crate::canvas::PixelBuffer;
use crate::components::layers::LayerStack;
use crate::components::tools::{DrawContext, Gesture, GestureOutcome, PenShape, Tool, ToolState};
use crate::io::{self, ExportFormat, ProjectError};
use crate::ops::composite::{CompositeEngine, Overlay};
use crate::project::{Document, Project};
use crate::settings::Settings;
use crate::view::ViewTransform;

/// The editor core as seen by a UI front end.
///
/// The front end feeds it canvas-space pointer events and parameter changes
/// and blits [`Editor::display_buffer`] every frame. Screen coordinates are
/// mapped through [`Editor::view`] by the caller.
pub struct Editor {
    pub project: Project,
    pub view: ViewTransform,
    pub tools: ToolState,
    gesture: Gesture,
    compositor: CompositeEngine,
    settings: Settings,
    untitled_counter: usize,
}

impl Editor {
    pub fn new(settings: Settings) -> Self {
        let project = Project::new_untitled(
            1,
            settings.canvas_width,
            settings.canvas_height,
            settings.max_undo_steps,
        );
        Self::with_project(project, settings)
    }

    pub fn with_project(project: Project, settings: Settings) -> Self {
        let mut tools = ToolState::default();
        tools.set_pen_size(settings.pen_size);
        tools.fill_tolerance = settings.fill_tolerance;
        let compositor = CompositeEngine::new(project.document.width(), project.document.height());
        Self {
            project,
            view: ViewTransform::default(),
            tools,
            gesture: Gesture::Idle,
            compositor,
            settings,
            untitled_counter: 1,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn layers(&self) -> &LayerStack {
        &self.project.document.layers
    }

    /// Raw access for edits that end up in the saved file. Cancels any
    /// in-progress gesture and marks the project dirty; selection changes
    /// go through [`Editor::select_layer`] instead.
    pub fn layers_mut(&mut self) -> &mut LayerStack {
        self.gesture.cancel();
        self.project.mark_dirty();
        &mut self.project.document.layers
    }

    // ------------------------------------------------------------------
    // Layer panel
    // ------------------------------------------------------------------

    /// Change the active layer. Selection is not saved, so the project
    /// stays clean.
    pub fn select_layer(&mut self, index: usize) -> bool {
        if index == self.layers().active_index() {
            return index < self.layers().len();
        }
        self.gesture.cancel();
        self.project.document.layers.set_active(index)
    }

    pub fn add_layer(&mut self) -> usize {
        self.edit_layers(|layers| Some(layers.add_next()))
            .unwrap_or_else(|| self.layers().active_index())
    }

    pub fn duplicate_layer(&mut self) -> usize {
        self.edit_layers(|layers| Some(layers.duplicate()))
            .unwrap_or_else(|| self.layers().active_index())
    }

    pub fn delete_layer(&mut self) -> bool {
        self.edit_layers(|layers| layers.delete().then_some(())).is_some()
    }

    pub fn reorder_layer(&mut self, from: usize, to: usize) -> bool {
        self.edit_layers(|layers| layers.reorder(from, to).then_some(())).is_some()
    }

    /// Returns the new lock state of the active layer.
    pub fn toggle_layer_lock(&mut self) -> bool {
        self.edit_layers(|layers| Some(layers.toggle_lock())).unwrap_or(false)
    }

    pub fn toggle_layer_visibility(&mut self, index: usize) -> Option<bool> {
        self.edit_layers(|layers| layers.toggle_visibility(index))
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> bool {
        self.edit_layers(|layers| layers.rename(index, name).then_some(())).is_some()
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> bool {
        self.edit_layers(|layers| layers.set_opacity(index, opacity).then_some(())).is_some()
    }

    /// Run a persistent layer edit; `Some` means something changed.
    fn edit_layers<T>(&mut self, edit: impl FnOnce(&mut LayerStack) -> Option<T>) -> Option<T> {
        self.gesture.cancel();
        let result = edit(&mut self.project.document.layers);
        if result.is_some() {
            self.project.mark_dirty();
        }
        result
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    // ------------------------------------------------------------------
    // Pointer input (canvas space)
    // ------------------------------------------------------------------

    pub fn on_pointer_down(&mut self, point: (i32, i32)) -> GestureOutcome {
        self.dispatch(|gesture, ctx| gesture.pointer_down(ctx, point))
    }

    pub fn on_pointer_move(&mut self, point: (i32, i32)) -> GestureOutcome {
        self.dispatch(|gesture, ctx| gesture.pointer_move(ctx, point))
    }

    pub fn on_pointer_up(&mut self, point: (i32, i32)) -> GestureOutcome {
        self.dispatch(|gesture, ctx| gesture.pointer_up(ctx, point))
    }

    fn dispatch(
        &mut self,
        event: impl FnOnce(&mut Gesture, &mut DrawContext<'_>) -> GestureOutcome,
    ) -> GestureOutcome {
        let mut ctx = DrawContext {
            layers: &mut self.project.document.layers,
            history: &mut self.project.history,
            tools: &mut self.tools,
            view: &mut self.view,
        };
        let outcome = event(&mut self.gesture, &mut ctx);
        if outcome.raster_changed {
            self.project.mark_dirty();
        }
        outcome
    }

    /// Mouse wheel over the canvas, `anchor` in screen space.
    pub fn on_wheel(&mut self, wheel: f32, anchor: (f32, f32)) {
        self.view.zoom_at_screen(wheel, anchor);
    }

    // ------------------------------------------------------------------
    // Tool parameters
    // ------------------------------------------------------------------

    /// Switching tools cancels an in-progress gesture without committing.
    pub fn on_tool_select(&mut self, tool: Tool) {
        if tool != self.tools.tool {
            self.gesture = Gesture::Idle;
        }
        self.tools.tool = tool;
    }

    pub fn on_color_select(&mut self, color: Rgba<u8>) {
        self.tools.color = color;
    }

    /// Pick a swatch from the document palette.
    pub fn on_palette_select(&mut self, index: usize) -> bool {
        match self.project.document.palette.get(index) {
            Some(color) => {
                self.tools.color = color;
                true
            }
            None => false,
        }
    }

    pub fn on_pen_size_change(&mut self, value: f32) {
        self.tools.set_pen_size(value);
    }

    pub fn on_pen_shape_select(&mut self, shape: PenShape) {
        self.tools.pen_shape = shape;
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.gesture.cancel();
        let done = self
            .project
            .history
            .undo(&mut self.project.document.layers)
            .is_some();
        if done {
            self.project.mark_dirty();
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        self.gesture.cancel();
        let done = self
            .project
            .history
            .redo(&mut self.project.document.layers)
            .is_some();
        if done {
            self.project.mark_dirty();
        }
        done
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Composite of all visible layers plus any primitive being dragged.
    pub fn display_buffer(&mut self) -> &PixelBuffer {
        let layers = &self.project.document.layers;
        let (w, h) = (layers.width(), layers.height());
        let preview = self.gesture.preview(&self.tools, w, h);
        let overlay = preview.as_ref().map(|pixels| Overlay {
            layer_index: layers.active_index(),
            pixels,
        });
        self.compositor.compose(layers.layers(), w, h, overlay)
    }

    /// `ZOOM: 100% | SIZE: 512X512 | TOOL: PEN | LAYER: LAYER 1`
    pub fn status_line(&self) -> String {
        let layers = self.layers();
        format!(
            "ZOOM: {:.0}% | SIZE: {}X{} | TOOL: {} | LAYER: {}",
            self.view.zoom_percent(),
            layers.width(),
            layers.height(),
            self.tools.tool.label(),
            layers.active_layer().name
        )
    }

    pub fn title(&self) -> String {
        self.project.display_title()
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Replace the open project with a fresh default document.
    pub fn new_document(&mut self, width: u32, height: u32) {
        self.untitled_counter += 1;
        self.project = Project::new_untitled(self.untitled_counter, width, height, self.settings.max_undo_steps);
        self.reset_session();
    }

    /// Save to `path`, or to the current path when `None`.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf, ProjectError> {
        let target = match path.map(Path::to_path_buf).or_else(|| self.project.path.clone()) {
            Some(p) => p,
            None => {
                return Err(ProjectError::InvalidFormat(
                    "Untitled project needs a file name".into(),
                ));
            }
        };
        io::save_project(&self.project.document, &target)?;
        self.project.saved_as(target.clone());
        Ok(target)
    }

    /// Load a project package. On failure the open project is untouched.
    pub fn open(&mut self, path: &Path) -> Result<(), ProjectError> {
        let document: Document = io::load_project(path)?;
        self.project = Project::from_file(path.to_path_buf(), document, self.settings.max_undo_steps);
        self.reset_session();
        Ok(())
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<(), ProjectError> {
        io::export_flattened(self.layers(), path, format, self.settings.jpeg_quality)
    }

    /// Zoom 1, no pan, no gesture.
    fn reset_session(&mut self) {
        self.view.reset();
        self.gesture = Gesture::Idle;
    }
}
