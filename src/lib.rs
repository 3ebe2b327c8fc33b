//! Layered raster editor core: layers, compositing, drawing tools,
//! undo/redo history and the `.ddp` project package format.
//!
//! The UI is not part of this crate. A front end drives [`app::Editor`] with
//! canvas-space pointer events and blits its display buffer.

pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;
pub mod view;

pub use app::Editor;
pub use canvas::{Layer, PixelBuffer};
pub use components::colors::Palette;
pub use components::history::HistoryEngine;
pub use components::layers::LayerStack;
pub use components::tools::{Gesture, PenShape, Tool, ToolState};
pub use io::{ExportFormat, ProjectError};
pub use ops::composite::CompositeEngine;
pub use project::{Document, Project};
pub use view::ViewTransform;
