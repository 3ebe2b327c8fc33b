use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::components::colors::Palette;
use crate::components::history::HistoryEngine;
use crate::components::layers::LayerStack;

/// Persistent content of a drawing: layers (with the canvas size) and the
/// palette. Everything here round-trips through a project package.
#[derive(Debug)]
pub struct Document {
    pub layers: LayerStack,
    pub palette: Palette,
}

impl Document {
    /// Three-layer default document with the default palette.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            layers: LayerStack::default_document(width, height),
            palette: Palette::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.layers.width()
    }

    pub fn height(&self) -> u32 {
        self.layers.height()
    }
}

/// Single open document with its undo history and file bookkeeping.
pub struct Project {
    pub id: Uuid,
    pub document: Document,
    pub history: HistoryEngine,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, width: u32, height: u32, history_capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document: Document::new(width, height),
            history: HistoryEngine::new(history_capacity),
            path: None,
            is_dirty: false,
            name: format!("Untitled-{}", untitled_counter),
        }
    }

    /// Freshly loaded document: clean, with empty history.
    pub fn from_file(path: PathBuf, document: Document, history_capacity: usize) -> Self {
        let name = file_display_name(&path);
        Self {
            id: Uuid::new_v4(),
            document,
            history: HistoryEngine::new(history_capacity),
            path: Some(path),
            is_dirty: false,
            name,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Record a successful save to `path`.
    pub fn saved_as(&mut self, path: PathBuf) {
        self.name = file_display_name(&path);
        self.path = Some(path);
        self.mark_clean();
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

fn file_display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
