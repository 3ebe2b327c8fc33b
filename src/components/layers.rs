use image::Rgba;
use uuid::Uuid;

use crate::canvas::{Layer, TRANSPARENT, WHITE};

pub const BACKGROUND_LAYER_NAME: &str = "BACKGROUND";

// ============================================================================
// LAYER STACK
// ============================================================================

/// Ordered layers (index 0 paints first) sharing one canvas size.
///
/// Invariants: never empty, `active < len()`. Index 0 is the background and
/// cannot be deleted while other layers exist. Requests that would break an
/// invariant are silently ignored and report `false`.
#[derive(Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: usize,
    /// Monotonic counter for `LAYER <n>` names; never decremented.
    counter: u32,
    width: u32,
    height: u32,
}

impl LayerStack {
    /// A single opaque white background layer.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            layers: vec![Layer::new(BACKGROUND_LAYER_NAME, width, height, WHITE)],
            active: 0,
            counter: 1,
            width,
            height,
        }
    }

    /// Background plus `LAYER 1` and `LAYER 2`, with `LAYER 1` active.
    pub fn default_document(width: u32, height: u32) -> Self {
        let mut stack = Self::new(width, height);
        stack.add_next();
        stack.add_next();
        stack.active = 1;
        stack
    }

    /// Rebuild from loaded layers. Empty input yields a single background.
    /// Layers whose size differs from the canvas are kept as-is; reads
    /// outside them are transparent.
    pub fn from_layers(width: u32, height: u32, layers: Vec<Layer>, active: usize) -> Self {
        if layers.is_empty() {
            return Self::new(width, height);
        }
        let counter = next_counter(&layers);
        let active = active.min(layers.len() - 1);
        Self {
            layers,
            active,
            counter,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn index_of(&self, id: Uuid) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active]
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.layers.len() {
            return false;
        }
        self.active = index;
        true
    }

    /// Append a transparent layer and make it active. Returns its index.
    pub fn add(&mut self, name: impl Into<String>) -> usize {
        self.layers.push(Layer::new(name, self.width, self.height, TRANSPARENT));
        self.active = self.layers.len() - 1;
        self.active
    }

    /// Append a transparent layer named `LAYER <n>` from the counter.
    pub fn add_next(&mut self) -> usize {
        let name = format!("LAYER {}", self.counter);
        self.counter += 1;
        self.add(name)
    }

    /// Insert a copy of the active layer right above it and select the copy.
    pub fn duplicate(&mut self) -> usize {
        let source = &self.layers[self.active];
        let copy = source.duplicate(format!("{} COPY", source.name));
        let new_index = self.active + 1;
        self.layers.insert(new_index, copy);
        self.active = new_index;
        new_index
    }

    /// Remove the active layer. No-op for the last remaining layer and for
    /// the background.
    pub fn delete(&mut self) -> bool {
        if self.layers.len() <= 1 {
            log::debug!("delete ignored: last remaining layer");
            return false;
        }
        if self.active == 0 {
            log::debug!("delete ignored: background layer");
            return false;
        }
        self.layers.remove(self.active);
        if self.active >= self.layers.len() {
            self.active = self.layers.len() - 1;
        }
        true
    }

    /// Move a layer from `from` to `to` (remove then insert), keeping the
    /// same logical layer selected.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.layers.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);

        if self.active == from {
            self.active = to;
        } else if from < self.active && to >= self.active {
            self.active -= 1;
        } else if from > self.active && to <= self.active {
            self.active += 1;
        }
        true
    }

    /// Toggle the lock flag on the active layer. Returns the new state.
    pub fn toggle_lock(&mut self) -> bool {
        let layer = &mut self.layers[self.active];
        layer.locked = !layer.locked;
        layer.locked
    }

    /// Toggle visibility of any layer. `None` when out of range.
    pub fn toggle_visibility(&mut self, index: usize) -> Option<bool> {
        let layer = self.layers.get_mut(index)?;
        layer.visible = !layer.visible;
        Some(layer.visible)
    }

    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn set_opacity(&mut self, index: usize, opacity: f32) -> bool {
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.set_opacity(opacity);
                true
            }
            None => false,
        }
    }

    /// Whether the active layer currently accepts pixel edits.
    pub fn active_is_editable(&self) -> bool {
        !self.layers[self.active].locked
    }

    /// Fill color used for a blank layer at `index` (background is white).
    pub fn blank_fill_for(index: usize) -> Rgba<u8> {
        if index == 0 { WHITE } else { TRANSPARENT }
    }
}

/// Counter value following the highest `LAYER <n>` name, at least the
/// layer count.
fn next_counter(layers: &[Layer]) -> u32 {
    let highest = layers
        .iter()
        .filter_map(|l| l.name.strip_prefix("LAYER ")?.trim().parse::<u32>().ok())
        .max()
        .map_or(0, |n| n.saturating_add(1));
    highest.max(layers.len() as u32)
}
