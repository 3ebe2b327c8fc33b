use std::collections::VecDeque;

use uuid::Uuid;

use crate::canvas::PixelBuffer;
use crate::components::layers::LayerStack;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

// ============================================================================
// HISTORY ACTION
// ============================================================================

/// One undoable edit: a full copy of the target layer's pixels.
///
/// While the action is on the undo side the snapshot holds the layer as it
/// was *before* the edit. Undo swaps it with the live pixels, so on the redo
/// side it holds the state *after* the edit, and redo swaps it back.
#[derive(Debug)]
pub struct HistoryAction {
    pub tag: String,
    /// Index of the layer when the snapshot was taken.
    pub layer_index: usize,
    /// Identity used to find the layer again after reorders.
    pub layer_id: Uuid,
    snapshot: PixelBuffer,
}

impl HistoryAction {
    pub fn snapshot(&self) -> &PixelBuffer {
        &self.snapshot
    }

    pub fn memory_size(&self) -> usize {
        self.snapshot.memory_bytes() + self.tag.len()
    }
}

// ============================================================================
// HISTORY ENGINE
// ============================================================================

/// Linear undo/redo over per-layer snapshots.
///
/// `position()` is the index of the last applied action, or `None` when
/// everything has been undone (or nothing recorded).
#[derive(Debug)]
pub struct HistoryEngine {
    actions: VecDeque<HistoryAction>,
    /// Number of applied actions; `actions[applied..]` is the redo branch.
    applied: usize,
    capacity: usize,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            actions: VecDeque::new(),
            applied: 0,
            capacity: capacity.max(1),
        }
    }

    /// Snapshot `layer_index` before it gets mutated. Discards the redo
    /// branch and evicts the oldest action past capacity. Returns `false`
    /// (and records nothing) for a missing or locked layer.
    pub fn record_snapshot(&mut self, layers: &LayerStack, layer_index: usize, tag: &str) -> bool {
        let Some(layer) = layers.get(layer_index) else {
            return false;
        };
        if layer.locked {
            log::debug!("history: '{}' not recorded, layer '{}' is locked", tag, layer.name);
            return false;
        }

        self.actions.truncate(self.applied);
        self.actions.push_back(HistoryAction {
            tag: tag.to_string(),
            layer_index,
            layer_id: layer.id,
            snapshot: layer.pixels.clone(),
        });
        self.applied = self.actions.len();
        self.prune();
        true
    }

    fn prune(&mut self) {
        while self.actions.len() > self.capacity {
            if let Some(evicted) = self.actions.pop_front() {
                log::debug!("history: evicted '{}'", evicted.tag);
            }
            self.applied = self.applied.saturating_sub(1);
        }
    }

    /// Revert the last applied action. Returns its tag, or `None` at the
    /// start of history or when the target layer is locked. Actions whose
    /// layer has been deleted are dropped and the next older one is undone.
    pub fn undo(&mut self, layers: &mut LayerStack) -> Option<String> {
        while self.applied > 0 {
            let idx = self.applied - 1;
            match swap_into_layer(&mut self.actions[idx], layers) {
                Swap::Done => {
                    self.applied = idx;
                    return Some(self.actions[idx].tag.clone());
                }
                Swap::Locked => return None,
                Swap::LayerGone => {
                    self.actions.remove(idx);
                    self.applied = idx;
                }
            }
        }
        None
    }

    /// Re-apply the next undone action, restoring the state right after it.
    /// Actions whose layer has been deleted are dropped.
    pub fn redo(&mut self, layers: &mut LayerStack) -> Option<String> {
        while self.applied < self.actions.len() {
            let idx = self.applied;
            match swap_into_layer(&mut self.actions[idx], layers) {
                Swap::Done => {
                    self.applied = idx + 1;
                    return Some(self.actions[idx].tag.clone());
                }
                Swap::Locked => return None,
                Swap::LayerGone => {
                    self.actions.remove(idx);
                }
            }
        }
        None
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.actions.len()
    }

    /// Index of the last applied action (`None` = before the first).
    pub fn position(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.position().map(|i| self.actions[i].tag.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.actions.get(self.applied).map(|a| a.tag.as_str())
    }

    /// Tags of applied actions, most recent first.
    pub fn undo_history(&self) -> Vec<&str> {
        self.actions
            .iter()
            .take(self.applied)
            .rev()
            .map(|a| a.tag.as_str())
            .collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.actions.iter().map(HistoryAction::memory_size).sum()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.applied = 0;
    }
}

enum Swap {
    Done,
    Locked,
    LayerGone,
}

/// Exchange the action's snapshot with the target layer's live pixels.
fn swap_into_layer(action: &mut HistoryAction, layers: &mut LayerStack) -> Swap {
    let Some(layer) = layers
        .index_of(action.layer_id)
        .and_then(|index| layers.get_mut(index))
    else {
        log::debug!("history: layer for '{}' no longer exists, dropping it", action.tag);
        return Swap::LayerGone;
    };
    if layer.locked {
        log::debug!("history: '{}' skipped, layer '{}' is locked", action.tag, layer.name);
        return Swap::Locked;
    }
    std::mem::swap(&mut layer.pixels, &mut action.snapshot);
    Swap::Done
}
