//! Layer list: the side panel showing a board's items topmost-first, with
//! drag-to-reorder and inline rename.
//!
//! While a row is dragged only the local drop index changes. On release
//! [`commit_reorder`] re-reads the board from the store, moves the dragged
//! item, and renumbers every item densely. It persists only the records whose
//! order changed.

#[cfg(test)]
#[path = "layers_test.rs"]
mod layers_test;

use tracing::{debug, warn};

use crate::consts::{
    LAYER_AUTOSCROLL_STEP, LAYER_AUTOSCROLL_ZONE, LAYER_DROP_END_ZONE, LAYER_LIST_PADDING, LAYER_ROW_GAP,
    LAYER_ROW_HEIGHT,
};
use crate::doc::{BoardId, Item, ItemId, PartialItem, StackOrder};
use crate::ordering;
use crate::store::{ItemStore, PersistenceError};

const ROW_PITCH: f64 = LAYER_ROW_HEIGHT + LAYER_ROW_GAP;

/// One rendered row of the layer list.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRow {
    pub id: ItemId,
    pub name: String,
    /// Top edge in list-content coordinates (before scrolling).
    pub top: f64,
    /// Row is being dragged and renders dimmed.
    pub is_dragged: bool,
    /// Row is in inline-rename mode.
    pub is_renaming: bool,
}

#[derive(Debug, Clone)]
struct RenameDraft {
    id: ItemId,
    text: String,
}

/// Drag, scroll, and rename state for the layer list.
#[derive(Debug, Clone, Default)]
pub struct LayerList {
    top: f64,
    height: f64,
    scroll_top: f64,
    dragged: Option<ItemId>,
    drop_index: Option<usize>,
    rename: Option<RenameDraft>,
}

impl LayerList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the list's scroll viewport: window-space top edge and visible height.
    pub fn set_viewport(&mut self, top: f64, height: f64) {
        self.top = top;
        self.height = height.max(0.0);
    }

    #[must_use]
    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    /// Scroll position reported by the host.
    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.max(0.0);
    }

    #[must_use]
    pub fn dragged(&self) -> Option<ItemId> {
        self.dragged
    }

    /// Insertion slot in visual order (`0..=n`) the dragged row would drop into.
    #[must_use]
    pub fn drop_index(&self) -> Option<usize> {
        self.drop_index
    }

    /// Total content height for `count` rows.
    #[must_use]
    pub fn content_height(count: usize) -> f64 {
        if count == 0 {
            return 2.0 * LAYER_LIST_PADDING;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        2.0 * LAYER_LIST_PADDING + n * LAYER_ROW_HEIGHT + (n - 1.0) * LAYER_ROW_GAP
    }

    /// Top edge of row `index` in content coordinates.
    #[must_use]
    pub fn row_top(index: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let i = index as f64;
        LAYER_LIST_PADDING + i * ROW_PITCH
    }

    /// Rows in panel order (topmost item first) for `items` in ascending stack order.
    #[must_use]
    pub fn rows(&self, items: &[Item]) -> Vec<LayerRow> {
        items
            .iter()
            .rev()
            .enumerate()
            .map(|(index, item)| LayerRow {
                id: item.id,
                name: item.name.clone(),
                top: Self::row_top(index),
                is_dragged: self.dragged == Some(item.id),
                is_renaming: self.rename.as_ref().is_some_and(|r| r.id == item.id),
            })
            .collect()
    }

    // --- Drag ---

    /// Start dragging a row. Ignored while another row is being dragged.
    pub fn begin_drag(&mut self, id: ItemId) -> bool {
        if self.dragged.is_some() {
            return false;
        }
        self.dragged = Some(id);
        self.drop_index = None;
        true
    }

    /// Track the pointer at window-space `pointer_y` over a list of `row_count`
    /// rows. Near the top or bottom edge the list auto-scrolls first. Returns
    /// the current drop index.
    pub fn drag_to(&mut self, pointer_y: f64, row_count: usize) -> Option<usize> {
        self.dragged?;
        let local_y = pointer_y - self.top;

        let max_scroll = (Self::content_height(row_count) - self.height).max(0.0);
        if local_y < LAYER_AUTOSCROLL_ZONE {
            self.scroll_top = (self.scroll_top - LAYER_AUTOSCROLL_STEP).max(0.0);
        } else if local_y > self.height - LAYER_AUTOSCROLL_ZONE {
            self.scroll_top = (self.scroll_top + LAYER_AUTOSCROLL_STEP).min(max_scroll);
        }

        if let Some(index) = self.slot_at(local_y, row_count) {
            self.drop_index = Some(index);
        }
        self.drop_index
    }

    /// Drop slot under list-local `local_y`, or `None` when the pointer is
    /// over padding or empty space that doesn't map to a slot.
    fn slot_at(&self, local_y: f64, row_count: usize) -> Option<usize> {
        let content_y = local_y + self.scroll_top;
        if row_count == 0 || content_y < LAYER_LIST_PADDING {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let row = ((content_y - LAYER_LIST_PADDING) / ROW_PITCH).floor() as usize;
        if row >= row_count {
            return (local_y > self.height - LAYER_DROP_END_ZONE).then_some(row_count);
        }
        let midpoint = Self::row_top(row) + LAYER_ROW_HEIGHT / 2.0;
        Some(if content_y < midpoint { row } else { row + 1 })
    }

    /// End the drag and hand back `(dragged, drop_index)` if a drop slot was reached.
    pub fn finish_drag(&mut self) -> Option<(ItemId, usize)> {
        let dragged = self.dragged.take();
        let drop = self.drop_index.take();
        dragged.zip(drop)
    }

    pub fn cancel_drag(&mut self) {
        self.dragged = None;
        self.drop_index = None;
    }

    // --- Rename ---

    /// Enter rename mode for a row, seeded with its current name.
    pub fn begin_rename(&mut self, id: ItemId, current_name: &str) {
        self.rename = Some(RenameDraft { id, text: current_name.to_string() });
    }

    pub fn edit_rename(&mut self, text: &str) {
        if let Some(draft) = self.rename.as_mut() {
            draft.text = text.to_string();
        }
    }

    #[must_use]
    pub fn rename_text(&self) -> Option<&str> {
        self.rename.as_ref().map(|r| r.text.as_str())
    }

    /// Leave rename mode. Returns the trimmed name to save, or `None` when
    /// there was no draft or the draft is blank.
    pub fn commit_rename(&mut self) -> Option<(ItemId, String)> {
        let draft = self.rename.take()?;
        let name = draft.text.trim();
        (!name.is_empty()).then(|| (draft.id, name.to_string()))
    }

    pub fn cancel_rename(&mut self) {
        self.rename = None;
    }
}

/// Move `dragged` to `drop_index` (visual order) and renumber the board to `0..n`.
///
/// Reads the board from the store at call time. Returns how many records were
/// written; `0` when the drop leaves the item in place or the item is gone.
/// If a write fails, the records already written are restored to their
/// previous order before the error is returned.
///
/// # Errors
///
/// The first `PersistenceError` the store reports.
pub fn commit_reorder(
    store: &dyn ItemStore,
    board_id: BoardId,
    dragged: ItemId,
    drop_index: usize,
) -> Result<usize, PersistenceError> {
    let items = store.query(board_id);
    let Some(changes) = ordering::reorder(&items, dragged, drop_index) else {
        return Ok(0);
    };

    let mut applied: Vec<(ItemId, StackOrder)> = Vec::with_capacity(changes.len());
    for &(id, order) in &changes {
        let previous = items
            .iter()
            .find(|i| i.id == id)
            .map_or(order, |i| i.stack_order);
        match store.update(id, &PartialItem::stack_order(order)) {
            Ok(_) => applied.push((id, previous)),
            Err(e) => {
                warn!(%board_id, %id, error = %e, reverted = applied.len(), "layer reorder failed; reverting");
                for &(id, previous) in applied.iter().rev() {
                    if let Err(revert) = store.update(id, &PartialItem::stack_order(previous)) {
                        warn!(%id, error = %revert, "could not revert stack order");
                    }
                }
                return Err(e);
            }
        }
    }

    debug!(%board_id, %dragged, drop_index, written = changes.len(), "layers reordered");
    Ok(changes.len())
}
