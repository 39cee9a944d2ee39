//! Stack-order arithmetic shared by the engine, layer list, and search pipeline.
//!
//! Ordering runs in two tiers. Inserts and bring-to-front take `max + 1`
//! (coarse tier, gaps allowed). An explicit layer reorder renumbers the whole
//! board densely to `0..n` (fine tier); that is the only place density is restored.
//!
//! Every function here takes the board's items as currently stored, in
//! ascending query order. Callers must read them right before writing.

#[cfg(test)]
#[path = "ordering_test.rs"]
mod ordering_test;

use crate::consts::FIRST_STACK_ORDER;
use crate::doc::{Item, ItemId, StackOrder};

/// Highest stack order on the board, if any.
#[must_use]
pub fn top_stack_order(items: &[Item]) -> Option<StackOrder> {
    items.iter().map(|i| i.stack_order).max()
}

/// Stack order for a new item placed above everything else.
#[must_use]
pub fn next_stack_order(items: &[Item]) -> StackOrder {
    top_stack_order(items).map_or(FIRST_STACK_ORDER, |top| top + 1)
}

/// Stack order that brings `id` to the front, or `None` when it is already
/// strictly above every sibling (or not on the board).
#[must_use]
pub fn front_order(items: &[Item], id: ItemId) -> Option<StackOrder> {
    let current = items.iter().find(|i| i.id == id)?.stack_order;
    let siblings_top = items
        .iter()
        .filter(|i| i.id != id)
        .map(|i| i.stack_order)
        .max()?;
    (siblings_top >= current).then_some(siblings_top + 1)
}

/// Panel order: topmost item first.
#[must_use]
pub fn visual_order(items: &[Item]) -> Vec<ItemId> {
    items.iter().rev().map(|i| i.id).collect()
}

/// Whether the board's stack orders are exactly `0..n` in query order.
#[must_use]
pub fn is_dense(items: &[Item]) -> bool {
    items
        .iter()
        .zip(0..)
        .all(|(item, expected): (&Item, StackOrder)| item.stack_order == expected)
}

/// Move `dragged` to `drop_index` in visual order and renumber densely.
///
/// `drop_index` is an insertion slot in the visual order *before* removal
/// (`0..=n`); it is clamped to that range. Returns the `(id, new_order)` pairs
/// that differ from what is stored, or `None` when the drop leaves the item
/// where it is or the item is not on the board.
#[must_use]
pub fn reorder(items: &[Item], dragged: ItemId, drop_index: usize) -> Option<Vec<(ItemId, StackOrder)>> {
    let mut visual = visual_order(items);
    let old_index = visual.iter().position(|id| *id == dragged)?;
    let drop_index = drop_index.min(visual.len());
    let target = if old_index < drop_index { drop_index - 1 } else { drop_index };
    if target == old_index {
        return None;
    }

    let moved = visual.remove(old_index);
    visual.insert(target, moved);

    let changes = visual
        .iter()
        .rev()
        .zip(0..)
        .filter_map(|(id, order): (&ItemId, StackOrder)| {
            let current = items.iter().find(|i| i.id == *id)?.stack_order;
            (current != order).then_some((*id, order))
        })
        .collect();
    Some(changes)
}
