//! Input model: modifier keys, mouse buttons, and the gesture state machine.
//!
//! `InputState` is the single active gesture shared by every global
//! pointer-move/up listener: item drag, item resize, camera pan, side-panel
//! resize, and layer-row drag. Only the pointer-down that started a gesture
//! sets it, so exactly one component interprets each move/up sequence. Each
//! active variant carries the context needed to compute the local preview and
//! to emit the final store write on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::ItemId;
use crate::hit::ResizeAnchor;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// The two resizable side panels around the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelId {
    /// Layer list on the left edge.
    Layers,
    /// Image library on the right edge.
    Library,
}

/// UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// The id of the currently selected item, if any.
    pub selected_id: Option<ItemId>,
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Resize by dragging `anchor` by `(dx, dy)` world units. The opposite
    /// edges stay put; each dimension is clamped to at least `min_size`, or to
    /// its current size when that is already smaller. An axis the drag does
    /// not change keeps its exact original values.
    #[must_use]
    pub fn resized(self, anchor: ResizeAnchor, dx: f64, dy: f64, min_size: f64) -> Rect {
        let (x, width) = resize_span(
            self.x,
            self.width,
            dx,
            min_size.min(self.width),
            anchor.moves_left(),
            anchor.moves_right(),
        );
        let (y, height) = resize_span(
            self.y,
            self.height,
            dy,
            min_size.min(self.height),
            anchor.moves_top(),
            anchor.moves_bottom(),
        );
        Rect { x, y, width, height }
    }
}

/// One axis of [`Rect::resized`]: `(start, length)` after moving the start or
/// end edge by `delta`.
fn resize_span(start: f64, length: f64, delta: f64, min: f64, moves_start: bool, moves_end: bool) -> (f64, f64) {
    if delta == 0.0 || !(moves_start || moves_end) {
        return (start, length);
    }
    if moves_start {
        let inward = delta.min(length - min);
        if inward == 0.0 {
            return (start, length);
        }
        (start + inward, length - inward)
    } else {
        (start, (length + delta).max(min))
    }
}

/// The active gesture.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging empty canvas moves the camera.
    Panning {
        /// Canvas-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving an item. Only `current` changes until release.
    DraggingItem {
        id: ItemId,
        /// World-space pointer position at grab time.
        start_world: Point,
        /// Item position at grab time; releasing here writes nothing.
        origin: Point,
        /// Preview position.
        current: Point,
    },
    /// Resizing an item by one of its eight handles.
    ResizingItem {
        id: ItemId,
        anchor: ResizeAnchor,
        /// World-space pointer position at grab time.
        start_world: Point,
        /// Bounding box at grab time.
        orig: Rect,
        /// Preview bounding box.
        current: Rect,
    },
    /// Dragging a side panel's resize handle.
    PanelResizing { panel: PanelId },
    /// Dragging a row in the layer list.
    ReorderingLayer { id: ItemId },
}

impl InputState {
    /// Whether a gesture is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// The preview rectangle for `id`, if the active gesture is moving or resizing it.
    #[must_use]
    pub fn preview_for(&self, id: ItemId, width: f64, height: f64) -> Option<Rect> {
        match *self {
            Self::DraggingItem { id: dragged, current, .. } if dragged == id => {
                Some(Rect { x: current.x, y: current.y, width, height })
            }
            Self::ResizingItem { id: resized, current, .. } if resized == id => Some(current),
            _ => None,
        }
    }
}
