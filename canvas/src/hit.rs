//! Hit-testing pointer positions against placed items.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::HANDLE_RADIUS_PX;
use crate::doc::{Item, ItemId};

/// Which part of an item was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    pub const ALL: [ResizeAnchor; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    /// Handle position on the item's bounding box in world space.
    #[must_use]
    pub fn handle_point(self, item: &Item) -> Point {
        let cx = item.x + item.width / 2.0;
        let cy = item.y + item.height / 2.0;
        let right = item.x + item.width;
        let bottom = item.y + item.height;
        match self {
            Self::N => Point::new(cx, item.y),
            Self::Ne => Point::new(right, item.y),
            Self::E => Point::new(right, cy),
            Self::Se => Point::new(right, bottom),
            Self::S => Point::new(cx, bottom),
            Self::Sw => Point::new(item.x, bottom),
            Self::W => Point::new(item.x, cy),
            Self::Nw => Point::new(item.x, item.y),
        }
    }

    /// Whether dragging this handle moves the left edge.
    #[must_use]
    pub fn moves_left(self) -> bool {
        matches!(self, Self::Nw | Self::W | Self::Sw)
    }

    /// Whether dragging this handle moves the right edge.
    #[must_use]
    pub fn moves_right(self) -> bool {
        matches!(self, Self::Ne | Self::E | Self::Se)
    }

    /// Whether dragging this handle moves the top edge.
    #[must_use]
    pub fn moves_top(self) -> bool {
        matches!(self, Self::Nw | Self::N | Self::Ne)
    }

    /// Whether dragging this handle moves the bottom edge.
    #[must_use]
    pub fn moves_bottom(self) -> bool {
        matches!(self, Self::Sw | Self::S | Self::Se)
    }

    /// CSS cursor shown while hovering or dragging this handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::N | Self::S => "ns-resize",
            Self::E | Self::W => "ew-resize",
            Self::Ne | Self::Sw => "nesw-resize",
            Self::Nw | Self::Se => "nwse-resize",
        }
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub item_id: ItemId,
    pub part: HitPart,
}

/// Find the topmost item under `world_pt`.
///
/// `items` must be in ascending stack order (as the store returns them); they
/// are scanned from the top down. For each item its resize handles are tested
/// first (within [`HANDLE_RADIUS_PX`] screen pixels), then its body, so a
/// handle that overhangs the item edge still wins over whatever lies beneath.
#[must_use]
pub fn hit_test(world_pt: Point, items: &[Item], camera: &Camera) -> Option<Hit> {
    let slop = camera.screen_dist_to_world(HANDLE_RADIUS_PX);
    items.iter().rev().find_map(|item| {
        ResizeAnchor::ALL
            .into_iter()
            .find(|anchor| {
                let h = anchor.handle_point(item);
                (world_pt.x - h.x).abs() <= slop && (world_pt.y - h.y).abs() <= slop
            })
            .map(|anchor| Hit { item_id: item.id, part: HitPart::ResizeHandle(anchor) })
            .or_else(|| {
                item.contains(world_pt.x, world_pt.y)
                    .then_some(Hit { item_id: item.id, part: HitPart::Body })
            })
    })
}
