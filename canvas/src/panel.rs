//! Side panels: resizable, collapsible, with a proximity "peek" toggle.
//!
//! The layer list sits on the left edge, the image library on the right. Both
//! resize through a ghost width that follows the pointer and is committed on
//! release. A collapsed panel's toggle slides out as the pointer approaches
//! its screen edge.

#[cfg(test)]
#[path = "panel_test.rs"]
mod panel_test;

use crate::consts::{PEEK_MAX_OFFSET, PEEK_MAX_SCALE_BOOST, PEEK_THRESHOLD_FRACTION};

/// Which screen edge a panel is docked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEdge {
    Left,
    Right,
}

/// Upper bound on a panel's width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxWidth {
    /// Fixed pixel width.
    Fixed(f64),
    /// Fraction of the viewport width.
    Fraction(f64),
}

/// How far a collapsed panel's toggle is peeking out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peek {
    /// Distance the toggle has slid in from the edge, in pixels.
    pub offset: f64,
    /// Toggle scale factor (1.0 = resting).
    pub button_scale: f64,
}

impl Default for Peek {
    fn default() -> Self {
        Self { offset: 0.0, button_scale: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub struct SidePanel {
    edge: PanelEdge,
    min_width: f64,
    max_width: MaxWidth,
    open: bool,
    width: f64,
    ghost_width: Option<f64>,
    peek: Peek,
}

impl SidePanel {
    #[must_use]
    pub fn new(edge: PanelEdge, width: f64, min_width: f64, max_width: MaxWidth) -> Self {
        Self { edge, min_width, max_width, open: true, width, ghost_width: None, peek: Peek::default() }
    }

    /// The left-docked layer list: 256 px, resizable between 180 and 500 px.
    #[must_use]
    pub fn layers() -> Self {
        Self::new(PanelEdge::Left, 256.0, 180.0, MaxWidth::Fixed(500.0))
    }

    /// The right-docked library: 320 px, resizable between 200 px and 90% of the viewport.
    #[must_use]
    pub fn library() -> Self {
        Self::new(PanelEdge::Right, 320.0, 200.0, MaxWidth::Fraction(0.9))
    }

    #[must_use]
    pub fn edge(&self) -> PanelEdge {
        self.edge
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Committed width. Unchanged while a resize is in progress.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Width to draw the resize ghost at, while resizing.
    #[must_use]
    pub fn ghost_width(&self) -> Option<f64> {
        self.ghost_width
    }

    #[must_use]
    pub fn is_resizing(&self) -> bool {
        self.ghost_width.is_some()
    }

    #[must_use]
    pub fn peek(&self) -> Peek {
        self.peek
    }

    /// Width the panel would take with the pointer at `pointer_x`.
    #[must_use]
    pub fn width_for_pointer(&self, pointer_x: f64, viewport_width: f64) -> f64 {
        let raw = match self.edge {
            PanelEdge::Left => pointer_x,
            PanelEdge::Right => viewport_width - pointer_x,
        };
        let max = match self.max_width {
            MaxWidth::Fixed(px) => px,
            MaxWidth::Fraction(f) => viewport_width * f,
        };
        raw.min(max).max(self.min_width)
    }

    /// Start a resize; the ghost starts at the committed width. No-op when collapsed.
    pub fn begin_resize(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.ghost_width = Some(self.width);
        true
    }

    /// Move the ghost to follow the pointer.
    pub fn resize_to(&mut self, pointer_x: f64, viewport_width: f64) {
        if self.ghost_width.is_some() {
            self.ghost_width = Some(self.width_for_pointer(pointer_x, viewport_width));
        }
    }

    /// Commit the ghost width. Returns the new width if a resize was active.
    pub fn end_resize(&mut self) -> Option<f64> {
        let ghost = self.ghost_width.take()?;
        self.width = ghost;
        Some(ghost)
    }

    /// Drop the ghost and keep the committed width.
    pub fn cancel_resize(&mut self) {
        self.ghost_width = None;
    }

    /// Recompute the peek for a pointer at `pointer_x`. Only a collapsed,
    /// non-resizing panel peeks; otherwise the peek is reset.
    pub fn update_peek(&mut self, pointer_x: f64, viewport_width: f64) {
        if self.open || self.is_resizing() || viewport_width <= 0.0 {
            self.peek = Peek::default();
            return;
        }
        let threshold = viewport_width * PEEK_THRESHOLD_FRACTION;
        let distance = match self.edge {
            PanelEdge::Left => pointer_x,
            PanelEdge::Right => viewport_width - pointer_x,
        };
        if distance > threshold || distance < 0.0 {
            self.peek = Peek::default();
            return;
        }
        let power = 1.0 - distance / threshold;
        self.peek = Peek {
            offset: power * PEEK_MAX_OFFSET,
            button_scale: 1.0 + power * PEEK_MAX_SCALE_BOOST,
        };
    }

    /// Open or collapse the panel. Cancels any resize and resets the peek.
    pub fn toggle(&mut self) {
        self.open = !self.open;
        self.ghost_width = None;
        self.peek = Peek::default();
    }
}
