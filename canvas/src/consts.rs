//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest zoom factor the wheel can reach.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom factor the wheel can reach.
pub const MAX_ZOOM: f64 = 8.0;

/// Zoom multiplier per 100 px of wheel delta.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── Item placement ──────────────────────────────────────────────

/// Width and height of a freshly placed image, in world units.
pub const DEFAULT_ITEM_SIZE: f64 = 250.0;

/// Smallest width/height the resize gesture will produce.
pub const MIN_ITEM_SIZE: f64 = 20.0;

/// World-space origin offset for dropped images.
pub const DROP_ORIGIN: f64 = 100.0;

/// Per-item cascade so consecutive drops don't land on top of each other.
pub const DROP_CASCADE: f64 = 10.0;

/// Stack order given to the first item on an empty board.
pub const FIRST_STACK_ORDER: i64 = 1;

// ── Layer list ──────────────────────────────────────────────────

/// Height of one row in the layer list, in CSS pixels.
pub const LAYER_ROW_HEIGHT: f64 = 56.0;

/// Vertical gap between layer rows.
pub const LAYER_ROW_GAP: f64 = 8.0;

/// Padding above the first layer row.
pub const LAYER_LIST_PADDING: f64 = 12.0;

/// Distance from the list edge that triggers auto-scroll while dragging.
pub const LAYER_AUTOSCROLL_ZONE: f64 = 40.0;

/// Pixels scrolled per pointer move inside the auto-scroll zone.
pub const LAYER_AUTOSCROLL_STEP: f64 = 5.0;

/// Below the last row, a pointer this close to the list bottom drops at the end.
pub const LAYER_DROP_END_ZONE: f64 = 50.0;

// ── Side panels ─────────────────────────────────────────────────

/// Fraction of the viewport width that counts as "near the edge" for peeking.
pub const PEEK_THRESHOLD_FRACTION: f64 = 0.05;

/// Maximum distance a collapsed panel's toggle peeks out, in pixels.
pub const PEEK_MAX_OFFSET: f64 = 40.0;

/// Extra toggle scale at full peek.
pub const PEEK_MAX_SCALE_BOOST: f64 = 0.2;
