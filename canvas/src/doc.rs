//! Document model: boards, placed items, and sparse updates.
//!
//! This module defines what lives in the item store: `Board` (the editable
//! canvas unit), `Item` (one placed image with geometry and stacking order),
//! the per-item `SearchSettings` carried for similarity search, and the sparse
//! update types (`PartialItem`, `PartialBoard`) that every writer goes through.
//!
//! Data flows into this layer from the interaction engine, the layer list, and
//! the search pipeline. Views read it back through store snapshots.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an item.
pub type ItemId = Uuid;

/// Unique identifier for a board.
pub type BoardId = Uuid;

/// Stacking key. Higher values draw above lower ones.
pub type StackOrder = i64;

/// Default similarity balance between pose and text similarity.
pub const DEFAULT_SIMILARITY_BALANCE: f64 = 0.95;

/// Default number of results requested per search.
pub const DEFAULT_RESULT_COUNT: u32 = 4;

/// Name given to boards created without one.
pub const DEFAULT_BOARD_NAME: &str = "Untitled Board";

/// The kind of a placed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A raster image owned by the item.
    #[default]
    Image,
}

/// A named collection of placed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    /// Optional image reference shown in the board list. Empty when unset.
    #[serde(default)]
    pub thumbnail: String,
    /// Creation time in Unix milliseconds.
    pub created_at: i64,
}

impl Board {
    /// Build a board with a fresh id and no thumbnail.
    #[must_use]
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), thumbnail: String::new(), created_at }
    }
}

/// Per-item configuration for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Free-text prompt sent alongside the image. `None` or blank uses the default prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_text: Option<String>,
    /// Weight in `[0, 1]` between pose similarity (1.0) and text similarity (0.0).
    pub similarity_balance: f64,
    /// How many results to request.
    pub result_count: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            description_text: None,
            similarity_balance: DEFAULT_SIMILARITY_BALANCE,
            result_count: DEFAULT_RESULT_COUNT,
        }
    }
}

/// A placed image on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Owning board. Never changes after creation.
    pub board_id: BoardId,
    pub kind: ItemKind,
    /// Raw encoded image bytes (PNG, JPEG, ...).
    #[serde(with = "payload")]
    pub image: Vec<u8>,
    pub name: String,
    /// Left edge in board-local world coordinates.
    pub x: f64,
    /// Top edge in board-local world coordinates.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub stack_order: StackOrder,
    #[serde(flatten)]
    pub search: SearchSettings,
}

impl Item {
    /// Build an image item with default search settings.
    #[must_use]
    pub fn image(board_id: BoardId, image: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id,
            kind: ItemKind::Image,
            image,
            name: name.into(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            stack_order: 0,
            search: SearchSettings::default(),
        }
    }

    /// Set the bounding box.
    #[must_use]
    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    /// Set the stack order.
    #[must_use]
    pub fn with_stack_order(mut self, stack_order: StackOrder) -> Self {
        self.stack_order = stack_order;
        self
    }

    /// Whether position and size are all finite.
    #[must_use]
    pub fn has_finite_geometry(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Whether the world-space point lies inside the bounding box (edges inclusive).
    #[must_use]
    pub fn contains(&self, wx: f64, wy: f64) -> bool {
        wx >= self.x && wx <= self.x + self.width && wy >= self.y && wy <= self.y + self.height
    }
}

/// Sparse update for an item. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_order: Option<StackOrder>,
    /// `Some(None)` clears the description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_text: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u32>,
}

impl PartialItem {
    /// A position-only update.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }

    /// A full bounding-box update.
    #[must_use]
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x: Some(x), y: Some(y), width: Some(width), height: Some(height), ..Default::default() }
    }

    /// A stack-order-only update.
    #[must_use]
    pub fn stack_order(stack_order: StackOrder) -> Self {
        Self { stack_order: Some(stack_order), ..Default::default() }
    }

    /// Returns `true` when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check field values without applying them. Returns the offending field name.
    pub fn validate(&self) -> Result<(), &'static str> {
        let geometry = [("x", self.x), ("y", self.y), ("width", self.width), ("height", self.height)];
        for (field, value) in geometry {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(field);
            }
        }
        if self
            .similarity_balance
            .is_some_and(|b| !(0.0..=1.0).contains(&b))
        {
            return Err("similarity_balance");
        }
        Ok(())
    }

    /// Apply the present fields to `item`. Call [`PartialItem::validate`] first.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(ref name) = self.name {
            item.name.clone_from(name);
        }
        if let Some(x) = self.x {
            item.x = x;
        }
        if let Some(y) = self.y {
            item.y = y;
        }
        if let Some(w) = self.width {
            item.width = w;
        }
        if let Some(h) = self.height {
            item.height = h;
        }
        if let Some(z) = self.stack_order {
            item.stack_order = z;
        }
        if let Some(ref text) = self.description_text {
            item.search.description_text.clone_from(text);
        }
        if let Some(b) = self.similarity_balance {
            item.search.similarity_balance = b;
        }
        if let Some(k) = self.result_count {
            item.search.result_count = k;
        }
    }
}

/// Sparse update for a board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialBoard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl PartialBoard {
    pub fn apply_to(&self, board: &mut Board) {
        if let Some(ref name) = self.name {
            board.name.clone_from(name);
        }
        if let Some(ref thumbnail) = self.thumbnail {
            board.thumbnail.clone_from(thumbnail);
        }
    }
}

/// Serde adapter storing image bytes as standard base64 text.
mod payload {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
