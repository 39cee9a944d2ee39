//! Board engine: turns raw pointer, wheel, and key events into store mutations.
//!
//! One `Engine` serves one open board. It owns the camera, the single active
//! gesture (`InputState`), the layer list, and both side panels, and it writes
//! through the shared [`ItemStore`]. Pointer coordinates are window
//! coordinates; the canvas origin set by the host maps them onto the canvas.
//!
//! Intermediate pointer moves only change local previews. Every committed
//! change is one store call made on release, using values read from the store
//! at that moment rather than at gesture start.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::camera::{Camera, Point};
use crate::consts::{DEFAULT_ITEM_SIZE, DROP_CASCADE, DROP_ORIGIN, MIN_ITEM_SIZE, WHEEL_ZOOM_STEP};
use crate::doc::{BoardId, Item, ItemId, PartialItem, SearchSettings};
use crate::hit::{HitPart, hit_test};
use crate::input::{Button, InputState, Key, Modifiers, PanelId, Rect, UiState, WheelDelta};
use crate::layers::{self, LayerList};
use crate::ordering;
use crate::panel::SidePanel;
use crate::store::{ItemStore, PersistenceError};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    SetCursor(String),
    ItemCommitted { id: ItemId, fields: PartialItem },
    ItemDeleted { id: ItemId },
    LayersReordered { written: usize },
    PanelResized { panel: PanelId, width: f64 },
    /// A store write failed; the mutation was dropped.
    PersistenceFailed(PersistenceError),
}

/// One entry of the draw list.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub item: Item,
    /// World-space bounds with any in-progress drag/resize preview applied.
    pub rect: Rect,
    /// Canvas-space bounds after the camera transform.
    pub screen: Rect,
    pub selected: bool,
}

pub struct Engine {
    store: Arc<dyn ItemStore>,
    board_id: BoardId,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub layers: LayerList,
    pub layers_panel: SidePanel,
    pub library_panel: SidePanel,
    canvas_origin: Point,
    window_width: f64,
}

impl Engine {
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>, board_id: BoardId) -> Self {
        Self {
            store,
            board_id,
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            layers: LayerList::new(),
            layers_panel: SidePanel::layers(),
            library_panel: SidePanel::library(),
            canvas_origin: Point::default(),
            window_width: 0.0,
        }
    }

    #[must_use]
    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    // --- Viewport ---

    /// Window width, used by panel resizing and peeking.
    pub fn set_window_width(&mut self, width: f64) {
        self.window_width = width;
    }

    /// Window-space position of the canvas element's top-left corner.
    pub fn set_canvas_origin(&mut self, origin: Point) {
        self.canvas_origin = origin;
    }

    fn to_canvas(&self, window_pt: Point) -> Point {
        window_pt.minus(self.canvas_origin)
    }

    fn to_world(&self, window_pt: Point) -> Point {
        self.camera.screen_to_world(self.to_canvas(window_pt))
    }

    fn panel_mut(&mut self, panel: PanelId) -> &mut SidePanel {
        match panel {
            PanelId::Layers => &mut self.layers_panel,
            PanelId::Library => &mut self.library_panel,
        }
    }

    // --- Queries ---

    /// The board's items in ascending stack order, straight from the store.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.store.query(self.board_id)
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.store.item(id)
    }

    #[must_use]
    pub fn selection(&self) -> Option<ItemId> {
        self.ui.selected_id
    }

    /// Draw list in ascending stack order with the active preview applied.
    #[must_use]
    pub fn scene(&self) -> Vec<SceneItem> {
        self.items()
            .into_iter()
            .map(|item| {
                let rect = self
                    .input
                    .preview_for(item.id, item.width, item.height)
                    .unwrap_or(Rect { x: item.x, y: item.y, width: item.width, height: item.height });
                let corner = self.camera.world_to_screen(Point::new(rect.x, rect.y));
                let screen = Rect {
                    x: corner.x,
                    y: corner.y,
                    width: rect.width * self.camera.zoom,
                    height: rect.height * self.camera.zoom,
                };
                let selected = self.ui.selected_id == Some(item.id);
                SceneItem { item, rect, screen, selected }
            })
            .collect()
    }

    // --- Pointer input ---

    /// Pointer-down on the canvas. Starts a drag, resize, or pan and brings a
    /// hit item to the front. Ignored while another gesture is active.
    pub fn on_pointer_down(&mut self, window_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if self.input.is_active() || !is_finite(window_pt) {
            return Vec::new();
        }
        let local = self.to_canvas(window_pt);

        match button {
            Button::Secondary => Vec::new(),
            Button::Middle => {
                self.input = InputState::Panning { last_screen: local };
                vec![Action::SetCursor("grabbing".into())]
            }
            Button::Primary => {
                let world = self.to_world(window_pt);
                let items = self.items();
                let Some(hit) = hit_test(world, &items, &self.camera) else {
                    self.ui.selected_id = None;
                    self.input = InputState::Panning { last_screen: local };
                    return vec![Action::SetCursor("grabbing".into()), Action::RenderNeeded];
                };
                let Some(item) = items.iter().find(|i| i.id == hit.item_id) else {
                    return Vec::new();
                };

                self.ui.selected_id = Some(item.id);
                let mut actions = self.bring_to_front(item.id);

                let cursor = match hit.part {
                    HitPart::Body => {
                        let origin = Point::new(item.x, item.y);
                        self.input = InputState::DraggingItem {
                            id: item.id,
                            start_world: world,
                            origin,
                            current: origin,
                        };
                        "grabbing"
                    }
                    HitPart::ResizeHandle(anchor) => {
                        let orig = Rect { x: item.x, y: item.y, width: item.width, height: item.height };
                        self.input = InputState::ResizingItem {
                            id: item.id,
                            anchor,
                            start_world: world,
                            orig,
                            current: orig,
                        };
                        anchor.cursor()
                    }
                };
                actions.push(Action::SetCursor(cursor.into()));
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    /// Global pointer-move. Routed to whichever gesture is active; with none
    /// active it drives the collapsed panels' peek.
    pub fn on_pointer_move(&mut self, window_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        if !is_finite(window_pt) {
            return Vec::new();
        }
        let local = self.to_canvas(window_pt);
        let world = self.to_world(window_pt);

        match self.input {
            InputState::Idle => {
                let before = (self.layers_panel.peek(), self.library_panel.peek());
                self.layers_panel.update_peek(window_pt.x, self.window_width);
                self.library_panel.update_peek(window_pt.x, self.window_width);
                if before == (self.layers_panel.peek(), self.library_panel.peek()) {
                    return Vec::new();
                }
            }
            InputState::Panning { ref mut last_screen } => {
                let delta = local.minus(*last_screen);
                *last_screen = local;
                self.camera.pan_by(delta.x, delta.y);
            }
            InputState::DraggingItem { start_world, origin, ref mut current, .. } => {
                *current = drag_target(origin, start_world, world);
            }
            InputState::ResizingItem { anchor, start_world, orig, ref mut current, .. } => {
                let d = world.minus(start_world);
                *current = orig.resized(anchor, d.x, d.y, MIN_ITEM_SIZE);
            }
            InputState::PanelResizing { panel } => {
                let window_width = self.window_width;
                self.panel_mut(panel).resize_to(window_pt.x, window_width);
            }
            InputState::ReorderingLayer { .. } => {
                let count = self.items().len();
                self.layers.drag_to(window_pt.y, count);
            }
        }
        vec![Action::RenderNeeded]
    }

    /// Global pointer-up. Releases the active gesture wherever the pointer is
    /// and commits its result.
    pub fn on_pointer_up(&mut self, window_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let state = std::mem::take(&mut self.input);
        let world = is_finite(window_pt).then(|| self.to_world(window_pt));
        let mut actions = Vec::new();

        match state {
            InputState::Idle => return actions,
            InputState::Panning { .. } => {}
            InputState::DraggingItem { id, start_world, origin, current } => {
                let target = world.map_or(current, |w| drag_target(origin, start_world, w));
                if target != origin && is_finite(target) {
                    actions.extend(self.commit(id, PartialItem::position(target.x, target.y)));
                }
            }
            InputState::ResizingItem { id, anchor, start_world, orig, current } => {
                let target = world.map_or(current, |w| {
                    let d = w.minus(start_world);
                    orig.resized(anchor, d.x, d.y, MIN_ITEM_SIZE)
                });
                let finite = [target.x, target.y, target.width, target.height]
                    .iter()
                    .all(|v| v.is_finite());
                if target != orig && finite {
                    actions.extend(self.commit(id, PartialItem::rect(target.x, target.y, target.width, target.height)));
                }
            }
            InputState::PanelResizing { panel } => {
                if let Some(width) = self.panel_mut(panel).end_resize() {
                    actions.push(Action::PanelResized { panel, width });
                }
            }
            InputState::ReorderingLayer { .. } => {
                if let Some((dragged, drop_index)) = self.layers.finish_drag() {
                    match layers::commit_reorder(self.store.as_ref(), self.board_id, dragged, drop_index) {
                        Ok(0) => {}
                        Ok(written) => actions.push(Action::LayersReordered { written }),
                        Err(e) => actions.push(Action::PersistenceFailed(e)),
                    }
                }
            }
        }

        actions.push(Action::SetCursor("default".into()));
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Wheel: zoom around the pointer with Ctrl/Meta held, otherwise pan.
    pub fn on_wheel(&mut self, window_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if !is_finite(window_pt) || !delta.dx.is_finite() || !delta.dy.is_finite() {
            return Vec::new();
        }
        if modifiers.ctrl || modifiers.meta {
            let factor = WHEEL_ZOOM_STEP.powf(-delta.dy / 100.0);
            self.camera.zoom_at(self.to_canvas(window_pt), factor);
        } else {
            self.camera.pan_by(-delta.dx, -delta.dy);
        }
        vec![Action::RenderNeeded]
    }

    /// `Escape` cancels the active gesture; `Delete`/`Backspace` deletes the selection.
    pub fn on_key_down(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        match key.0.as_str() {
            "Escape" if self.input.is_active() => {
                self.cancel_gesture();
                vec![Action::SetCursor("default".into()), Action::RenderNeeded]
            }
            "Delete" | "Backspace" if !self.input.is_active() => {
                let Some(id) = self.ui.selected_id else {
                    return Vec::new();
                };
                match self.delete_item(id) {
                    Ok(_) => vec![Action::ItemDeleted { id }, Action::RenderNeeded],
                    Err(e) => vec![Action::PersistenceFailed(e)],
                }
            }
            _ => Vec::new(),
        }
    }

    /// Drop the active gesture and its preview without writing anything.
    pub fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.input) {
            InputState::PanelResizing { panel } => self.panel_mut(panel).cancel_resize(),
            InputState::ReorderingLayer { .. } => self.layers.cancel_drag(),
            _ => {}
        }
    }

    // --- Panels and layer list ---

    /// Pointer-down on a side panel's resize handle.
    pub fn begin_panel_resize(&mut self, panel: PanelId) -> Vec<Action> {
        if self.input.is_active() || !self.panel_mut(panel).begin_resize() {
            return Vec::new();
        }
        self.input = InputState::PanelResizing { panel };
        vec![Action::SetCursor("col-resize".into()), Action::RenderNeeded]
    }

    pub fn toggle_panel(&mut self, panel: PanelId) -> Vec<Action> {
        if matches!(self.input, InputState::PanelResizing { panel: p } if p == panel) {
            self.input = InputState::Idle;
        }
        self.panel_mut(panel).toggle();
        vec![Action::RenderNeeded]
    }

    /// Pointer-down on a layer row (not on its rename field or buttons).
    pub fn begin_layer_drag(&mut self, id: ItemId) -> Vec<Action> {
        if self.input.is_active() || self.store.item(id).is_none() || !self.layers.begin_drag(id) {
            return Vec::new();
        }
        self.input = InputState::ReorderingLayer { id };
        vec![Action::SetCursor("grabbing".into()), Action::RenderNeeded]
    }

    /// Save the layer list's rename draft, if any.
    ///
    /// # Errors
    ///
    /// The store's `PersistenceError`; the rename is dropped.
    pub fn commit_layer_rename(&mut self) -> Result<Option<Item>, PersistenceError> {
        match self.layers.commit_rename() {
            Some((id, name)) => self.rename_item(id, &name),
            None => Ok(None),
        }
    }

    // --- Direct edits ---

    /// Give `id` a stack order above every sibling, read from the store now.
    /// Writes nothing when it is already strictly on top.
    pub fn bring_to_front(&mut self, id: ItemId) -> Vec<Action> {
        let items = self.items();
        match ordering::front_order(&items, id) {
            Some(order) => self.commit(id, PartialItem::stack_order(order)),
            None => Vec::new(),
        }
    }

    /// Place a dropped image at the default position for the board's current size.
    ///
    /// # Errors
    ///
    /// The store's `PersistenceError`; nothing is inserted.
    pub fn drop_image(&mut self, image: Vec<u8>, name: &str) -> Result<Item, PersistenceError> {
        self.add_image(image, name, Point::default())
    }

    /// Insert an image at the cascade position shifted by `offset`, above
    /// every item currently on the board (or at the first stack order when empty).
    ///
    /// # Errors
    ///
    /// The store's `PersistenceError`; nothing is inserted.
    pub fn add_image(&mut self, image: Vec<u8>, name: &str, offset: Point) -> Result<Item, PersistenceError> {
        let items = self.items();
        #[allow(clippy::cast_precision_loss)]
        let cascade = DROP_ORIGIN + items.len() as f64 * DROP_CASCADE;
        let item = Item::image(self.board_id, image, name)
            .with_rect(cascade + offset.x, cascade + offset.y, DEFAULT_ITEM_SIZE, DEFAULT_ITEM_SIZE)
            .with_stack_order(ordering::next_stack_order(&items));
        self.store.insert(item.clone()).inspect_err(|e| {
            warn!(board_id = %self.board_id, error = %e, "image insert dropped");
        })?;
        debug!(board_id = %self.board_id, id = %item.id, stack_order = item.stack_order, "image placed");
        Ok(item)
    }

    /// Rename an item. Blank names are ignored and return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// The store's `PersistenceError`.
    pub fn rename_item(&mut self, id: ItemId, name: &str) -> Result<Option<Item>, PersistenceError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let fields = PartialItem { name: Some(name.to_string()), ..Default::default() };
        self.store.update(id, &fields).map(Some)
    }

    /// Replace an item's search settings.
    ///
    /// # Errors
    ///
    /// The store's `PersistenceError` (e.g. a balance outside `[0, 1]`).
    pub fn update_search_settings(&mut self, id: ItemId, settings: SearchSettings) -> Result<Item, PersistenceError> {
        let fields = PartialItem {
            description_text: Some(settings.description_text),
            similarity_balance: Some(settings.similarity_balance),
            result_count: Some(settings.result_count),
            ..Default::default()
        };
        self.store.update(id, &fields)
    }

    /// Delete an item, dropping any gesture or selection that refers to it.
    ///
    /// # Errors
    ///
    /// The store's `PersistenceError`.
    pub fn delete_item(&mut self, id: ItemId) -> Result<Item, PersistenceError> {
        let removed = self.store.delete(id)?;
        if self.ui.selected_id == Some(id) {
            self.ui.selected_id = None;
        }
        let refers_to_item = match self.input {
            InputState::DraggingItem { id: active, .. }
            | InputState::ResizingItem { id: active, .. }
            | InputState::ReorderingLayer { id: active } => active == id,
            _ => false,
        };
        if refers_to_item {
            self.cancel_gesture();
        }
        Ok(removed)
    }

    /// One store update. A vanished target is a silent no-op.
    fn commit(&mut self, id: ItemId, fields: PartialItem) -> Vec<Action> {
        if self.store.item(id).is_none() {
            return Vec::new();
        }
        match self.store.update(id, &fields) {
            Ok(_) => {
                debug!(%id, ?fields, "item committed");
                vec![Action::ItemCommitted { id, fields }]
            }
            Err(e) => {
                warn!(%id, error = %e, "item update dropped");
                vec![Action::PersistenceFailed(e)]
            }
        }
    }
}

/// Item position for a drag that started at `start_world` and is now at
/// `world`. An unmoved pointer yields `origin` exactly.
fn drag_target(origin: Point, start_world: Point, world: Point) -> Point {
    let delta = world.minus(start_world);
    if delta == Point::default() {
        return origin;
    }
    origin.plus(delta)
}

fn is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}
