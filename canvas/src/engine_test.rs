#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::doc::Board;
use crate::hit::ResizeAnchor;
use crate::store::LocalStore;
use crate::test_support::{FlakyStore, board_store, seed};

fn engine() -> (Arc<LocalStore>, Engine) {
    let (store, board) = board_store();
    let shared: Arc<dyn ItemStore> = store.clone();
    (store, Engine::new(shared, board))
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn mods() -> Modifiers {
    Modifiers::default()
}

fn committed(actions: &[Action]) -> Vec<&PartialItem> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::ItemCommitted { fields, .. } => Some(fields),
            _ => None,
        })
        .collect()
}

/// Two dropped images: A at (100, 100) below B at (110, 110), both 250×250.
fn two_items(engine: &mut Engine) -> (ItemId, ItemId) {
    let a = engine.drop_image(vec![1], "A").unwrap().id;
    let b = engine.drop_image(vec![2], "B").unwrap().id;
    (a, b)
}

// =============================================================
// Placement
// =============================================================

#[test]
fn dropped_images_cascade_and_stack_upward() {
    let (store, mut engine) = engine();
    let first = engine.drop_image(vec![1], "first").unwrap();
    assert_eq!((first.x, first.y, first.width, first.height), (100.0, 100.0, 250.0, 250.0));
    assert_eq!(first.stack_order, 1);

    let second = engine.drop_image(vec![2], "second").unwrap();
    assert_eq!((second.x, second.y), (110.0, 110.0));
    assert_eq!(second.stack_order, 2);
    assert_eq!(store.query(engine.board_id()).len(), 2);
}

#[test]
fn add_image_applies_offset() {
    let (_, mut engine) = engine();
    let item = engine.add_image(vec![1], "pasted", pt(25.0, -5.0)).unwrap();
    assert_eq!((item.x, item.y), (125.0, 95.0));
}

#[test]
fn drop_on_missing_board_fails_cleanly() {
    let store: Arc<dyn ItemStore> = Arc::new(LocalStore::new());
    let mut engine = Engine::new(store, Uuid::new_v4());
    assert!(matches!(engine.drop_image(vec![1], "x"), Err(PersistenceError::BoardNotFound(_))));
}

// =============================================================
// Drag
// =============================================================

#[test]
fn drag_commits_one_position_update_on_release() {
    let (store, mut engine) = engine();
    let (a, _) = two_items(&mut engine);

    let down = engine.on_pointer_down(pt(120.0, 105.0), Button::Primary, mods());
    assert_eq!(engine.selection(), Some(a));
    assert_eq!(committed(&down), vec![&PartialItem::stack_order(3)]);

    let revision = store.revision();
    engine.on_pointer_move(pt(170.0, 155.0), mods());
    engine.on_pointer_move(pt(220.0, 205.0), mods());
    assert_eq!(store.revision(), revision, "moves only touch the preview");

    let up = engine.on_pointer_up(pt(220.0, 205.0), Button::Primary, mods());
    assert_eq!(committed(&up), vec![&PartialItem::position(200.0, 200.0)]);
    assert_eq!(store.revision(), revision + 1);

    let item = store.item(a).unwrap();
    assert_eq!((item.x, item.y, item.stack_order), (200.0, 200.0, 3));
    assert!(!engine.input.is_active());
}

#[test]
fn clicking_topmost_item_writes_nothing() {
    let (store, mut engine) = engine();
    let (_, b) = two_items(&mut engine);
    let revision = store.revision();

    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());
    let up = engine.on_pointer_up(pt(200.0, 200.0), Button::Primary, mods());

    assert_eq!(engine.selection(), Some(b));
    assert!(committed(&up).is_empty());
    assert_eq!(store.revision(), revision);
}

/// A lone item at a position that does not survive `w - (w - x)` exactly.
fn awkward_item(store: &LocalStore, board: crate::doc::BoardId, width: f64, height: f64) -> Item {
    let item = Item::image(board, vec![1], "A")
        .with_rect(104.545_454_545_454_55, 100.0, width, height)
        .with_stack_order(1);
    assert!(store.insert(item.clone()).is_ok());
    item
}

#[test]
fn zoomed_release_at_start_writes_nothing() {
    let (store, mut engine) = engine();
    let item = awkward_item(&store, engine.board_id(), 250.0, 250.0);
    engine.camera.zoom = 1.1;
    let revision = store.revision();

    engine.on_pointer_down(pt(256.0, 200.0), Button::Primary, mods());
    assert!(matches!(engine.input, InputState::DraggingItem { .. }));
    engine.on_pointer_move(pt(256.0, 200.0), mods());
    assert_eq!(engine.scene()[0].rect.x, item.x);

    let up = engine.on_pointer_up(pt(256.0, 200.0), Button::Primary, mods());
    assert!(committed(&up).is_empty());
    assert_eq!(store.revision(), revision);
    assert_eq!(store.item(item.id).map(|i| i.x), Some(item.x));
}

#[test]
fn zoomed_drag_moves_by_world_delta() {
    let (store, mut engine) = engine();
    let item = awkward_item(&store, engine.board_id(), 250.0, 250.0);
    engine.camera.zoom = 2.0;

    engine.on_pointer_down(pt(300.0, 300.0), Button::Primary, mods());
    let up = engine.on_pointer_up(pt(340.0, 320.0), Button::Primary, mods());
    assert_eq!(committed(&up), vec![&PartialItem::position(item.x + 20.0, 110.0)]);
}

#[test]
fn zoomed_resize_release_at_start_writes_nothing() {
    let (store, mut engine) = engine();
    let item = awkward_item(&store, engine.board_id(), 250.0, 250.0);
    engine.camera.zoom = 1.1;
    let corner = engine.camera.world_to_screen(Point::new(item.x + item.width, item.y + item.height));
    let revision = store.revision();

    engine.on_pointer_down(corner, Button::Primary, mods());
    assert!(matches!(engine.input, InputState::ResizingItem { .. }));
    let up = engine.on_pointer_up(corner, Button::Primary, mods());
    assert!(committed(&up).is_empty());
    assert_eq!(store.revision(), revision);
}

#[test]
fn undersized_item_keeps_rect_when_handle_is_clicked() {
    let (store, mut engine) = engine();
    let item = awkward_item(&store, engine.board_id(), 10.0, 12.0);
    let corner = engine.camera.world_to_screen(Point::new(item.x, item.y));
    let revision = store.revision();

    engine.on_pointer_down(corner, Button::Primary, mods());
    assert!(matches!(engine.input, InputState::ResizingItem { .. }));
    let up = engine.on_pointer_up(corner, Button::Primary, mods());

    assert!(committed(&up).is_empty());
    assert_eq!(store.revision(), revision);
    let stored = store.item(item.id).unwrap();
    assert_eq!((stored.x, stored.width, stored.height), (item.x, 10.0, 12.0));
}

#[test]
fn scene_shows_drag_preview_before_commit() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();
    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());
    engine.on_pointer_move(pt(260.0, 230.0), mods());

    let scene = engine.scene();
    assert_eq!((scene[0].rect.x, scene[0].rect.y), (160.0, 130.0));
    assert!(scene[0].selected);
    assert_eq!(store.item(item.id).map(|i| i.x), Some(100.0));
}

#[test]
fn escape_cancels_drag_without_writing() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();
    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());
    engine.on_pointer_move(pt(300.0, 300.0), mods());
    let revision = store.revision();

    engine.on_key_down(Key("Escape".into()), mods());
    assert!(!engine.input.is_active());
    assert!(engine.on_pointer_up(pt(300.0, 300.0), Button::Primary, mods()).is_empty());
    assert_eq!(store.revision(), revision);
    assert_eq!(store.item(item.id).map(|i| i.x), Some(100.0));
}

#[test]
fn item_deleted_mid_drag_is_a_silent_no_op() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();
    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());
    store.delete(item.id).unwrap();

    let up = engine.on_pointer_up(pt(300.0, 300.0), Button::Primary, mods());
    assert!(committed(&up).is_empty());
    assert!(!up.iter().any(|a| matches!(a, Action::PersistenceFailed(_))));
}

#[test]
fn non_finite_pointer_is_ignored() {
    let (store, mut engine) = engine();
    engine.drop_image(vec![1], "A").unwrap();
    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());
    assert!(engine.on_pointer_move(pt(f64::NAN, 10.0), mods()).is_empty());

    let revision = store.revision();
    let up = engine.on_pointer_up(pt(f64::NAN, f64::NAN), Button::Primary, mods());
    assert!(committed(&up).is_empty(), "release falls back to the unmoved preview");
    assert_eq!(store.revision(), revision);
}

#[test]
fn failed_bring_to_front_keeps_gesture() {
    let local = LocalStore::new();
    let board = Board::new("b", 0);
    let board_id = board.id;
    local.insert_board(board).unwrap();
    let store: Arc<dyn ItemStore> = Arc::new(FlakyStore::new(local, 1));
    let ids = seed(store.as_ref(), board_id, &[0, 1]);
    let mut engine = Engine::new(store, board_id);

    // Seeded items are 100×100 at (0, 0) and (10, 10); (30, 5) hits only the lower one's body.
    let down = engine.on_pointer_down(pt(30.0, 5.0), Button::Primary, mods());
    assert!(down.iter().any(|a| matches!(a, Action::PersistenceFailed(_))));
    assert!(matches!(engine.input, InputState::DraggingItem { id, .. } if id == ids[0]));
}

// =============================================================
// Resize
// =============================================================

#[test]
fn resize_from_corner_commits_rect() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();

    engine.on_pointer_down(pt(350.0, 350.0), Button::Primary, mods());
    assert!(matches!(engine.input, InputState::ResizingItem { anchor: ResizeAnchor::Se, .. }));
    engine.on_pointer_move(pt(400.0, 380.0), mods());
    assert_eq!(engine.scene()[0].rect, Rect { x: 100.0, y: 100.0, width: 300.0, height: 280.0 });

    let up = engine.on_pointer_up(pt(400.0, 380.0), Button::Primary, mods());
    assert_eq!(committed(&up), vec![&PartialItem::rect(100.0, 100.0, 300.0, 280.0)]);
    let stored = store.item(item.id).unwrap();
    assert_eq!((stored.width, stored.height), (300.0, 280.0));
}

#[test]
fn resize_clamps_to_minimum_size() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();
    engine.on_pointer_down(pt(350.0, 350.0), Button::Primary, mods());
    engine.on_pointer_up(pt(-500.0, -500.0), Button::Primary, mods());
    let stored = store.item(item.id).unwrap();
    assert_eq!((stored.width, stored.height), (MIN_ITEM_SIZE, MIN_ITEM_SIZE));
}

// =============================================================
// Camera
// =============================================================

#[test]
fn dragging_empty_canvas_pans_and_deselects() {
    let (_, mut engine) = engine();
    engine.drop_image(vec![1], "A").unwrap();
    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());
    engine.on_pointer_up(pt(200.0, 200.0), Button::Primary, mods());
    assert!(engine.selection().is_some());

    engine.on_pointer_down(pt(10.0, 10.0), Button::Primary, mods());
    assert_eq!(engine.selection(), None);
    engine.on_pointer_move(pt(30.0, 50.0), mods());
    engine.on_pointer_up(pt(30.0, 50.0), Button::Primary, mods());
    assert_eq!((engine.camera.pan_x, engine.camera.pan_y), (20.0, 40.0));
}

#[test]
fn canvas_origin_offsets_pointer() {
    let (_, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();
    engine.set_canvas_origin(pt(256.0, 0.0));
    engine.on_pointer_down(pt(256.0 + 200.0, 200.0), Button::Primary, mods());
    assert_eq!(engine.selection(), Some(item.id));
}

#[test]
fn ctrl_wheel_zooms_around_pointer() {
    let (_, mut engine) = engine();
    let anchor = pt(200.0, 100.0);
    let before = engine.camera.screen_to_world(anchor);
    let ctrl = Modifiers { ctrl: true, ..Modifiers::default() };
    engine.on_wheel(anchor, WheelDelta { dx: 0.0, dy: -100.0 }, ctrl);

    assert!((engine.camera.zoom - 1.1).abs() < 1e-9);
    let after = engine.camera.screen_to_world(anchor);
    assert!((before.x - after.x).abs() < 1e-9 && (before.y - after.y).abs() < 1e-9);
}

#[test]
fn plain_wheel_pans() {
    let (_, mut engine) = engine();
    engine.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 5.0, dy: 30.0 }, mods());
    assert_eq!((engine.camera.pan_x, engine.camera.pan_y), (-5.0, -30.0));
    assert_eq!(engine.camera.zoom, 1.0);
}

// =============================================================
// One gesture at a time
// =============================================================

#[test]
fn active_drag_blocks_other_gestures() {
    let (_, mut engine) = engine();
    let (a, b) = two_items(&mut engine);
    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());

    assert!(engine.begin_panel_resize(PanelId::Layers).is_empty());
    assert!(!engine.layers_panel.is_resizing());
    assert!(engine.begin_layer_drag(a).is_empty());
    assert!(engine.on_pointer_down(pt(120.0, 105.0), Button::Primary, mods()).is_empty());
    assert!(matches!(engine.input, InputState::DraggingItem { id, .. } if id == b));
}

#[test]
fn panel_resize_commits_on_release() {
    let (_, mut engine) = engine();
    engine.set_window_width(1200.0);
    assert!(!engine.begin_panel_resize(PanelId::Layers).is_empty());

    let moved = engine.on_pointer_move(pt(300.0, 10.0), mods());
    assert_eq!(moved, vec![Action::RenderNeeded]);
    assert_eq!(engine.layers_panel.ghost_width(), Some(300.0));
    assert_eq!(engine.layers_panel.width(), 256.0);

    let up = engine.on_pointer_up(pt(300.0, 10.0), Button::Primary, mods());
    assert!(up.contains(&Action::PanelResized { panel: PanelId::Layers, width: 300.0 }));
    assert_eq!(engine.layers_panel.width(), 300.0);
}

#[test]
fn escape_discards_panel_ghost() {
    let (_, mut engine) = engine();
    engine.set_window_width(1200.0);
    engine.begin_panel_resize(PanelId::Library);
    engine.on_pointer_move(pt(700.0, 10.0), mods());
    engine.on_key_down(Key("Escape".into()), mods());
    assert_eq!(engine.library_panel.ghost_width(), None);
    assert_eq!(engine.library_panel.width(), 320.0);
}

#[test]
fn idle_moves_drive_collapsed_panel_peek() {
    let (_, mut engine) = engine();
    engine.set_window_width(1000.0);
    engine.toggle_panel(PanelId::Library);

    assert_eq!(engine.on_pointer_move(pt(990.0, 300.0), mods()), vec![Action::RenderNeeded]);
    assert!(engine.library_panel.peek().offset > 0.0);
    assert!(engine.on_pointer_move(pt(500.0, 300.0), mods()).len() == 1);
    assert!(engine.on_pointer_move(pt(400.0, 300.0), mods()).is_empty());
}

// =============================================================
// Layer list
// =============================================================

#[test]
fn layer_drag_reorders_through_store() {
    let (store, mut engine) = engine();
    let ids = seed(store.as_ref(), engine.board_id(), &[0, 1, 2]);
    engine.layers.set_viewport(100.0, 400.0);

    assert!(!engine.begin_layer_drag(ids[2]).is_empty());
    engine.on_pointer_move(pt(50.0, 480.0), mods());
    let up = engine.on_pointer_up(pt(50.0, 480.0), Button::Primary, mods());

    assert!(up.contains(&Action::LayersReordered { written: 3 }));
    let order: Vec<_> = store.query(engine.board_id()).iter().map(|i| i.id).collect();
    assert_eq!(order, vec![ids[2], ids[0], ids[1]]);
}

#[test]
fn layer_drop_in_place_writes_nothing() {
    let (store, mut engine) = engine();
    let ids = seed(store.as_ref(), engine.board_id(), &[0, 1, 2]);
    engine.layers.set_viewport(100.0, 400.0);
    let revision = store.revision();

    engine.begin_layer_drag(ids[2]);
    engine.on_pointer_move(pt(50.0, 100.0 + 20.0), mods());
    let up = engine.on_pointer_up(pt(50.0, 120.0), Button::Primary, mods());
    assert!(!up.iter().any(|a| matches!(a, Action::LayersReordered { .. })));
    assert_eq!(store.revision(), revision);
}

#[test]
fn layer_rename_trims_and_saves() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "Result 1").unwrap();
    engine.layers.begin_rename(item.id, &item.name);
    engine.layers.edit_rename("  crouch ");
    let renamed = engine.commit_layer_rename().unwrap();
    assert_eq!(renamed.map(|i| i.name), Some("crouch".to_string()));
    assert_eq!(store.item(item.id).map(|i| i.name), Some("crouch".to_string()));
}

// =============================================================
// Direct edits
// =============================================================

#[test]
fn delete_key_removes_selection() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();
    engine.on_pointer_down(pt(200.0, 200.0), Button::Primary, mods());
    engine.on_pointer_up(pt(200.0, 200.0), Button::Primary, mods());

    let actions = engine.on_key_down(Key("Delete".into()), mods());
    assert!(actions.contains(&Action::ItemDeleted { id: item.id }));
    assert!(store.query(engine.board_id()).is_empty());
    assert_eq!(engine.selection(), None);
}

#[test]
fn blank_rename_is_ignored() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "keep").unwrap();
    assert_eq!(engine.rename_item(item.id, "   "), Ok(None));
    assert_eq!(store.item(item.id).map(|i| i.name), Some("keep".to_string()));
}

#[test]
fn search_settings_are_validated() {
    let (store, mut engine) = engine();
    let item = engine.drop_image(vec![1], "A").unwrap();
    let bad = SearchSettings { similarity_balance: 2.0, ..SearchSettings::default() };
    assert_eq!(
        engine.update_search_settings(item.id, bad),
        Err(PersistenceError::InvalidField("similarity_balance"))
    );

    let good = SearchSettings {
        description_text: Some("running".into()),
        similarity_balance: 0.5,
        result_count: 8,
    };
    engine.update_search_settings(item.id, good.clone()).unwrap();
    assert_eq!(store.item(item.id).map(|i| i.search), Some(good));
}
