use uuid::Uuid;

use super::*;

fn item_at(x: f64, y: f64, w: f64, h: f64, z: i64) -> Item {
    Item::image(Uuid::new_v4(), vec![1, 2, 3], "img")
        .with_rect(x, y, w, h)
        .with_stack_order(z)
}

// =============================================================
// ResizeAnchor
// =============================================================

#[test]
fn handle_points_sit_on_the_bounding_box() {
    let item = item_at(10.0, 20.0, 100.0, 50.0, 0);
    assert_eq!(ResizeAnchor::Nw.handle_point(&item), Point::new(10.0, 20.0));
    assert_eq!(ResizeAnchor::N.handle_point(&item), Point::new(60.0, 20.0));
    assert_eq!(ResizeAnchor::E.handle_point(&item), Point::new(110.0, 45.0));
    assert_eq!(ResizeAnchor::Se.handle_point(&item), Point::new(110.0, 70.0));
    assert_eq!(ResizeAnchor::Sw.handle_point(&item), Point::new(10.0, 70.0));
}

#[test]
fn anchor_edge_flags_are_consistent() {
    for anchor in ResizeAnchor::ALL {
        assert!(!(anchor.moves_left() && anchor.moves_right()), "{anchor:?}");
        assert!(!(anchor.moves_top() && anchor.moves_bottom()), "{anchor:?}");
        let horizontal = anchor.moves_left() || anchor.moves_right();
        let vertical = anchor.moves_top() || anchor.moves_bottom();
        assert!(horizontal || vertical, "{anchor:?} moves nothing");
    }
}

#[test]
fn anchor_cursors() {
    assert_eq!(ResizeAnchor::N.cursor(), "ns-resize");
    assert_eq!(ResizeAnchor::W.cursor(), "ew-resize");
    assert_eq!(ResizeAnchor::Ne.cursor(), "nesw-resize");
    assert_eq!(ResizeAnchor::Se.cursor(), "nwse-resize");
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn empty_board_hits_nothing() {
    assert!(hit_test(Point::new(0.0, 0.0), &[], &Camera::default()).is_none());
}

#[test]
fn body_hit_inside_item() {
    let item = item_at(0.0, 0.0, 100.0, 100.0, 0);
    let hit = hit_test(Point::new(50.0, 50.0), std::slice::from_ref(&item), &Camera::default());
    assert_eq!(hit, Some(Hit { item_id: item.id, part: HitPart::Body }));
}

#[test]
fn miss_outside_item_and_slop() {
    let item = item_at(0.0, 0.0, 100.0, 100.0, 0);
    assert!(hit_test(Point::new(150.0, 50.0), &[item], &Camera::default()).is_none());
}

#[test]
fn topmost_item_wins_overlap() {
    let below = item_at(0.0, 0.0, 100.0, 100.0, 1);
    let above = item_at(50.0, 50.0, 100.0, 100.0, 2);
    let hit = hit_test(Point::new(75.0, 75.0), &[below, above.clone()], &Camera::default());
    assert_eq!(hit.map(|h| h.item_id), Some(above.id));
}

#[test]
fn corner_handle_hit_within_slop() {
    let item = item_at(0.0, 0.0, 100.0, 100.0, 0);
    let hit = hit_test(Point::new(104.0, 105.0), std::slice::from_ref(&item), &Camera::default());
    assert_eq!(hit, Some(Hit { item_id: item.id, part: HitPart::ResizeHandle(ResizeAnchor::Se) }));
}

#[test]
fn handle_slop_shrinks_in_world_space_when_zoomed_in() {
    let item = item_at(0.0, 0.0, 100.0, 100.0, 0);
    let zoomed = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 4.0 };
    // 6 world units = 24 screen px at 4x, beyond the 8 px slop.
    assert!(hit_test(Point::new(106.0, 106.0), std::slice::from_ref(&item), &zoomed).is_none());
    let hit = hit_test(Point::new(101.0, 101.0), &[item], &zoomed);
    assert!(matches!(hit, Some(Hit { part: HitPart::ResizeHandle(ResizeAnchor::Se), .. })));
}

#[test]
fn handle_of_top_item_beats_body_of_lower_item() {
    let lower = item_at(0.0, 0.0, 300.0, 300.0, 1);
    let upper = item_at(50.0, 50.0, 100.0, 100.0, 2);
    let hit = hit_test(Point::new(150.0, 150.0), &[lower, upper.clone()], &Camera::default());
    assert_eq!(hit, Some(Hit { item_id: upper.id, part: HitPart::ResizeHandle(ResizeAnchor::Se) }));
}
