//! Pure geometry over world coordinates: absolute bounds, bounds-constrained
//! transforms, and hit testing. Nothing here touches the store.

use eframe::egui;

use crate::catalog::{self, ShapeHint};
use crate::model::SceneObject;
use crate::store::SceneStore;

use super::viewport::Viewport;

/// Absolute world origin of an object. Children store positions relative to
/// their group's origin, one level deep.
pub(super) fn absolute_origin(store: &SceneStore, obj: &SceneObject) -> egui::Pos2 {
    match obj
        .parent_id
        .as_deref()
        .and_then(|pid| store.object(pid))
    {
        Some(parent) => egui::pos2(parent.x + obj.x, parent.y + obj.y),
        None => egui::pos2(obj.x, obj.y),
    }
}

/// Absolute axis-aligned bounds of an object in world units.
pub(super) fn object_rect(store: &SceneStore, obj: &SceneObject) -> egui::Rect {
    egui::Rect::from_min_size(
        absolute_origin(store, obj),
        egui::vec2(obj.width, obj.height),
    )
}

/// Union bounds of the current object selection, in world units.
pub(super) fn selection_bounds(store: &SceneStore) -> Option<egui::Rect> {
    let mut bounds: Option<egui::Rect> = None;
    for obj in store.objects.iter().filter(|o| store.is_selected(&o.id)) {
        let rect = object_rect(store, obj);
        bounds = Some(match bounds {
            Some(b) => b.union(rect),
            None => rect,
        });
    }
    bounds
}

/// Clamp a world position so the object stays inside the floor extent.
pub(super) fn clamp_to_extent(
    world: egui::Pos2,
    size: egui::Vec2,
    extent: egui::Vec2,
) -> egui::Pos2 {
    egui::pos2(
        world.x.clamp(0.0, (extent.x - size.x).max(0.0)),
        world.y.clamp(0.0, (extent.y - size.y).max(0.0)),
    )
}

/// Drag constraint: take a candidate screen position for a dragged object,
/// clamp it to the floor in world space, and hand back the corrected screen
/// position. Never rejects, only clamps.
pub(super) fn drag_bound(
    candidate: egui::Pos2,
    size: egui::Vec2,
    extent: egui::Vec2,
    viewport: &Viewport,
    origin: egui::Pos2,
) -> egui::Pos2 {
    let world = viewport.screen_to_world(origin, candidate);
    let clamped = clamp_to_extent(world, size, extent);
    viewport.world_to_screen(origin, clamped)
}

/// Resize constraint on screen-space boxes: clamp all four edges to the floor
/// extent (right/bottom first, then left/top preserving the opposite edge),
/// then enforce a minimum size of one grid cell. A box below the minimum
/// rejects the whole resize and returns the old box unchanged.
pub(super) fn resize_bound(
    old_box: egui::Rect,
    new_box: egui::Rect,
    viewport: &Viewport,
    origin: egui::Pos2,
    extent: egui::Vec2,
    min_size: f32,
) -> egui::Rect {
    let min = viewport.screen_to_world(origin, new_box.min);
    let mut x = min.x;
    let mut y = min.y;
    let mut width = new_box.width() / viewport.scale;
    let mut height = new_box.height() / viewport.scale;

    if x + width > extent.x {
        width = extent.x - x;
    }
    if y + height > extent.y {
        height = extent.y - y;
    }
    if x < 0.0 {
        let right = x + width;
        x = 0.0;
        width = right;
    }
    if y < 0.0 {
        let bottom = y + height;
        y = 0.0;
        height = bottom;
    }

    if width < min_size || height < min_size {
        return old_box;
    }

    let screen_min = viewport.world_to_screen(origin, egui::pos2(x, y));
    egui::Rect::from_min_size(
        screen_min,
        egui::vec2(width * viewport.scale, height * viewport.scale),
    )
}

/// Topmost visible, top-level object under a world point. Children are hit
/// through their group's box.
pub(super) fn hit_test(store: &SceneStore, world: egui::Pos2) -> Option<String> {
    for obj in store
        .objects
        .iter()
        .rev()
        .filter(|o| store.is_visible(o) && o.parent_id.is_none())
    {
        let rect = object_rect(store, obj);
        let hit = match catalog::descriptor(&obj.kind).shape {
            ShapeHint::Circle => {
                let radius = rect.width().min(rect.height()) / 2.0;
                let center = rect.center();
                (world - center).length() <= radius
            }
            _ => rect.contains(world),
        };
        if hit {
            return Some(obj.id.clone());
        }
    }
    None
}

pub(super) fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len2).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

/// Topmost link whose segment passes within `threshold` of the world point.
/// Only links with both endpoints visible are addressable.
pub(super) fn hit_test_link(store: &SceneStore, world: egui::Pos2, threshold: f32) -> Option<String> {
    for link in store.links.iter().rev() {
        if let Some((a, b)) = link_endpoints(store, &link.from, &link.to) {
            if distance_to_segment(world, a, b) <= threshold {
                return Some(link.id.clone());
            }
        }
    }
    None
}

/// World-space endpoints for a link: the centers of both objects, but only
/// when both resolve on the visible layer and sub-layer.
pub(super) fn link_endpoints(
    store: &SceneStore,
    from: &str,
    to: &str,
) -> Option<(egui::Pos2, egui::Pos2)> {
    let from_obj = store.object(from).filter(|o| store.is_visible(o))?;
    let to_obj = store.object(to).filter(|o| store.is_visible(o))?;
    Some((
        object_rect(store, from_obj).center(),
        object_rect(store, to_obj).center(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanvasLink;
    use crate::model::SubLayer;

    fn rect_obj(id: &str, x: f32, y: f32, w: f32, h: f32) -> SceneObject {
        SceneObject {
            id: id.to_string(),
            kind: "rect".to_string(),
            layer_id: "1f".to_string(),
            x,
            y,
            width: w,
            height: h,
            ..SceneObject::default()
        }
    }

    fn plain_viewport() -> Viewport {
        Viewport {
            scale: 1.0,
            base_scale: 1.0,
            position: egui::Vec2::ZERO,
        }
    }

    #[test]
    fn drag_bound_keeps_the_object_on_the_floor() {
        let vp = Viewport {
            scale: 2.0,
            base_scale: 2.0,
            position: egui::vec2(50.0, 30.0),
        };
        let origin = egui::pos2(5.0, 5.0);
        let extent = egui::vec2(1000.0, 800.0);
        let size = egui::vec2(100.0, 50.0);

        for candidate in [
            egui::pos2(-500.0, -500.0),
            egui::pos2(5000.0, 5000.0),
            egui::pos2(300.0, 200.0),
        ] {
            let bounded = drag_bound(candidate, size, extent, &vp, origin);
            let world = vp.screen_to_world(origin, bounded);
            assert!(world.x >= -1e-3 && world.x <= extent.x - size.x + 1e-3);
            assert!(world.y >= -1e-3 && world.y <= extent.y - size.y + 1e-3);
        }
    }

    #[test]
    fn drag_bound_is_identity_inside_bounds() {
        let vp = plain_viewport();
        let candidate = egui::pos2(120.0, 90.0);
        let bounded = drag_bound(
            candidate,
            egui::vec2(10.0, 10.0),
            egui::vec2(1000.0, 1000.0),
            &vp,
            egui::Pos2::ZERO,
        );
        assert_eq!(bounded, candidate);
    }

    #[test]
    fn resize_bound_clamps_each_edge_independently() {
        let vp = plain_viewport();
        let origin = egui::Pos2::ZERO;
        let extent = egui::vec2(1000.0, 800.0);
        let old = egui::Rect::from_min_size(egui::pos2(100.0, 100.0), egui::vec2(200.0, 200.0));

        // Overflowing right/bottom shrinks width/height.
        let new = egui::Rect::from_min_size(egui::pos2(900.0, 700.0), egui::vec2(400.0, 400.0));
        let out = resize_bound(old, new, &vp, origin, extent, 10.0);
        assert_eq!(out.min, egui::pos2(900.0, 700.0));
        assert_eq!(out.width(), 100.0);
        assert_eq!(out.height(), 100.0);

        // Overflowing left/top keeps the right/bottom edge in place.
        let new = egui::Rect::from_min_size(egui::pos2(-50.0, -20.0), egui::vec2(300.0, 300.0));
        let out = resize_bound(old, new, &vp, origin, extent, 10.0);
        assert_eq!(out.min, egui::Pos2::ZERO);
        assert_eq!(out.width(), 250.0);
        assert_eq!(out.height(), 280.0);
    }

    #[test]
    fn resize_below_one_cell_is_rejected_whole() {
        let vp = plain_viewport();
        let old = egui::Rect::from_min_size(egui::pos2(100.0, 100.0), egui::vec2(600.0, 600.0));
        let new = egui::Rect::from_min_size(egui::pos2(100.0, 100.0), egui::vec2(499.0, 600.0));
        let out = resize_bound(
            old,
            new,
            &vp,
            egui::Pos2::ZERO,
            egui::vec2(30_000.0, 20_000.0),
            500.0,
        );
        assert_eq!(out, old);
    }

    #[test]
    fn resize_bound_respects_the_stage_transform() {
        let vp = Viewport {
            scale: 0.5,
            base_scale: 0.5,
            position: egui::vec2(10.0, 10.0),
        };
        let origin = egui::pos2(3.0, 7.0);
        let extent = egui::vec2(1000.0, 1000.0);
        // A legal box well inside the floor passes through unchanged.
        let old = egui::Rect::from_min_size(egui::pos2(63.0, 67.0), egui::vec2(100.0, 100.0));
        let new = egui::Rect::from_min_size(egui::pos2(63.0, 67.0), egui::vec2(120.0, 90.0));
        let out = resize_bound(old, new, &vp, origin, extent, 50.0);
        assert!((out.min.x - new.min.x).abs() < 1e-3);
        assert!((out.width() - new.width()).abs() < 1e-3);
    }

    #[test]
    fn child_bounds_are_relative_to_the_group() {
        let mut store = SceneStore::default();
        store.add_object(SceneObject {
            kind: "group".into(),
            ..rect_obj("g", 1000.0, 2000.0, 500.0, 500.0)
        });
        store.add_object(SceneObject {
            parent_id: Some("g".into()),
            ..rect_obj("kid", 50.0, 60.0, 100.0, 100.0)
        });
        let kid = store.object("kid").unwrap();
        let rect = object_rect(&store, kid);
        assert_eq!(rect.min, egui::pos2(1050.0, 2060.0));
    }

    #[test]
    fn hit_test_prefers_the_topmost_object() {
        let mut store = SceneStore::default();
        store.add_object(rect_obj("under", 0.0, 0.0, 100.0, 100.0));
        store.add_object(rect_obj("over", 50.0, 50.0, 100.0, 100.0));
        assert_eq!(hit_test(&store, egui::pos2(75.0, 75.0)).as_deref(), Some("over"));
        assert_eq!(hit_test(&store, egui::pos2(10.0, 10.0)).as_deref(), Some("under"));
        assert!(hit_test(&store, egui::pos2(500.0, 500.0)).is_none());
    }

    #[test]
    fn hit_test_uses_a_round_footprint_for_circular_types() {
        let mut store = SceneStore::default();
        store.add_object(SceneObject {
            kind: "crane".into(),
            ..rect_obj("c", 0.0, 0.0, 100.0, 100.0)
        });
        assert!(hit_test(&store, egui::pos2(50.0, 50.0)).is_some());
        // The corner is inside the AABB but outside the circle.
        assert!(hit_test(&store, egui::pos2(3.0, 3.0)).is_none());
    }

    #[test]
    fn hit_test_skips_other_floors() {
        let mut store = SceneStore::default();
        store.add_object(SceneObject {
            layer_id: "default".into(),
            ..rect_obj("elsewhere", 0.0, 0.0, 100.0, 100.0)
        });
        assert!(hit_test(&store, egui::pos2(50.0, 50.0)).is_none());
    }

    #[test]
    fn link_endpoints_require_both_ends_visible() {
        let mut store = SceneStore::default();
        store.add_object(rect_obj("a", 0.0, 0.0, 100.0, 100.0));
        store.add_object(SceneObject {
            sub_layer: SubLayer::Top,
            ..rect_obj("b", 200.0, 0.0, 100.0, 100.0)
        });
        store.add_link(CanvasLink {
            id: "l".into(),
            from: "a".into(),
            to: "b".into(),
            color: "black".into(),
        });
        assert!(link_endpoints(&store, "a", "b").is_none());
        store.set_view_mode(SubLayer::Top);
        assert!(link_endpoints(&store, "a", "b").is_none());
        store.set_view_mode(SubLayer::Bottom);
        store.update_object("b", |o| o.sub_layer = SubLayer::Bottom);
        let (from, to) = link_endpoints(&store, "a", "b").unwrap();
        assert_eq!(from, egui::pos2(50.0, 50.0));
        assert_eq!(to, egui::pos2(250.0, 50.0));
    }

    #[test]
    fn links_hit_near_their_segment() {
        let mut store = SceneStore::default();
        store.add_object(rect_obj("a", 0.0, 0.0, 100.0, 100.0));
        store.add_object(rect_obj("b", 400.0, 0.0, 100.0, 100.0));
        store.add_link(CanvasLink {
            id: "l".into(),
            from: "a".into(),
            to: "b".into(),
            color: "black".into(),
        });
        // segment runs from (50,50) to (450,50)
        assert_eq!(
            hit_test_link(&store, egui::pos2(250.0, 55.0), 10.0).as_deref(),
            Some("l")
        );
        assert!(hit_test_link(&store, egui::pos2(250.0, 90.0), 10.0).is_none());
    }

    #[test]
    fn selection_bounds_unions_selected_objects() {
        let mut store = SceneStore::default();
        store.add_object(rect_obj("a", 10.0, 10.0, 20.0, 20.0));
        store.add_object(rect_obj("b", 100.0, 50.0, 40.0, 10.0));
        store.set_selection(vec!["a".into(), "b".into()]);
        let bounds = selection_bounds(&store).unwrap();
        assert_eq!(bounds.min, egui::pos2(10.0, 10.0));
        assert_eq!(bounds.max, egui::pos2(140.0, 60.0));
        store.clear_selection();
        assert!(selection_bounds(&store).is_none());
    }
}
