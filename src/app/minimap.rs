//! Fixed-size overview map in the canvas corner. Shows the whole floor
//! extent, the visible objects and the current viewport window; clicking (or
//! dragging) recenters the viewport without changing the zoom.

use eframe::egui;

use crate::catalog::{self, ShapeHint};
use crate::store::SceneStore;

use super::geometry;
use super::render::fill_color;
use super::viewport::Viewport;

const MAP_WIDTH: f32 = 240.0;
const MAP_HEIGHT: f32 = 160.0;
const PADDING: f32 = 10.0;
const MARGIN: f32 = 12.0;

pub(super) fn minimap_ui(
    ui: &mut egui::Ui,
    canvas_rect: egui::Rect,
    store: &SceneStore,
    viewport: &mut Viewport,
) {
    let map_rect = egui::Rect::from_min_size(
        canvas_rect.max - egui::vec2(MAP_WIDTH + MARGIN, MAP_HEIGHT + MARGIN),
        egui::vec2(MAP_WIDTH, MAP_HEIGHT),
    );
    let response = ui.interact(
        map_rect,
        ui.id().with("minimap"),
        egui::Sense::click_and_drag(),
    );
    let painter = ui.painter();
    painter.rect_filled(map_rect, 4.0, egui::Color32::from_rgba_unmultiplied(255, 255, 255, 230));
    painter.rect_stroke(
        map_rect,
        4.0,
        egui::Stroke::new(1.0, egui::Color32::from_gray(200)),
        egui::StrokeKind::Middle,
    );

    let (floor_w, floor_h) = store.floor_extent();
    if floor_w <= 0.0 || floor_h <= 0.0 {
        return;
    }
    let avail_w = MAP_WIDTH - PADDING * 2.0;
    let avail_h = MAP_HEIGHT - PADDING * 2.0;
    let scale = (avail_w / floor_w).min(avail_h / floor_h);
    let draw_size = egui::vec2(floor_w * scale, floor_h * scale);
    let draw_origin = map_rect.min
        + egui::vec2(
            (MAP_WIDTH - draw_size.x) / 2.0,
            (MAP_HEIGHT - draw_size.y) / 2.0,
        );
    let floor_rect = egui::Rect::from_min_size(draw_origin, draw_size);
    painter.rect_filled(floor_rect, 0.0, egui::Color32::from_rgb(0xf8, 0xfa, 0xfc));
    painter.rect_stroke(
        floor_rect,
        0.0,
        egui::Stroke::new(1.0, egui::Color32::from_rgb(0xcb, 0xd5, 0xe1)),
        egui::StrokeKind::Middle,
    );

    for obj in store.visible_objects() {
        let world = geometry::object_rect(store, obj);
        let rect = egui::Rect::from_min_size(
            draw_origin + world.min.to_vec2() * scale,
            world.size() * scale,
        );
        let color = fill_color(&obj.fill, 1.0);
        match catalog::descriptor(&obj.kind).shape {
            ShapeHint::Circle => {
                let radius = rect.width().min(rect.height()) / 2.0;
                painter.circle_filled(rect.center(), radius, color);
            }
            _ => {
                painter.rect_filled(rect, 0.0, color);
            }
        }
    }

    // Viewport window: invert the stage transform back to world space.
    let view_min = egui::pos2(
        -viewport.position.x / viewport.scale,
        -viewport.position.y / viewport.scale,
    );
    let view_size = canvas_rect.size() / viewport.scale;
    let view_rect = egui::Rect::from_min_size(
        draw_origin + view_min.to_vec2() * scale,
        view_size * scale,
    )
    .intersect(floor_rect.expand(2.0));
    painter.rect_filled(
        view_rect,
        0.0,
        egui::Color32::from_rgba_unmultiplied(0x3b, 0x82, 0xf6, 50),
    );
    painter.rect_stroke(
        view_rect,
        0.0,
        egui::Stroke::new(2.0, egui::Color32::from_rgb(0x3b, 0x82, 0xf6)),
        egui::StrokeKind::Middle,
    );

    if response.clicked() || response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            let world = egui::pos2(
                (pos.x - draw_origin.x) / scale,
                (pos.y - draw_origin.y) / scale,
            );
            viewport.navigate_to(world, canvas_rect.size());
        }
    }
}
