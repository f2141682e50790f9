use eframe::egui;

use crate::catalog::{self, ShapeHint};
use crate::model::{color_from_hex, SceneObject};
use crate::store::SceneStore;

use super::geometry;
use super::viewport::Viewport;
use super::ResizeHandle;

pub(super) const HANDLE_SIZE: f32 = 10.0;

const GRID_LINE: egui::Color32 = egui::Color32::from_rgb(0xe5, 0xe7, 0xeb);
const BOUNDARY: egui::Color32 = egui::Color32::from_rgb(0x9c, 0xa3, 0xaf);
const SELECTION: egui::Color32 = egui::Color32::from_rgb(0x5a, 0xa0, 0xff);
const FALLBACK_FILL: egui::Color32 = egui::Color32::from_rgb(0x94, 0xa3, 0xb8);

pub(super) fn fill_color(fill: &str, opacity: f32) -> egui::Color32 {
    let [r, g, b] = color_from_hex(fill).unwrap_or([0x94, 0xa3, 0xb8]);
    let alpha = if fill == "transparent" {
        0
    } else {
        (opacity.clamp(0.0, 1.0) * 255.0) as u8
    };
    egui::Color32::from_rgba_unmultiplied(r, g, b, alpha)
}

/// Grid lines clipped to the intersection of the floor extent and the part of
/// the world currently on screen, plus the dashed fab boundary.
pub(super) fn draw_grid(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    clip: egui::Rect,
    grid_size: f32,
    extent: egui::Vec2,
) {
    if grid_size <= 0.0 || extent.x <= 0.0 || extent.y <= 0.0 {
        return;
    }
    let world_min = viewport.screen_to_world(origin, clip.min);
    let world_max = viewport.screen_to_world(origin, clip.max);
    let start_x = ((world_min.x / grid_size).floor() * grid_size).max(0.0);
    let end_x = ((world_max.x / grid_size).ceil() * grid_size).min(extent.x);
    let start_y = ((world_min.y / grid_size).floor() * grid_size).max(0.0);
    let end_y = ((world_max.y / grid_size).ceil() * grid_size).min(extent.y);

    let stroke = egui::Stroke::new(1.0, GRID_LINE);
    let mut x = start_x;
    while x <= end_x {
        let top = viewport.world_to_screen(origin, egui::pos2(x, start_y.max(0.0)));
        let bottom = viewport.world_to_screen(origin, egui::pos2(x, end_y));
        painter.line_segment([top, bottom], stroke);
        x += grid_size;
    }
    let mut y = start_y;
    while y <= end_y {
        let left = viewport.world_to_screen(origin, egui::pos2(start_x, y));
        let right = viewport.world_to_screen(origin, egui::pos2(end_x, y));
        painter.line_segment([left, right], stroke);
        y += grid_size;
    }

    let corners = [
        viewport.world_to_screen(origin, egui::Pos2::ZERO),
        viewport.world_to_screen(origin, egui::pos2(extent.x, 0.0)),
        viewport.world_to_screen(origin, egui::pos2(extent.x, extent.y)),
        viewport.world_to_screen(origin, egui::pos2(0.0, extent.y)),
        viewport.world_to_screen(origin, egui::Pos2::ZERO),
    ];
    let boundary = egui::Stroke::new(2.0, BOUNDARY);
    for pair in corners.windows(2) {
        painter.extend(egui::Shape::dashed_line(pair, boundary, 10.0, 5.0));
    }
}

pub(super) fn draw_overlay(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    store: &SceneStore,
    texture: Option<&egui::TextureHandle>,
) {
    let Some(overlay) = store.overlay.as_ref() else {
        return;
    };
    let min = viewport.world_to_screen(origin, egui::pos2(overlay.x, overlay.y));
    let size = egui::vec2(overlay.width, overlay.height) * viewport.scale;
    let rect = egui::Rect::from_min_size(min, size);
    match texture {
        Some(texture) => {
            let uv = if overlay.natural_width > 0.0 && overlay.natural_height > 0.0 {
                egui::Rect::from_min_max(
                    egui::pos2(
                        overlay.crop_x / overlay.natural_width,
                        overlay.crop_y / overlay.natural_height,
                    ),
                    egui::pos2(
                        (overlay.crop_x + overlay.crop_width) / overlay.natural_width,
                        (overlay.crop_y + overlay.crop_height) / overlay.natural_height,
                    ),
                )
            } else {
                egui::Rect::from_min_max(egui::Pos2::ZERO, egui::pos2(1.0, 1.0))
            };
            let tint = egui::Color32::WHITE.gamma_multiply(overlay.opacity.clamp(0.0, 1.0));
            painter.image(texture.id(), rect, uv, tint);
        }
        None => {
            painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, BOUNDARY), egui::StrokeKind::Middle);
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                &overlay.name,
                egui::FontId::proportional(12.0),
                BOUNDARY,
            );
        }
    }
    if store.overlay_selected {
        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(2.0, SELECTION),
            egui::StrokeKind::Middle,
        );
    }
}

/// Links render as arrows between object centers, but only while both
/// endpoints resolve on the visible floor and sub-layer.
pub(super) fn draw_links(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    store: &SceneStore,
) {
    for link in &store.links {
        let Some((from, to)) = geometry::link_endpoints(store, &link.from, &link.to) else {
            continue;
        };
        let a = viewport.world_to_screen(origin, from);
        let b = viewport.world_to_screen(origin, to);
        let [r, g, bl] = color_from_hex(&link.color).unwrap_or([0, 0, 0]);
        let color = egui::Color32::from_rgb(r, g, bl);
        let width = if store.is_selected(&link.id) { 4.0 } else { 2.0 };
        let stroke = egui::Stroke::new(width, color);
        painter.line_segment([a, b], stroke);
        draw_arrow_head(painter, a, b, stroke);
    }
}

fn draw_arrow_head(painter: &egui::Painter, a: egui::Pos2, b: egui::Pos2, stroke: egui::Stroke) {
    let dir = b - a;
    let len = dir.length();
    if len <= f32::EPSILON {
        return;
    }
    let dir = dir / len;
    let normal = egui::vec2(-dir.y, dir.x);
    let tip = b;
    let base = tip - dir * 10.0;
    painter.line_segment([tip, base + normal * 5.0], stroke);
    painter.line_segment([tip, base - normal * 5.0], stroke);
}

/// Gesture overrides applied while a drag or resize is in flight: the store
/// still holds the pre-gesture state, the canvas shows the clamped candidate.
#[derive(Clone, Copy, Default)]
pub(super) struct DrawOverrides<'a> {
    pub drag: Option<(&'a str, egui::Pos2)>,
    pub resize: Option<(&'a str, egui::Rect)>,
}

impl DrawOverrides<'_> {
    fn rect_for(&self, store: &SceneStore, obj: &SceneObject) -> egui::Rect {
        if let Some((id, rect)) = self.resize {
            if id == obj.id {
                return rect;
            }
        }
        let mut rect = geometry::object_rect(store, obj);
        if let Some((id, pos)) = self.drag {
            if id == obj.id {
                rect = egui::Rect::from_min_size(pos, rect.size());
            } else if obj.parent_id.as_deref() == Some(id) {
                // children follow their group during a drag
                let parent = store.object(id);
                if let Some(parent) = parent {
                    let delta = pos - egui::pos2(parent.x, parent.y);
                    rect = rect.translate(delta);
                }
            }
        }
        rect
    }
}

pub(super) fn draw_objects(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    store: &SceneStore,
    overrides: DrawOverrides<'_>,
) {
    for obj in store.visible_objects() {
        let world_rect = overrides.rect_for(store, obj);
        let min = viewport.world_to_screen(origin, world_rect.min);
        let rect = egui::Rect::from_min_size(min, world_rect.size() * viewport.scale);
        let desc = catalog::descriptor(&obj.kind);
        let color = if obj.fill.is_empty() {
            FALLBACK_FILL
        } else {
            fill_color(&obj.fill, obj.opacity)
        };

        match desc.shape {
            ShapeHint::Rect => {
                if obj.kind != "group" {
                    painter.rect_filled(rect, 4.0 * viewport.scale, color);
                }
            }
            ShapeHint::Circle => {
                let radius = rect.width().min(rect.height()) / 2.0;
                painter.circle_filled(rect.center(), radius, color);
            }
            ShapeHint::Text => {
                let [r, g, b] = color_from_hex(&obj.fill).unwrap_or([0, 0, 0]);
                painter.text(
                    rect.min,
                    egui::Align2::LEFT_TOP,
                    &obj.text,
                    egui::FontId::proportional((obj.font_size * viewport.scale).max(1.0)),
                    egui::Color32::from_rgb(r, g, b),
                );
            }
        }

        if obj.show_label && desc.shape != ShapeHint::Text {
            let [r, g, b] = color_from_hex(&obj.text_color).unwrap_or([255, 255, 255]);
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                &obj.name,
                egui::FontId::proportional((obj.font_size * viewport.scale).max(1.0)),
                egui::Color32::from_rgb(r, g, b),
            );
        }
    }
}

pub(super) fn draw_selection(
    painter: &egui::Painter,
    origin: egui::Pos2,
    viewport: &Viewport,
    store: &SceneStore,
    overrides: DrawOverrides<'_>,
) {
    let stroke = egui::Stroke::new(2.0, SELECTION);
    for obj in store.visible_objects() {
        if !store.is_selected(&obj.id) {
            continue;
        }
        let world_rect = overrides.rect_for(store, obj);
        let min = viewport.world_to_screen(origin, world_rect.min);
        let rect = egui::Rect::from_min_size(min, world_rect.size() * viewport.scale);
        painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Middle);
    }
}

/// Screen-space rectangles for the eight resize handles around a box.
pub(super) fn handle_rects(box_screen: egui::Rect) -> [(ResizeHandle, egui::Rect); 8] {
    let center = box_screen.center();
    let half = box_screen.size() * 0.5;
    ResizeHandle::ALL.map(|handle| {
        let (sx, sy) = handle.sign();
        let pos = center + egui::vec2(sx * half.x, sy * half.y);
        (
            handle,
            egui::Rect::from_center_size(pos, egui::vec2(HANDLE_SIZE, HANDLE_SIZE)),
        )
    })
}

pub(super) fn handle_cursor(handle: ResizeHandle) -> egui::CursorIcon {
    match handle {
        ResizeHandle::N | ResizeHandle::S => egui::CursorIcon::ResizeVertical,
        ResizeHandle::E | ResizeHandle::W => egui::CursorIcon::ResizeHorizontal,
        ResizeHandle::NE | ResizeHandle::SW => egui::CursorIcon::ResizeNeSw,
        ResizeHandle::NW | ResizeHandle::SE => egui::CursorIcon::ResizeNwSe,
    }
}

pub(super) fn tool_button(ui: &mut egui::Ui, label: &str, tool: super::Tool, selected: &mut super::Tool) {
    let active = *selected == tool;
    if ui.selectable_label(active, label).clicked() {
        *selected = tool;
    }
}
