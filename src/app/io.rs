//! File boundary: layout JSON persistence, PNG export, CAD overlay import.
//! Everything here returns typed errors; the shell maps them to the status
//! bar. Store state is only touched after a payload fully validates.

use eframe::egui;
use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{self, ShapeHint};
use crate::model::{color_from_hex, CadOverlay, SceneObject};
use crate::store::SceneStore;

use super::geometry;
use super::viewport::Viewport;
use super::LayoutApp;

/// Export renders at a fixed device pixel ratio of 2.
const EXPORT_PIXEL_RATIO: f32 = 2.0;

#[derive(Debug, Error)]
pub(super) enum IoError {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("layout must be a JSON array of objects ({0})")]
    Parse(#[from] serde_json::Error),
    #[error("image failed: {0}")]
    Image(#[from] image::ImageError),
}

pub(super) fn layout_to_json(objects: &[SceneObject]) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(objects)?)
}

/// The persisted format is a bare JSON array of object records. Anything
/// else is rejected before any state changes.
pub(super) fn layout_from_json(json: &str) -> Result<Vec<SceneObject>, IoError> {
    Ok(serde_json::from_str(json)?)
}

/// Rasterize the current viewport into an RGBA buffer at 2x. Pure read of
/// render state: links first, then the visible objects by shape hint.
pub(super) fn render_layout_image(
    store: &SceneStore,
    viewport: &Viewport,
    canvas_size: egui::Vec2,
) -> RgbaImage {
    let width = ((canvas_size.x * EXPORT_PIXEL_RATIO) as u32).max(1);
    let height = ((canvas_size.y * EXPORT_PIXEL_RATIO) as u32).max(1);
    let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    let to_px = |world: egui::Pos2| -> (f32, f32) {
        let screen = world.to_vec2() * viewport.scale + viewport.position;
        (screen.x * EXPORT_PIXEL_RATIO, screen.y * EXPORT_PIXEL_RATIO)
    };

    for link in &store.links {
        if let Some((a, b)) = geometry::link_endpoints(store, &link.from, &link.to) {
            let color = color_from_hex(&link.color).unwrap_or([0, 0, 0]);
            draw_line(&mut img, to_px(a), to_px(b), color, 2.0 * EXPORT_PIXEL_RATIO);
        }
    }

    for obj in store.visible_objects() {
        let rect = geometry::object_rect(store, obj);
        let (x0, y0) = to_px(rect.min);
        let (x1, y1) = to_px(rect.max);
        let rgb = color_from_hex(&obj.fill).unwrap_or([0x94, 0xa3, 0xb8]);
        if obj.fill == "transparent" {
            continue;
        }
        let alpha = (obj.opacity.clamp(0.0, 1.0) * 255.0) as u8;
        let color = [rgb[0], rgb[1], rgb[2], alpha];
        match catalog::descriptor(&obj.kind).shape {
            ShapeHint::Circle => {
                let radius = ((x1 - x0).min(y1 - y0) / 2.0).max(0.0);
                fill_circle(
                    &mut img,
                    ((x0 + x1) / 2.0, (y0 + y1) / 2.0),
                    radius,
                    color,
                );
            }
            _ => fill_rect(&mut img, (x0, y0), (x1, y1), color),
        }
    }

    img
}

fn blend(img: &mut RgbaImage, x: i64, y: i64, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let alpha = color[3] as f32 / 255.0;
    let dst = img.get_pixel(x, y).0;
    let mixed = [
        (color[0] as f32 * alpha + dst[0] as f32 * (1.0 - alpha)) as u8,
        (color[1] as f32 * alpha + dst[1] as f32 * (1.0 - alpha)) as u8,
        (color[2] as f32 * alpha + dst[2] as f32 * (1.0 - alpha)) as u8,
        255,
    ];
    img.put_pixel(x, y, Rgba(mixed));
}

fn fill_rect(img: &mut RgbaImage, min: (f32, f32), max: (f32, f32), color: [u8; 4]) {
    let x0 = min.0.floor().max(0.0) as i64;
    let y0 = min.1.floor().max(0.0) as i64;
    let x1 = (max.0.ceil() as i64).min(img.width() as i64);
    let y1 = (max.1.ceil() as i64).min(img.height() as i64);
    for y in y0..y1 {
        for x in x0..x1 {
            blend(img, x, y, color);
        }
    }
}

fn fill_circle(img: &mut RgbaImage, center: (f32, f32), radius: f32, color: [u8; 4]) {
    let x0 = (center.0 - radius).floor() as i64;
    let y0 = (center.1 - radius).floor() as i64;
    let x1 = (center.0 + radius).ceil() as i64;
    let y1 = (center.1 + radius).ceil() as i64;
    let r2 = radius * radius;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - center.0;
            let dy = y as f32 + 0.5 - center.1;
            if dx * dx + dy * dy <= r2 {
                blend(img, x, y, color);
            }
        }
    }
}

fn draw_line(img: &mut RgbaImage, a: (f32, f32), b: (f32, f32), rgb: [u8; 3], thickness: f32) {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len = (dx * dx + dy * dy).sqrt();
    let steps = len.ceil().max(1.0) as i64;
    let half = (thickness / 2.0).max(0.5);
    let color = [rgb[0], rgb[1], rgb[2], 255];
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let cx = a.0 + dx * t;
        let cy = a.1 + dy * t;
        let px0 = (cx - half) as i64;
        let px1 = (cx + half).ceil() as i64;
        let py0 = (cy - half) as i64;
        let py1 = (cy + half).ceil() as i64;
        for y in py0..py1 {
            for x in px0..px1 {
                blend(img, x, y, color);
            }
        }
    }
}

impl LayoutApp {
    pub(super) fn save_layout_dialog(&mut self) {
        let default_name = std::path::Path::new(&self.file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("layout.json")
            .to_string();
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("JSON", &["json"])
            .save_file()
        else {
            return;
        };
        let path_str = path.display().to_string();
        match layout_to_json(&self.store.objects).and_then(|json| Ok(std::fs::write(&path, json)?))
        {
            Ok(()) => {
                self.file_path = path_str.clone();
                self.persist_settings();
                info!(path = %path_str, "layout saved");
                self.status = Some(format!("Saved {path_str}"));
            }
            Err(e) => self.status = Some(format!("Save failed: {e}")),
        }
    }

    pub(super) fn load_layout_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new().add_filter("JSON", &["json"]).pick_file() else {
            return;
        };
        let path_str = path.display().to_string();
        let loaded = std::fs::read_to_string(&path)
            .map_err(IoError::from)
            .and_then(|json| layout_from_json(&json));
        match loaded {
            Ok(objects) => {
                self.store.set_objects(objects);
                self.file_path = path_str.clone();
                self.persist_settings();
                self.status = Some(format!("Loaded {path_str}"));
            }
            Err(e) => {
                warn!(path = %path_str, error = %e, "layout rejected");
                self.status = Some(format!("Load failed: {e}"));
            }
        }
    }

    pub(super) fn export_image_dialog(&mut self) {
        if self.canvas_size.x <= 0.0 || self.canvas_size.y <= 0.0 {
            return;
        }
        let default_name = std::path::Path::new(&self.image_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("layout.png")
            .to_string();
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(&default_name)
            .add_filter("PNG", &["png"])
            .save_file()
        else {
            return;
        };
        let img = render_layout_image(&self.store, &self.viewport, self.canvas_size);
        let path_str = path.display().to_string();
        match img.save(&path) {
            Ok(()) => {
                self.image_path = path_str.clone();
                self.persist_settings();
                info!(path = %path_str, "image exported");
                self.status = Some(format!("Exported {path_str}"));
            }
            Err(e) => self.status = Some(format!("Export failed: {e}")),
        }
    }

    /// Bring an already-converted floor drawing in as the CAD overlay. The
    /// conversion service itself is an external collaborator; this accepts
    /// its PNG output.
    pub(super) fn import_overlay_dialog(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .pick_file()
        else {
            return;
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("overlay")
            .to_string();
        let loaded = std::fs::read(&path)
            .map_err(IoError::from)
            .and_then(|bytes| Ok(image::load_from_memory(&bytes)?));
        match loaded {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let (width, height) = (rgba.width(), rgba.height());
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [width as usize, height as usize],
                    rgba.as_raw(),
                );
                self.overlay_texture = Some(ctx.load_texture(
                    "cad-overlay",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
                self.store
                    .set_overlay(Some(CadOverlay::new(name.clone(), width as f32, height as f32)));
                self.store.fit_overlay_to_floor();
                info!(name = %name, width, height, "overlay imported");
                self.status = Some(format!("Imported overlay {name} ({width}x{height}px)"));
            }
            Err(e) => {
                warn!(error = %e, "overlay import failed");
                self.status = Some(format!("Import failed: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_array_payloads_are_rejected() {
        assert!(layout_from_json("{\"id\":\"a\"}").is_err());
        assert!(layout_from_json("42").is_err());
        assert!(layout_from_json("not json").is_err());
        assert!(layout_from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn layout_round_trips_through_json() {
        let objects = vec![SceneObject {
            id: "Agv_x1".into(),
            kind: "agv".into(),
            layer_id: "1f".into(),
            x: 1500.0,
            y: 2500.0,
            width: 500.0,
            height: 500.0,
            ..SceneObject::default()
        }];
        let json = layout_to_json(&objects).unwrap();
        assert!(json.trim_start().starts_with('['));
        let back = layout_from_json(&json).unwrap();
        assert_eq!(back, objects);
    }

    #[test]
    fn export_doubles_the_canvas_resolution() {
        let mut store = SceneStore::default();
        store.add_object(SceneObject {
            id: "r".into(),
            kind: "rect".into(),
            layer_id: "1f".into(),
            width: 30_000.0,
            height: 20_000.0,
            fill: "#ff0000".into(),
            opacity: 1.0,
            ..SceneObject::default()
        });
        let mut vp = Viewport::default();
        vp.fit_to_screen(egui::vec2(100.0, 80.0), egui::vec2(30_000.0, 20_000.0));
        let img = render_layout_image(&store, &vp, egui::vec2(100.0, 80.0));
        assert_eq!(img.dimensions(), (200, 160));
        // The center of the floor lands inside the filled rect.
        let center = img.get_pixel(100, 80).0;
        assert_eq!(center, [255, 0, 0, 255]);
        // The far corner is padding, untouched white.
        let corner = img.get_pixel(0, 0).0;
        assert_eq!(corner, [255, 255, 255, 255]);
    }
}
