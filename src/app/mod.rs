use eframe::egui;

use crate::store::SceneStore;

mod geometry;
mod inspector;
mod io;
mod minimap;
mod render;
mod settings;
mod update;
mod viewport;

use viewport::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tool {
    Select,
    Hand,
    Connect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResizeHandle {
    NW,
    N,
    NE,
    W,
    E,
    SW,
    S,
    SE,
}

impl ResizeHandle {
    pub(crate) const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::W,
        ResizeHandle::E,
        ResizeHandle::SW,
        ResizeHandle::S,
        ResizeHandle::SE,
    ];

    /// Unit offsets from the box center, x then y, in {-1, 0, 1}.
    pub(crate) fn sign(self) -> (f32, f32) {
        match self {
            ResizeHandle::NW => (-1.0, -1.0),
            ResizeHandle::N => (0.0, -1.0),
            ResizeHandle::NE => (1.0, -1.0),
            ResizeHandle::W => (-1.0, 0.0),
            ResizeHandle::E => (1.0, 0.0),
            ResizeHandle::SW => (-1.0, 1.0),
            ResizeHandle::S => (0.0, 1.0),
            ResizeHandle::SE => (1.0, 1.0),
        }
    }
}

/// Pointer gesture, driven by press/move/release. Releasing anywhere commits
/// the last clamped value; there is no separate cancel.
#[derive(Clone, Debug)]
pub(crate) enum Gesture {
    Idle,
    Dragging {
        id: String,
        start_world: egui::Pos2,
        origin_pos: egui::Pos2,
        current_pos: egui::Pos2,
    },
    Resizing {
        id: String,
        handle: ResizeHandle,
        start_box: egui::Rect,
        current_box: egui::Rect,
        start_world: egui::Pos2,
    },
    Panning,
}

/// Payload carried while dragging a sidebar entry onto the canvas.
#[derive(Clone, Debug)]
pub(crate) struct DragPayload {
    pub kind: String,
    pub preset: Option<String>,
}

pub struct LayoutApp {
    store: SceneStore,
    viewport: Viewport,
    tool: Tool,
    gesture: Gesture,
    connect_source: Option<String>,
    status: Option<String>,
    file_path: String,
    image_path: String,
    settings_path: String,
    overlay_texture: Option<egui::TextureHandle>,
    canvas_size: egui::Vec2,
    fitted: Option<(egui::Vec2, String, egui::Vec2)>,
    id_edit: String,
    id_edit_for: String,
    layer_id_edit: String,
    layer_id_edit_for: String,
    new_floor_name: String,
}

impl LayoutApp {
    fn config_path() -> Option<String> {
        if let Some(home) = std::env::var_os("HOME") {
            let path = std::path::PathBuf::from(home)
                .join(".config")
                .join("fablayout.toml");
            if path.exists() {
                return Some(path.display().to_string());
            }
        }
        if std::path::Path::new("settings.toml").exists() {
            return Some("settings.toml".to_string());
        }
        None
    }

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings_path = Self::config_path().unwrap_or_else(|| "settings.toml".to_string());
        let config = settings::load_settings(&settings_path)
            .or_else(|| settings::load_settings("settings.json"))
            .unwrap_or_default();

        let mut store = SceneStore::default();
        store.grid.unit = config.unit;

        Self {
            store,
            viewport: Viewport::default(),
            tool: Tool::Select,
            gesture: Gesture::Idle,
            connect_source: None,
            status: None,
            file_path: config.file_path,
            image_path: config.image_path,
            settings_path,
            overlay_texture: None,
            canvas_size: egui::Vec2::ZERO,
            fitted: None,
            id_edit: String::new(),
            id_edit_for: String::new(),
            layer_id_edit: String::new(),
            layer_id_edit_for: String::new(),
            new_floor_name: String::new(),
        }
    }

    fn settings_snapshot(&self) -> settings::AppSettings {
        settings::AppSettings {
            file_path: self.file_path.clone(),
            image_path: self.image_path.clone(),
            unit: self.store.grid.unit,
        }
    }

    fn persist_settings(&mut self) {
        let snapshot = self.settings_snapshot();
        if let Err(e) = settings::save_settings(&self.settings_path, &snapshot) {
            self.status = Some(format!("Settings save failed: {e}"));
        }
    }

    /// True when the active floor refuses interactive edits.
    fn active_layer_locked(&self) -> bool {
        self.store.active_layer().is_some_and(|l| l.locked)
    }
}
