use eframe::egui;

use crate::catalog;
use crate::model::{generate_id, CanvasLink, SubLayer};

use super::render::{self, tool_button, DrawOverrides};
use super::viewport::Viewport;
use super::{geometry, minimap, DragPayload, Gesture, LayoutApp, Tool};

const CANVAS_BG: egui::Color32 = egui::Color32::from_rgb(0xf3, 0xf4, 0xf6);
const HANDLE_FILL: egui::Color32 = egui::Color32::from_rgb(250, 250, 250);
const HANDLE_STROKE: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);

fn world_rect_to_screen(vp: &Viewport, origin: egui::Pos2, rect: egui::Rect) -> egui::Rect {
    egui::Rect::from_min_size(vp.world_to_screen(origin, rect.min), rect.size() * vp.scale)
}

fn screen_rect_to_world(vp: &Viewport, origin: egui::Pos2, rect: egui::Rect) -> egui::Rect {
    egui::Rect::from_min_size(vp.screen_to_world(origin, rect.min), rect.size() / vp.scale)
}

impl eframe::App for LayoutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            self.top_bar_ui(ui, ctx);
        });
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.bottom_bar_ui(ui);
        });
        egui::SidePanel::left("library")
            .resizable(true)
            .default_width(190.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.sidebar_ui(ui));
            });
        egui::SidePanel::right("inspector")
            .resizable(true)
            .min_width(230.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.inspector_ui(ui));
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas_ui(ui, ctx);
        });
    }
}

impl LayoutApp {
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let wants_keyboard = ctx.wants_keyboard_input();
        ctx.input_mut(|i| {
            let mut copy_requested = false;
            let mut paste_requested = false;
            if !wants_keyboard {
                for event in &i.events {
                    match event {
                        egui::Event::Copy => copy_requested = true,
                        egui::Event::Paste(_) => paste_requested = true,
                        _ => {}
                    }
                }
            }
            if copy_requested {
                self.store.copy_selected();
                self.status = Some(format!("Copied {} object(s)", self.store.clipboard_len()));
            }
            if paste_requested {
                self.store.paste_clipboard();
            }

            if wants_keyboard {
                return;
            }
            if i.consume_key(
                egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
                egui::Key::Z,
            ) || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)
            {
                self.store.redo();
            } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z) {
                self.store.undo();
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace)
            {
                self.store.delete_selection();
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Escape) {
                self.tool = Tool::Select;
                self.gesture = Gesture::Idle;
                self.connect_source = None;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::V) {
                self.tool = Tool::Select;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::H) {
                self.tool = Tool::Hand;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::C) {
                self.tool = Tool::Connect;
            }

            let step = if i.modifiers.shift { 10.0 } else { 1.0 };
            let mut nudge = egui::Vec2::ZERO;
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowLeft)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowLeft)
            {
                nudge.x -= step;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowRight)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowRight)
            {
                nudge.x += step;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowUp)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowUp)
            {
                nudge.y -= step;
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::ArrowDown)
                || i.consume_key(egui::Modifiers::SHIFT, egui::Key::ArrowDown)
            {
                nudge.y += step;
            }
            if nudge != egui::Vec2::ZERO && !self.store.selected.is_empty() {
                self.store.record_edit();
                for id in self.store.selected.clone() {
                    self.store.patch_object(&id, |o| {
                        o.x += nudge.x;
                        o.y += nudge.y;
                    });
                }
            }
        });
    }

    fn top_bar_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            ui.strong("Fab Layout");
            ui.separator();
            if ui
                .add_enabled(self.store.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                self.store.undo();
            }
            if ui
                .add_enabled(self.store.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                self.store.redo();
            }
            ui.separator();
            tool_button(ui, "Select (V)", Tool::Select, &mut self.tool);
            tool_button(ui, "Hand (H)", Tool::Hand, &mut self.tool);
            tool_button(ui, "Connect (C)", Tool::Connect, &mut self.tool);
            ui.separator();

            let layers: Vec<(String, String)> = self
                .store
                .layers
                .iter()
                .map(|l| (l.id.clone(), l.name.clone()))
                .collect();
            let mut active = self.store.active_layer_id.clone();
            egui::ComboBox::from_id_salt("floor_select")
                .selected_text(
                    self.store
                        .active_layer()
                        .map(|l| l.name.clone())
                        .unwrap_or_default(),
                )
                .show_ui(ui, |ui| {
                    for (id, name) in &layers {
                        ui.selectable_value(&mut active, id.clone(), name);
                    }
                });
            if active != self.store.active_layer_id {
                self.store.set_active_layer(&active);
            }

            let mut mode = self.store.view_mode;
            if ui
                .selectable_label(mode == SubLayer::Bottom, "Bottom")
                .clicked()
            {
                mode = SubLayer::Bottom;
            }
            if ui.selectable_label(mode == SubLayer::Top, "Top").clicked() {
                mode = SubLayer::Top;
            }
            if mode != self.store.view_mode {
                self.store.set_view_mode(mode);
            }

            ui.separator();
            if ui.button("Save").clicked() {
                self.save_layout_dialog();
            }
            if ui.button("Load").clicked() {
                self.load_layout_dialog();
            }
            if ui.button("Export PNG").clicked() {
                self.export_image_dialog();
            }
            if ui.button("Import CAD").clicked() {
                self.import_overlay_dialog(ctx);
            }
        });
    }

    fn sidebar_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Library");
        ui.separator();
        ui.label("Shapes");
        for kind in catalog::BASIC_KINDS {
            let src_id = ui.id().with(("shape", kind));
            ui.dnd_drag_source(
                src_id,
                DragPayload {
                    kind: kind.to_string(),
                    preset: None,
                },
                |ui| {
                    ui.label(catalog::descriptor(kind).label);
                },
            );
        }

        ui.separator();
        ui.label("Assets");
        let assets: Vec<(String, String, String)> = self
            .store
            .assets
            .iter()
            .map(|a| (a.id.clone(), a.name.clone(), a.kind.clone()))
            .collect();
        for (asset_id, name, kind) in assets {
            let src_id = ui.id().with(("preset", asset_id.as_str()));
            let active = self.store.active_asset_id.as_deref() == Some(asset_id.as_str());
            let clicked = ui
                .dnd_drag_source(
                    src_id,
                    DragPayload {
                        kind,
                        preset: Some(asset_id.clone()),
                    },
                    |ui| ui.selectable_label(active, &name).clicked(),
                )
                .inner;
            if clicked {
                self.store.set_active_asset(Some(&asset_id));
            }
        }
        ui.small("Drag onto the canvas to place");

        ui.separator();
        ui.label("Floors");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.new_floor_name);
            if ui.button("Add").clicked() && !self.new_floor_name.trim().is_empty() {
                let name = self.new_floor_name.trim().to_string();
                let id = self.store.add_layer(&name);
                self.store.set_active_layer(&id);
                self.new_floor_name.clear();
            }
        });
    }

    fn bottom_bar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.tool {
                Tool::Connect => {
                    let hint = if self.connect_source.is_some() {
                        "Click target object to connect"
                    } else {
                        "Click source object to start connection"
                    };
                    ui.label(hint);
                }
                _ => {
                    ui.label(self.status.as_deref().unwrap_or("Ready"));
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Fit").clicked() {
                    self.fitted = None;
                }
                if ui.button("+").clicked() {
                    self.viewport.step_zoom(self.canvas_size, 1.0);
                }
                ui.label(format!("{:.0}%", self.viewport.zoom_percent()));
                if ui.button("-").clicked() {
                    self.viewport.step_zoom(self.canvas_size, -1.0);
                }
                ui.separator();
                ui.label(format!(
                    "Objects: {}  Selected: {}",
                    self.store.visible_objects().count(),
                    self.store.selected.len()
                ));
            });
        });
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let origin = rect.min;
        self.canvas_size = rect.size();

        let (floor_w, floor_h) = self.store.floor_extent();
        let extent = egui::vec2(floor_w, floor_h);
        let fit_key = (rect.size(), self.store.active_layer_id.clone(), extent);
        if self.fitted.as_ref() != Some(&fit_key) {
            self.viewport.fit_to_screen(rect.size(), extent);
            self.fitted = Some(fit_key);
        }

        let scroll = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll.abs() > 0.0 {
            if let Some(hover) = ctx.input(|i| i.pointer.hover_pos()) {
                if rect.contains(hover) {
                    self.viewport.wheel_zoom(origin, hover, -scroll);
                }
            }
        }

        let pointer = ctx.input(|i| i.pointer.interact_pos());
        let pointer_world = pointer.map(|p| self.viewport.screen_to_world(origin, p));
        let threshold = 6.0 / self.viewport.scale.max(f32::EPSILON);

        if response.drag_started() || response.clicked() {
            if let Some(world) = pointer_world {
                self.canvas_press(world, threshold, response.drag_started(), ctx);
            }
        }

        if response.dragged() {
            let mut gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
            match &mut gesture {
                Gesture::Panning => {
                    self.viewport.position += response.drag_delta();
                }
                Gesture::Dragging {
                    id,
                    start_world,
                    origin_pos,
                    current_pos,
                } => {
                    if let Some(world) = pointer_world {
                        let size = self
                            .store
                            .object(id)
                            .map(|o| egui::vec2(o.width, o.height))
                            .unwrap_or_default();
                        let candidate = *origin_pos + (world - *start_world);
                        let candidate_screen = self.viewport.world_to_screen(origin, candidate);
                        let bounded = geometry::drag_bound(
                            candidate_screen,
                            size,
                            extent,
                            &self.viewport,
                            origin,
                        );
                        *current_pos = self.viewport.screen_to_world(origin, bounded);
                    }
                }
                _ => {}
            }
            self.gesture = gesture;
        }

        if response.drag_stopped() {
            self.commit_gesture();
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, CANVAS_BG);
        render::draw_overlay(
            &painter,
            origin,
            &self.viewport,
            &self.store,
            self.overlay_texture.as_ref(),
        );
        render::draw_grid(
            &painter,
            origin,
            &self.viewport,
            rect,
            self.store.grid.size,
            extent,
        );
        {
            let overrides = match &self.gesture {
                Gesture::Dragging { id, current_pos, .. } => DrawOverrides {
                    drag: Some((id.as_str(), *current_pos)),
                    resize: None,
                },
                Gesture::Resizing { id, current_box, .. } => DrawOverrides {
                    drag: None,
                    resize: Some((id.as_str(), *current_box)),
                },
                _ => DrawOverrides::default(),
            };
            render::draw_links(&painter, origin, &self.viewport, &self.store);
            render::draw_objects(&painter, origin, &self.viewport, &self.store, overrides);
            render::draw_selection(&painter, origin, &self.viewport, &self.store, overrides);

            if let Some(source) = &self.connect_source {
                if let Some(obj) = self.store.object(source) {
                    let world = geometry::object_rect(&self.store, obj);
                    let screen = world_rect_to_screen(&self.viewport, origin, world);
                    painter.rect_stroke(
                        screen.expand(3.0),
                        0.0,
                        egui::Stroke::new(2.0, egui::Color32::from_rgb(0x10, 0xb9, 0x81)),
                        egui::StrokeKind::Middle,
                    );
                }
            }
        }

        self.selection_handles(ui, origin, pointer_world, ctx, extent);
        minimap::minimap_ui(ui, rect, &self.store, &mut self.viewport);

        if let Some(payload) = response.dnd_release_payload::<DragPayload>() {
            if let Some(pos) = response.hover_pos() {
                let world = self.viewport.screen_to_world(origin, pos);
                if self
                    .store
                    .spawn_object_at(&payload.kind, payload.preset.as_deref(), world.x, world.y)
                    .is_none()
                {
                    self.status = Some("Floor is locked".to_string());
                }
            }
        }
    }

    fn canvas_press(
        &mut self,
        world: egui::Pos2,
        threshold: f32,
        drag_started: bool,
        ctx: &egui::Context,
    ) {
        match self.tool {
            Tool::Hand => {
                if drag_started {
                    self.gesture = Gesture::Panning;
                }
            }
            Tool::Connect => {
                if let Some(hit) = geometry::hit_test(&self.store, world) {
                    match self.connect_source.take() {
                        None => self.connect_source = Some(hit),
                        Some(source) if source != hit => {
                            self.store.add_link(CanvasLink {
                                id: generate_id(),
                                from: source,
                                to: hit,
                                color: "#000000".to_string(),
                            });
                            self.tool = Tool::Select;
                        }
                        Some(source) => self.connect_source = Some(source),
                    }
                } else {
                    self.connect_source = None;
                    self.tool = Tool::Select;
                    self.store.select_one(None);
                }
            }
            Tool::Select => {
                let multi = ctx.input(|i| i.modifiers.shift || i.modifiers.command);
                if let Some(id) = geometry::hit_test(&self.store, world) {
                    if multi {
                        self.store.toggle_selected(&id);
                    } else if !self.store.is_selected(&id) {
                        self.store.select_one(Some(&id));
                    }
                    if drag_started && !self.active_layer_locked() {
                        if let Some(obj) = self.store.object(&id) {
                            let origin_pos = egui::pos2(obj.x, obj.y);
                            self.gesture = Gesture::Dragging {
                                id: id.clone(),
                                start_world: world,
                                origin_pos,
                                current_pos: origin_pos,
                            };
                        }
                    }
                } else if let Some(link_id) = geometry::hit_test_link(&self.store, world, threshold)
                {
                    if multi {
                        self.store.toggle_selected(&link_id);
                    } else {
                        self.store.select_one(Some(&link_id));
                    }
                } else if self.store.overlay.as_ref().is_some_and(|o| {
                    world.x >= o.x
                        && world.x <= o.x + o.width
                        && world.y >= o.y
                        && world.y <= o.y + o.height
                }) {
                    self.store.select_overlay();
                } else {
                    // Empty canvas clears the selection and any inspector focus.
                    self.store.select_one(None);
                }
            }
        }
    }

    /// Releasing the pointer commits the last clamped gesture value.
    fn commit_gesture(&mut self) {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Dragging {
                id,
                origin_pos,
                current_pos,
                ..
            } => {
                if current_pos != origin_pos {
                    self.store.update_object(&id, |o| {
                        o.x = current_pos.x;
                        o.y = current_pos.y;
                    });
                }
            }
            Gesture::Resizing {
                id,
                start_box,
                current_box,
                ..
            } => {
                if current_box != start_box {
                    self.store.update_object(&id, |o| {
                        o.x = current_box.min.x;
                        o.y = current_box.min.y;
                        o.width = current_box.width();
                        o.height = current_box.height();
                    });
                }
            }
            _ => {}
        }
    }

    /// Resize handles for a single selected, unlocked, top-level object.
    fn selection_handles(
        &mut self,
        ui: &mut egui::Ui,
        origin: egui::Pos2,
        pointer_world: Option<egui::Pos2>,
        ctx: &egui::Context,
        extent: egui::Vec2,
    ) {
        if self.store.selected.len() != 1 {
            if matches!(self.gesture, Gesture::Resizing { .. }) {
                self.gesture = Gesture::Idle;
            }
            return;
        }
        let id = self.store.selected[0].clone();
        let Some(obj) = self.store.object(&id).cloned() else {
            return;
        };
        if obj.parent_id.is_some()
            || obj.width <= 0.0
            || obj.height <= 0.0
            || self.active_layer_locked()
        {
            return;
        }

        // Advance an in-flight resize from the pointer position.
        let mut stop = false;
        let mut next_box = None;
        if let Gesture::Resizing {
            id: gesture_id,
            handle,
            start_box,
            current_box,
            start_world,
        } = &self.gesture
        {
            if *gesture_id != id {
                stop = true;
            } else if let Some(world) = pointer_world {
                let delta = world - *start_world;
                let (sx, sy) = handle.sign();
                let mut min = start_box.min;
                let mut max = start_box.max;
                if sx < 0.0 {
                    min.x += delta.x;
                } else if sx > 0.0 {
                    max.x += delta.x;
                }
                if sy < 0.0 {
                    min.y += delta.y;
                } else if sy > 0.0 {
                    max.y += delta.y;
                }
                let candidate = egui::Rect::from_min_max(min, max);
                let old_screen = world_rect_to_screen(&self.viewport, origin, *current_box);
                let new_screen = world_rect_to_screen(&self.viewport, origin, candidate);
                let bounded = geometry::resize_bound(
                    old_screen,
                    new_screen,
                    &self.viewport,
                    origin,
                    extent,
                    self.store.grid.size,
                );
                next_box = Some(screen_rect_to_world(&self.viewport, origin, bounded));
            }
        }
        if stop {
            self.gesture = Gesture::Idle;
        } else if let Some(bounded) = next_box {
            if let Gesture::Resizing { current_box, .. } = &mut self.gesture {
                *current_box = bounded;
            }
        }

        let display_box = match &self.gesture {
            Gesture::Resizing {
                id: gesture_id,
                current_box,
                ..
            } if *gesture_id == id => *current_box,
            _ => egui::Rect::from_min_size(
                egui::pos2(obj.x, obj.y),
                egui::vec2(obj.width, obj.height),
            ),
        };
        let box_screen = world_rect_to_screen(&self.viewport, origin, display_box);

        let painter = ui.painter().clone();
        let stroke = egui::Stroke::new(1.0, HANDLE_STROKE);
        for (handle, handle_rect) in render::handle_rects(box_screen) {
            let handle_id = ui.id().with(("resize", id.as_str(), handle as u8));
            let resp = ui.interact(handle_rect, handle_id, egui::Sense::drag());
            painter.rect_filled(handle_rect, 1.0, HANDLE_FILL);
            painter.rect_stroke(handle_rect, 1.0, stroke, egui::StrokeKind::Middle);
            if resp.drag_started() {
                if let Some(world) = pointer_world {
                    self.gesture = Gesture::Resizing {
                        id: id.clone(),
                        handle,
                        start_box: display_box,
                        current_box: display_box,
                        start_world: world,
                    };
                }
            }
            if resp.drag_stopped() {
                self.commit_gesture();
            }
            if resp.hovered() || resp.dragged() {
                ctx.set_cursor_icon(render::handle_cursor(handle));
            }
        }
    }
}
