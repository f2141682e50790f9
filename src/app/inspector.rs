//! Right-hand properties panel. Exactly one inspector context is live at a
//! time: multi-selection, a single object or link, the CAD overlay, an asset
//! preset, or (fallback) the active floor and fab settings.

use eframe::egui;

use crate::model::{color_from_hex, LayerKind, SubLayer, Unit};
use crate::store::AlignKind;

use super::LayoutApp;

fn unit_value(
    ui: &mut egui::Ui,
    label: &str,
    unit: Unit,
    world: &mut f32,
    push_undo: &mut bool,
) -> bool {
    let mut display = unit.to_display(*world);
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        let resp = ui.add(egui::DragValue::new(&mut display).speed(1.0));
        *push_undo |= resp.gained_focus() || resp.drag_started();
        if resp.changed() {
            *world = unit.from_display(display);
            changed = true;
        }
    });
    changed
}

fn hex_color_edit(ui: &mut egui::Ui, label: &str, hex: &mut String) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        let mut rgb = color_from_hex(hex).unwrap_or([0x94, 0xa3, 0xb8]);
        if ui.color_edit_button_srgb(&mut rgb).changed() {
            *hex = format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]);
            changed = true;
        }
        let resp = ui.text_edit_singleline(hex);
        changed |= resp.changed();
    });
    changed
}

impl LayoutApp {
    pub(super) fn inspector_ui(&mut self, ui: &mut egui::Ui) {
        if self.store.selected.len() > 1 {
            self.multi_select_ui(ui);
        } else if self.store.selected.len() == 1 {
            let id = self.store.selected[0].clone();
            if self.store.object(&id).is_some() {
                self.object_ui(ui, &id);
            } else if self.store.link(&id).is_some() {
                self.link_ui(ui, &id);
            }
        } else if self.store.overlay_selected && self.store.overlay.is_some() {
            self.overlay_ui(ui);
        } else if let Some(asset_id) = self.store.active_asset_id.clone() {
            self.asset_ui(ui, &asset_id);
        } else {
            self.layer_ui(ui);
        }
    }

    fn multi_select_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading(format!("{} objects selected", self.store.selected.len()));
        if let Some(bounds) = super::geometry::selection_bounds(&self.store) {
            let unit = self.store.grid.unit;
            ui.small(format!(
                "Bounds {} x {} {}",
                unit.to_display(bounds.width()),
                unit.to_display(bounds.height()),
                unit.label()
            ));
        }
        ui.separator();
        ui.label("Alignment");
        let aligns = [
            ("Left", AlignKind::Left),
            ("Center", AlignKind::Center),
            ("Right", AlignKind::Right),
            ("Top", AlignKind::Top),
            ("Middle", AlignKind::Middle),
            ("Bottom", AlignKind::Bottom),
        ];
        ui.horizontal_wrapped(|ui| {
            for (label, kind) in aligns {
                if ui.button(label).clicked() {
                    self.store.align_selected(kind);
                }
            }
        });
        ui.separator();
        if ui.button("Group selection").clicked() {
            let ids = self.store.selected.clone();
            self.store.group_objects(&ids);
        }
        if ui.button("Delete selection").clicked() {
            self.store.delete_selection();
        }
    }

    fn object_ui(&mut self, ui: &mut egui::Ui, id: &str) {
        let Some(original) = self.store.object(id).cloned() else {
            return;
        };
        let unit = self.store.grid.unit;
        let mut edited = original.clone();
        let mut push_undo = false;

        ui.heading(format!("{} ({})", original.name, original.kind));
        ui.separator();

        if self.id_edit_for != id {
            self.id_edit_for = id.to_string();
            self.id_edit = id.to_string();
        }
        ui.label("Id");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.id_edit);
            if ui.button("Rename").clicked() && self.id_edit != id {
                let new_id = self.id_edit.clone();
                self.store.rename_object(id, &new_id);
                if self.store.object(&new_id).is_none() {
                    self.status = Some(format!("Id '{new_id}' is taken"));
                    self.id_edit = id.to_string();
                } else {
                    self.id_edit_for = new_id;
                }
            }
        });
        if self.store.object(id).is_none() {
            return;
        }

        ui.label("Name");
        let resp = ui.text_edit_singleline(&mut edited.name);
        push_undo |= resp.gained_focus();

        ui.separator();
        ui.label(format!("Position ({})", unit.label()));
        unit_value(ui, "X", unit, &mut edited.x, &mut push_undo);
        unit_value(ui, "Y", unit, &mut edited.y, &mut push_undo);
        unit_value(ui, "Z", unit, &mut edited.z, &mut push_undo);

        ui.label(format!("Size ({})", unit.label()));
        unit_value(ui, "W", unit, &mut edited.width, &mut push_undo);
        unit_value(ui, "H", unit, &mut edited.height, &mut push_undo);
        unit_value(ui, "D", unit, &mut edited.depth, &mut push_undo);

        ui.horizontal(|ui| {
            ui.label("Rotation");
            let resp = ui.add(egui::DragValue::new(&mut edited.rotation).speed(1.0).suffix("°"));
            push_undo |= resp.gained_focus() || resp.drag_started();
        });
        let resp = ui.add(egui::Slider::new(&mut edited.opacity, 0.0..=1.0).text("Opacity"));
        push_undo |= resp.drag_started();

        ui.separator();
        push_undo |= hex_color_edit(ui, "Fill", &mut edited.fill);
        let resp = ui.checkbox(&mut edited.show_label, "Show label");
        push_undo |= resp.clicked();
        if edited.show_label {
            push_undo |= hex_color_edit(ui, "Label color", &mut edited.text_color);
            ui.horizontal(|ui| {
                ui.label("Font size");
                let resp = ui.add(egui::DragValue::new(&mut edited.font_size).speed(0.5));
                push_undo |= resp.gained_focus() || resp.drag_started();
            });
        }
        if original.kind == "text" {
            ui.label("Text");
            let resp = ui.text_edit_multiline(&mut edited.text);
            push_undo |= resp.gained_focus();
        }

        ui.horizontal(|ui| {
            ui.label("Sub-layer");
            let mut sub = edited.sub_layer;
            egui::ComboBox::from_id_salt("obj_sub_layer")
                .selected_text(match sub {
                    SubLayer::Bottom => "Bottom",
                    SubLayer::Top => "Top",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut sub, SubLayer::Bottom, "Bottom");
                    ui.selectable_value(&mut sub, SubLayer::Top, "Top");
                });
            if sub != edited.sub_layer {
                edited.sub_layer = sub;
                push_undo = true;
            }
        });

        if !original.metadata.is_empty() {
            ui.separator();
            ui.label("Metadata");
            for (key, value) in &original.metadata {
                ui.small(format!("{key}: {value}"));
            }
        }

        ui.separator();
        if original.kind == "group" {
            if ui.button("Ungroup").clicked() {
                self.store.ungroup_objects(id);
                return;
            }
        }
        if ui.button("Delete").clicked() {
            self.store.remove_object(id);
            return;
        }

        if edited != original {
            if push_undo {
                self.store.record_edit();
            }
            self.store.patch_object(id, |obj| *obj = edited);
        }
    }

    fn link_ui(&mut self, ui: &mut egui::Ui, id: &str) {
        let Some(original) = self.store.link(id).cloned() else {
            return;
        };
        ui.heading("Link");
        ui.separator();
        ui.small(format!("{} → {}", original.from, original.to));
        let mut color = original.color.clone();
        if hex_color_edit(ui, "Color", &mut color) && color != original.color {
            self.store.update_link(id, |l| l.color = color);
        }
        ui.separator();
        if ui.button("Delete link").clicked() {
            self.store.remove_link(id);
        }
    }

    fn overlay_ui(&mut self, ui: &mut egui::Ui) {
        let Some(original) = self.store.overlay.clone() else {
            return;
        };
        let unit = self.store.grid.unit;
        let mut edited = original.clone();
        let mut push_undo = false;

        ui.heading("CAD Overlay");
        ui.separator();
        ui.label("Name");
        ui.text_edit_singleline(&mut edited.name);
        ui.add(egui::Slider::new(&mut edited.opacity, 0.0..=1.0).text("Opacity"));

        ui.separator();
        ui.label(format!("Placement ({})", unit.label()));
        unit_value(ui, "X", unit, &mut edited.x, &mut push_undo);
        unit_value(ui, "Y", unit, &mut edited.y, &mut push_undo);
        let mut w = edited.width;
        if unit_value(ui, "W", unit, &mut w, &mut push_undo) {
            edited.width = w.max(1.0);
        }
        let mut h = edited.height;
        if unit_value(ui, "H", unit, &mut h, &mut push_undo) {
            edited.height = h.max(1.0);
        }
        if ui.button("Fit to floor").clicked() {
            if edited != original {
                self.store.update_overlay(|o| *o = edited);
            }
            self.store.fit_overlay_to_floor();
            return;
        }

        ui.separator();
        ui.label("Crop (pixels)");
        let mut crop = [
            edited.crop_x,
            edited.crop_y,
            edited.crop_width,
            edited.crop_height,
        ];
        let mut crop_changed = false;
        for (value, label) in crop.iter_mut().zip(["X", "Y", "W", "H"]) {
            ui.horizontal(|ui| {
                ui.label(label);
                crop_changed |= ui.add(egui::DragValue::new(value).speed(1.0)).changed();
            });
        }
        if crop_changed {
            edited.set_crop(crop[0], crop[1], crop[2], crop[3]);
        }
        if ui.button("Reset crop").clicked() {
            let (w, h) = (edited.natural_width, edited.natural_height);
            edited.set_crop(0.0, 0.0, w, h);
        }

        ui.separator();
        if ui.button("Remove overlay").clicked() {
            self.store.set_overlay(None);
            self.overlay_texture = None;
            return;
        }

        if edited != original {
            self.store.update_overlay(|o| *o = edited);
        }
    }

    fn asset_ui(&mut self, ui: &mut egui::Ui, asset_id: &str) {
        let Some(original) = self.store.assets.iter().find(|a| a.id == asset_id).cloned() else {
            return;
        };
        ui.heading("Asset Preset");
        ui.separator();
        ui.small(format!("type: {}", original.kind));

        let mut name = original.name.clone();
        ui.label("Name");
        if ui.text_edit_singleline(&mut name).changed() {
            let next = name.clone();
            self.store.update_asset_preset(asset_id, |a| a.name = next);
        }

        ui.separator();
        ui.label("Spawn defaults");
        let mut width = original
            .metadata
            .get("width")
            .and_then(|v| v.as_f64())
            .unwrap_or(self.store.grid.size as f64);
        let mut height = original
            .metadata
            .get("height")
            .and_then(|v| v.as_f64())
            .unwrap_or(self.store.grid.size as f64);
        let mut changed = false;
        ui.horizontal(|ui| {
            ui.label("W");
            changed |= ui.add(egui::DragValue::new(&mut width).speed(1.0)).changed();
            ui.label("H");
            changed |= ui.add(egui::DragValue::new(&mut height).speed(1.0)).changed();
        });
        let mut fill = original
            .metadata
            .get("fill")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        ui.horizontal(|ui| {
            ui.label("Fill");
            changed |= ui.text_edit_singleline(&mut fill).changed();
        });
        if changed {
            self.store.update_asset_preset(asset_id, |a| {
                a.metadata.insert("width".into(), serde_json::json!(width));
                a.metadata.insert("height".into(), serde_json::json!(height));
                if fill.is_empty() {
                    a.metadata.remove("fill");
                } else {
                    a.metadata
                        .insert("fill".into(), serde_json::Value::String(fill.clone()));
                }
            });
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Duplicate").clicked() {
                let name = format!("{} Copy", original.name);
                self.store.add_asset_preset(&original.kind, &name);
            }
            if ui.button("Remove preset").clicked() {
                self.store.remove_asset_preset(asset_id);
            }
        });
    }

    fn layer_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Fab Properties");
        ui.separator();

        let mut grid_size = self.store.grid.size;
        ui.horizontal(|ui| {
            ui.label(format!("Grid cell ({})", self.store.grid.unit.label()));
            let unit = self.store.grid.unit;
            let mut display = unit.to_display(grid_size);
            if ui
                .add(egui::DragValue::new(&mut display).speed(1.0))
                .changed()
            {
                grid_size = unit.from_display(display).max(1.0);
            }
        });
        if grid_size != self.store.grid.size {
            self.store.grid.size = grid_size;
        }

        let mut unit = self.store.grid.unit;
        ui.horizontal(|ui| {
            ui.label("Unit");
            egui::ComboBox::from_id_salt("grid_unit")
                .selected_text(unit.label())
                .show_ui(ui, |ui| {
                    for candidate in [Unit::Mm, Unit::Cm, Unit::M, Unit::Km] {
                        ui.selectable_value(&mut unit, candidate, candidate.label());
                    }
                });
        });
        if unit != self.store.grid.unit {
            self.store.grid.unit = unit;
            self.persist_settings();
        }

        let Some(layer) = self.store.active_layer().cloned() else {
            return;
        };
        ui.separator();
        ui.heading(if layer.kind == LayerKind::Common {
            "Common Layer"
        } else {
            "Floor Properties"
        });

        let mut name = layer.name.clone();
        ui.label("Name");
        if ui.text_edit_singleline(&mut name).changed() {
            let next = name.clone();
            self.store.update_layer(&layer.id, |l| l.name = next);
        }

        if self.layer_id_edit_for != layer.id {
            self.layer_id_edit_for = layer.id.clone();
            self.layer_id_edit = layer.id.clone();
        }
        ui.label("Id");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.layer_id_edit);
            if ui.button("Rename").clicked() && self.layer_id_edit != layer.id {
                let new_id = self.layer_id_edit.clone();
                self.store.rename_layer(&layer.id, &new_id);
                if self.store.layers.iter().any(|l| l.id == new_id) {
                    self.layer_id_edit_for = new_id;
                } else {
                    self.status = Some(format!("Floor id '{new_id}' is invalid or taken"));
                    self.layer_id_edit = layer.id.clone();
                }
            }
        });

        let unit = self.store.grid.unit;
        let mut height = layer.height;
        ui.label(format!("Floor height ({})", unit.label()));
        let mut unused = false;
        if unit_value(ui, "H", unit, &mut height, &mut unused) {
            self.store.update_layer(&layer.id, |l| l.height = height);
        }

        let mut count_x = layer.grid_count_x;
        let mut count_y = layer.grid_count_y;
        ui.horizontal(|ui| {
            ui.label("Grid cells");
            let changed_x = ui
                .add(egui::DragValue::new(&mut count_x).range(1..=1000))
                .changed();
            let changed_y = ui
                .add(egui::DragValue::new(&mut count_y).range(1..=1000))
                .changed();
            if changed_x || changed_y {
                self.store.update_layer(&layer.id, |l| {
                    l.grid_count_x = count_x;
                    l.grid_count_y = count_y;
                });
            }
        });

        let mut locked = layer.locked;
        if ui.checkbox(&mut locked, "Locked").changed() {
            self.store.toggle_layer_lock(&layer.id);
        }

        if layer.kind != LayerKind::Common {
            ui.separator();
            if ui.button("Delete floor").clicked() {
                self.store.remove_layer(&layer.id);
            }
        }
    }
}
