//! The scene aggregate: every canonical collection (objects, links, layers,
//! assets, overlay) plus selection, clipboard and undo history. All mutation
//! funnels through the methods here; invalid references are silent no-ops and
//! out-of-range geometry is clamped, so the aggregate is never observable in
//! a half-updated state.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{info, warn};

use crate::catalog;
use crate::history::{History, Snapshot};
use crate::model::{
    generate_id, AssetPreset, CadOverlay, CanvasLink, FabLayer, GridConfig, LayerKind, SceneObject,
    SubLayer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignKind {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

pub struct SceneStore {
    pub grid: GridConfig,
    pub layers: Vec<FabLayer>,
    pub active_layer_id: String,
    pub view_mode: SubLayer,
    pub objects: Vec<SceneObject>,
    pub links: Vec<CanvasLink>,
    pub selected: Vec<String>,
    pub assets: Vec<AssetPreset>,
    pub active_asset_id: Option<String>,
    pub overlay: Option<CadOverlay>,
    pub overlay_selected: bool,
    clipboard: Vec<SceneObject>,
    history: History,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            layers: vec![
                FabLayer {
                    uid: "sys-default".to_string(),
                    id: "default".to_string(),
                    name: "Default".to_string(),
                    kind: LayerKind::Common,
                    order: -1,
                    ..FabLayer::default()
                },
                FabLayer {
                    uid: "sys-1f".to_string(),
                    id: "1f".to_string(),
                    name: "1F".to_string(),
                    kind: LayerKind::Floor,
                    order: 0,
                    ..FabLayer::default()
                },
            ],
            active_layer_id: "1f".to_string(),
            view_mode: SubLayer::Bottom,
            objects: Vec::new(),
            links: Vec::new(),
            selected: Vec::new(),
            assets: default_assets(),
            active_asset_id: None,
            overlay: None,
            overlay_selected: false,
            clipboard: Vec::new(),
            history: History::default(),
        }
    }
}

fn default_assets() -> Vec<AssetPreset> {
    let presets = [
        ("agv_std", "AGV Standard", "agv"),
        ("amr_std", "AMR Standard", "amr"),
        ("oht_std", "OHT Standard", "oht"),
        ("oht_rail_std", "OHT Rail Standard", "rail"),
        ("lifter_std", "Lifter Standard", "lifter"),
        ("eq_std", "Equipment Standard", "equipment"),
        ("crane_std", "Crane Standard", "crane"),
        ("port_std", "Port Standard", "port"),
        ("buffer_std", "Buffer Standard", "buffer"),
        ("charger_std", "Charger Standard", "charger"),
        ("cv_std", "Conveyor Standard", "conveyor"),
        ("stocker_l", "Stocker Large", "stocker"),
        ("rack_std", "Rack Standard", "rack"),
        ("wall_std", "Wall Standard", "wall"),
        ("pillar_std", "Pillar Standard", "pillar"),
    ];
    let mut assets: Vec<AssetPreset> = presets
        .into_iter()
        .map(|(id, name, kind)| AssetPreset {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            metadata: BTreeMap::new(),
        })
        .collect();
    if let Some(stocker) = assets.iter_mut().find(|a| a.id == "stocker_l") {
        stocker
            .metadata
            .insert("capacity".to_string(), serde_json::json!(100));
        stocker
            .metadata
            .insert("zoneId".to_string(), serde_json::json!("Z-01"));
    }
    assets
}

impl SceneStore {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            objects: self.objects.clone(),
            links: self.links.clone(),
        }
    }

    /// Push the current content slice onto the undo stack. Called before
    /// every mutation that touches objects or links.
    fn record(&mut self) {
        let prior = self.snapshot();
        self.history.record(prior);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) {
        let current = self.snapshot();
        if let Some(prev) = self.history.undo(current) {
            self.objects = prev.objects;
            self.links = prev.links;
            self.prune_selection();
        }
    }

    pub fn redo(&mut self) {
        let current = self.snapshot();
        if let Some(next) = self.history.redo(current) {
            self.objects = next.objects;
            self.links = next.links;
            self.prune_selection();
        }
    }

    fn prune_selection(&mut self) {
        let objects: HashSet<&str> = self.objects.iter().map(|o| o.id.as_str()).collect();
        let links: HashSet<&str> = self.links.iter().map(|l| l.id.as_str()).collect();
        self.selected
            .retain(|id| objects.contains(id.as_str()) || links.contains(id.as_str()));
    }

    fn prune_dangling_links(&mut self) {
        let ids: HashSet<&str> = self.objects.iter().map(|o| o.id.as_str()).collect();
        self.links
            .retain(|l| ids.contains(l.from.as_str()) && ids.contains(l.to.as_str()));
    }

    // ---- Layers -----------------------------------------------------------

    pub fn active_layer(&self) -> Option<&FabLayer> {
        self.layers
            .iter()
            .find(|l| l.id == self.active_layer_id)
            .or_else(|| self.layers.first())
    }

    /// Total floor extent in world units: grid cell size times the active
    /// layer's grid counts.
    pub fn floor_extent(&self) -> (f32, f32) {
        match self.active_layer() {
            Some(layer) => (
                self.grid.size * layer.grid_count_x as f32,
                self.grid.size * layer.grid_count_y as f32,
            ),
            None => (0.0, 0.0),
        }
    }

    /// Add a floor, inheriting extent from the common layer and cloning its
    /// objects into the new floor as id-remapped copies.
    pub fn add_layer(&mut self, name: &str) -> String {
        let common = self.layers.iter().find(|l| l.kind == LayerKind::Common);
        let (height, count_x, count_y, source_id) = match common {
            Some(c) => (c.height, c.grid_count_x, c.grid_count_y, c.id.clone()),
            None => (4000.0, 60, 40, "default".to_string()),
        };
        let new_id = format!("{}_{}", name, generate_id());

        self.record();
        let mut id_map: HashMap<String, String> = HashMap::new();
        let mut clones: Vec<SceneObject> = self
            .objects
            .iter()
            .filter(|o| o.layer_id == source_id)
            .map(|o| {
                let mut clone = o.clone();
                clone.id = format!("{}_{}", clone.kind, generate_id());
                clone.layer_id = new_id.clone();
                id_map.insert(o.id.clone(), clone.id.clone());
                clone
            })
            .collect();
        for clone in &mut clones {
            if let Some(parent) = clone.parent_id.take() {
                clone.parent_id = id_map.get(&parent).cloned();
            }
        }

        self.layers.push(FabLayer {
            uid: generate_id(),
            id: new_id.clone(),
            name: name.to_string(),
            kind: LayerKind::Floor,
            order: self.layers.len() as i32,
            height,
            grid_count_x: count_x,
            grid_count_y: count_y,
            locked: false,
        });
        self.objects.extend(clones);
        info!(layer = %new_id, "added floor");
        new_id
    }

    pub fn update_layer(&mut self, id: &str, patch: impl FnOnce(&mut FabLayer)) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            patch(layer);
        }
    }

    pub fn toggle_layer_lock(&mut self, id: &str) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
            layer.locked = !layer.locked;
        }
    }

    /// Delete a floor and everything it owns. The common layer is
    /// indestructible.
    pub fn remove_layer(&mut self, id: &str) {
        let Some(layer) = self.layers.iter().find(|l| l.id == id) else {
            return;
        };
        if layer.kind == LayerKind::Common {
            return;
        }
        self.record();
        self.layers.retain(|l| l.id != id);
        if self.active_layer_id == id {
            self.active_layer_id = self
                .layers
                .first()
                .map(|l| l.id.clone())
                .unwrap_or_default();
        }
        self.objects.retain(|o| o.layer_id != id);
        self.prune_dangling_links();
        self.prune_selection();
        info!(layer = %id, "removed floor");
    }

    /// Rename a layer id, cascading to every owned object and the active
    /// pointer. Empty or colliding ids leave everything untouched.
    pub fn rename_layer(&mut self, old_id: &str, new_id: &str) {
        if new_id.is_empty() || self.layers.iter().any(|l| l.id == new_id) {
            warn!(old = %old_id, new = %new_id, "layer rename rejected");
            return;
        }
        if !self.layers.iter().any(|l| l.id == old_id) {
            return;
        }
        self.record();
        for layer in &mut self.layers {
            if layer.id == old_id {
                layer.id = new_id.to_string();
            }
        }
        for obj in &mut self.objects {
            if obj.layer_id == old_id {
                obj.layer_id = new_id.to_string();
            }
        }
        if self.active_layer_id == old_id {
            self.active_layer_id = new_id.to_string();
        }
    }

    /// Switching floors clears the selection; the inspector falls back to
    /// floor properties.
    pub fn set_active_layer(&mut self, id: &str) {
        self.active_layer_id = id.to_string();
        self.selected.clear();
    }

    pub fn set_view_mode(&mut self, mode: SubLayer) {
        self.view_mode = mode;
    }

    // ---- Objects ----------------------------------------------------------

    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&CanvasLink> {
        self.links.iter().find(|l| l.id == id)
    }

    /// True when the object lives on the active floor and the current
    /// sub-layer.
    pub fn is_visible(&self, obj: &SceneObject) -> bool {
        obj.layer_id == self.active_layer_id && obj.sub_layer == self.view_mode
    }

    pub fn visible_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| self.is_visible(o))
    }

    pub fn add_object(&mut self, mut obj: SceneObject) {
        if obj.layer_id.is_empty() {
            obj.layer_id = self.active_layer_id.clone();
        }
        self.record();
        self.objects.push(obj);
    }

    /// One-shot history point for a continuous edit (inspector value drags).
    /// Pair with `patch_object`, which applies frames without recording.
    pub fn record_edit(&mut self) {
        self.record();
    }

    /// Field edit without a history entry; the caller owns the undo point.
    pub fn patch_object(&mut self, id: &str, patch: impl FnOnce(&mut SceneObject)) {
        if let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) {
            patch(obj);
        }
    }

    pub fn update_object(&mut self, id: &str, patch: impl FnOnce(&mut SceneObject)) {
        let Some(idx) = self.objects.iter().position(|o| o.id == id) else {
            return;
        };
        self.record();
        patch(&mut self.objects[idx]);
    }

    /// Rename an object id, rewriting link endpoints and the selection.
    /// Collisions are rejected whole, never partially applied.
    pub fn rename_object(&mut self, old_id: &str, new_id: &str) {
        if new_id.is_empty() || self.objects.iter().any(|o| o.id == new_id) {
            warn!(old = %old_id, new = %new_id, "object rename rejected");
            return;
        }
        if !self.objects.iter().any(|o| o.id == old_id) {
            return;
        }
        self.record();
        for obj in &mut self.objects {
            if obj.id == old_id {
                obj.id = new_id.to_string();
            }
            if obj.parent_id.as_deref() == Some(old_id) {
                obj.parent_id = Some(new_id.to_string());
            }
        }
        for link in &mut self.links {
            if link.from == old_id {
                link.from = new_id.to_string();
            }
            if link.to == old_id {
                link.to = new_id.to_string();
            }
        }
        for sel in &mut self.selected {
            if sel == old_id {
                *sel = new_id.to_string();
            }
        }
    }

    /// Remove an object, its direct children, and any link left dangling, in
    /// one step. The ids also drop out of the selection.
    pub fn remove_object(&mut self, id: &str) {
        if !self.objects.iter().any(|o| o.id == id) {
            return;
        }
        self.record();
        self.remove_object_inner(id);
    }

    fn remove_object_inner(&mut self, id: &str) {
        let mut doomed: Vec<String> = vec![id.to_string()];
        doomed.extend(
            self.objects
                .iter()
                .filter(|o| o.parent_id.as_deref() == Some(id))
                .map(|o| o.id.clone()),
        );
        let doomed: HashSet<String> = doomed.into_iter().collect();
        self.objects.retain(|o| !doomed.contains(&o.id));
        self.links
            .retain(|l| !doomed.contains(&l.from) && !doomed.contains(&l.to));
        self.selected.retain(|sid| !doomed.contains(sid));
    }

    /// Delete the whole selection as a single undoable step.
    pub fn delete_selection(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        self.record();
        for id in self.selected.clone() {
            if self.objects.iter().any(|o| o.id == id) {
                self.remove_object_inner(&id);
            } else {
                self.links.retain(|l| l.id != id);
                self.selected.retain(|sid| *sid != id);
            }
        }
    }

    /// Replace the object list wholesale (the load contract). Links are not
    /// part of the persisted format and are cleared. Objects without a layer
    /// reference land on the active floor.
    pub fn set_objects(&mut self, objects: Vec<SceneObject>) {
        self.record();
        self.objects = objects;
        for obj in &mut self.objects {
            if obj.layer_id.is_empty() {
                obj.layer_id = self.active_layer_id.clone();
            }
        }
        self.links.clear();
        self.selected.clear();
        info!(count = self.objects.len(), "loaded layout");
    }

    /// Stamp a new object of the given type at a world position, clamped to
    /// the floor, with catalog defaults and optional preset overrides.
    /// Returns `None` when the active floor is locked.
    pub fn spawn_object_at(
        &mut self,
        kind: &str,
        preset_id: Option<&str>,
        x: f32,
        y: f32,
    ) -> Option<String> {
        if self.active_layer().is_some_and(|l| l.locked) {
            return None;
        }
        let desc = catalog::descriptor(kind);
        let size = self.grid.size;
        let (extent_w, extent_h) = self.floor_extent();
        let preset = preset_id.and_then(|pid| self.assets.iter().find(|a| a.id == pid).cloned());

        let mut obj = SceneObject {
            id: format!("{}_{}", desc.label, generate_id()),
            name: desc.label.to_string(),
            kind: kind.to_string(),
            layer_id: self.active_layer_id.clone(),
            sub_layer: self.view_mode,
            x: x.clamp(0.0, (extent_w - size).max(0.0)),
            y: y.clamp(0.0, (extent_h - size).max(0.0)),
            width: size,
            height: size,
            depth: size,
            opacity: desc.opacity,
            fill: desc.fill.to_string(),
            text: "Text".to_string(),
            ..SceneObject::default()
        };
        if let Some(preset) = preset {
            apply_preset_overrides(&mut obj, &preset.metadata);
        }
        let id = obj.id.clone();
        self.add_object(obj);
        self.select_one(Some(&id));
        Some(id)
    }

    // ---- Selection --------------------------------------------------------

    pub fn select_one(&mut self, id: Option<&str>) {
        self.selected = id.map(|i| vec![i.to_string()]).unwrap_or_default();
        self.active_asset_id = None;
        self.overlay_selected = false;
    }

    pub fn toggle_selected(&mut self, id: &str) {
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.to_string());
        }
        self.active_asset_id = None;
        self.overlay_selected = false;
    }

    pub fn set_selection(&mut self, ids: Vec<String>) {
        self.selected = ids;
        self.active_asset_id = None;
        self.overlay_selected = false;
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// Focusing an asset preset is exclusive with canvas selection.
    pub fn set_active_asset(&mut self, id: Option<&str>) {
        self.active_asset_id = id.map(str::to_string);
        self.selected.clear();
        self.overlay_selected = false;
    }

    pub fn select_overlay(&mut self) {
        if self.overlay.is_some() {
            self.overlay_selected = true;
            self.selected.clear();
            self.active_asset_id = None;
        }
    }

    // ---- Alignment --------------------------------------------------------

    /// Align every selected object to the selection bounding box. The result
    /// depends only on the box, not on iteration order.
    pub fn align_selected(&mut self, kind: AlignKind) {
        if self.selected.len() < 2 {
            return;
        }
        let targets: Vec<(String, f32, f32, f32, f32)> = self
            .objects
            .iter()
            .filter(|o| self.is_selected(&o.id))
            .map(|o| (o.id.clone(), o.x, o.y, o.width, o.height))
            .collect();
        if targets.len() < 2 {
            return;
        }
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for (_, x, y, w, h) in &targets {
            min_x = min_x.min(*x);
            min_y = min_y.min(*y);
            max_x = max_x.max(x + w);
            max_y = max_y.max(y + h);
        }
        let center_x = min_x + (max_x - min_x) / 2.0;
        let center_y = min_y + (max_y - min_y) / 2.0;

        self.record();
        for (id, _, _, w, h) in targets {
            let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
                continue;
            };
            match kind {
                AlignKind::Left => obj.x = min_x,
                AlignKind::Center => obj.x = center_x - w / 2.0,
                AlignKind::Right => obj.x = max_x - w,
                AlignKind::Top => obj.y = min_y,
                AlignKind::Middle => obj.y = center_y - h / 2.0,
                AlignKind::Bottom => obj.y = max_y - h,
            }
        }
    }

    // ---- Grouping ---------------------------------------------------------

    /// Collapse the given objects into a transparent group sized to their
    /// union bounding box; children switch to group-relative coordinates.
    pub fn group_objects(&mut self, ids: &[String]) {
        if ids.len() < 2 {
            return;
        }
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let members: Vec<&SceneObject> = self
            .objects
            .iter()
            .filter(|o| wanted.contains(o.id.as_str()))
            .collect();
        if members.len() < 2 {
            return;
        }
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for obj in &members {
            min_x = min_x.min(obj.x);
            min_y = min_y.min(obj.y);
            max_x = max_x.max(obj.x + obj.width);
            max_y = max_y.max(obj.y + obj.height);
        }

        self.record();
        let group_id = format!("group_{}", generate_id());
        let group = SceneObject {
            id: group_id.clone(),
            name: "Group".to_string(),
            kind: "group".to_string(),
            layer_id: self.active_layer_id.clone(),
            sub_layer: self.view_mode,
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
            fill: "transparent".to_string(),
            ..SceneObject::default()
        };

        let mut kept = Vec::with_capacity(self.objects.len() + 1);
        let mut children = Vec::new();
        for mut obj in self.objects.drain(..) {
            if wanted.contains(obj.id.as_str()) {
                obj.parent_id = Some(group_id.clone());
                obj.x -= min_x;
                obj.y -= min_y;
                children.push(obj);
            } else {
                kept.push(obj);
            }
        }
        kept.push(group);
        kept.extend(children);
        self.objects = kept;
        self.set_selection(vec![group_id]);
    }

    /// Dissolve a group, restoring each child's absolute position.
    pub fn ungroup_objects(&mut self, group_id: &str) {
        let Some(group) = self.objects.iter().find(|o| o.id == group_id).cloned() else {
            return;
        };
        self.record();
        let mut kept = Vec::with_capacity(self.objects.len());
        let mut restored = Vec::new();
        for mut obj in self.objects.drain(..) {
            if obj.id == group_id {
                continue;
            }
            if obj.parent_id.as_deref() == Some(group_id) {
                obj.parent_id = None;
                obj.x += group.x;
                obj.y += group.y;
                restored.push(obj);
            } else {
                kept.push(obj);
            }
        }
        let child_ids: Vec<String> = restored.iter().map(|o| o.id.clone()).collect();
        kept.extend(restored);
        self.objects = kept;
        self.set_selection(child_ids);
    }

    // ---- Clipboard --------------------------------------------------------

    pub fn copy_selected(&mut self) {
        let selected: Vec<SceneObject> = self
            .objects
            .iter()
            .filter(|o| self.is_selected(&o.id))
            .cloned()
            .collect();
        self.clipboard = selected;
    }

    pub fn clipboard_len(&self) -> usize {
        self.clipboard.len()
    }

    /// Paste deep clones offset by a fixed (+20, +20) from the clipboard
    /// snapshot. Repeated pastes keep offsetting from the snapshot, never
    /// from the previous paste.
    pub fn paste_clipboard(&mut self) {
        if self.clipboard.is_empty() {
            return;
        }
        self.record();
        let mut new_ids = Vec::with_capacity(self.clipboard.len());
        let clones: Vec<SceneObject> = self
            .clipboard
            .iter()
            .map(|src| {
                let mut clone = src.clone();
                clone.id = generate_id();
                clone.x += 20.0;
                clone.y += 20.0;
                clone.parent_id = None;
                clone.layer_id = self.active_layer_id.clone();
                new_ids.push(clone.id.clone());
                clone
            })
            .collect();
        self.objects.extend(clones);
        self.set_selection(new_ids);
    }

    // ---- Links ------------------------------------------------------------

    pub fn add_link(&mut self, link: CanvasLink) {
        self.record();
        self.links.push(link);
    }

    pub fn update_link(&mut self, id: &str, patch: impl FnOnce(&mut CanvasLink)) {
        let Some(idx) = self.links.iter().position(|l| l.id == id) else {
            return;
        };
        self.record();
        patch(&mut self.links[idx]);
    }

    pub fn remove_link(&mut self, id: &str) {
        if !self.links.iter().any(|l| l.id == id) {
            return;
        }
        self.record();
        self.links.retain(|l| l.id != id);
        self.selected.retain(|sid| sid != id);
    }

    // ---- CAD overlay ------------------------------------------------------

    pub fn set_overlay(&mut self, overlay: Option<CadOverlay>) {
        self.overlay_selected = overlay.is_some();
        self.overlay = overlay;
        if self.overlay_selected {
            self.selected.clear();
            self.active_asset_id = None;
        }
    }

    pub fn update_overlay(&mut self, patch: impl FnOnce(&mut CadOverlay)) {
        if let Some(overlay) = self.overlay.as_mut() {
            patch(overlay);
        }
    }

    /// Uniformly scale the crop to fit the active floor with a 5% margin and
    /// center it.
    pub fn fit_overlay_to_floor(&mut self) {
        let (floor_w, floor_h) = self.floor_extent();
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        if floor_w <= 0.0 || floor_h <= 0.0 || overlay.crop_width <= 0.0 || overlay.crop_height <= 0.0
        {
            return;
        }
        let fit = (floor_w / overlay.crop_width).min(floor_h / overlay.crop_height) * 0.95;
        overlay.width = overlay.crop_width * fit;
        overlay.height = overlay.crop_height * fit;
        overlay.x = ((floor_w - overlay.width) / 2.0).max(0.0);
        overlay.y = ((floor_h - overlay.height) / 2.0).max(0.0);
    }

    // ---- Asset presets ----------------------------------------------------

    pub fn add_asset_preset(&mut self, kind: &str, name: &str) {
        let suffix: String = generate_id().chars().take(6).collect();
        self.assets.push(AssetPreset {
            id: format!("{kind}_{suffix}"),
            name: name.to_string(),
            kind: kind.to_string(),
            metadata: BTreeMap::new(),
        });
    }

    pub fn update_asset_preset(&mut self, id: &str, patch: impl FnOnce(&mut AssetPreset)) {
        if let Some(asset) = self.assets.iter_mut().find(|a| a.id == id) {
            patch(asset);
        }
    }

    pub fn remove_asset_preset(&mut self, id: &str) {
        self.assets.retain(|a| a.id != id);
        if self.active_asset_id.as_deref() == Some(id) {
            self.active_asset_id = None;
        }
    }
}

/// Copy the whitelisted visual defaults from a preset's metadata onto a
/// freshly spawned object.
fn apply_preset_overrides(
    obj: &mut SceneObject,
    metadata: &BTreeMap<String, serde_json::Value>,
) {
    for (key, value) in metadata {
        match key.as_str() {
            "width" => apply_number(value, &mut obj.width),
            "height" => apply_number(value, &mut obj.height),
            "depth" => apply_number(value, &mut obj.depth),
            "z" => apply_number(value, &mut obj.z),
            "rotation" => apply_number(value, &mut obj.rotation),
            "opacity" => apply_number(value, &mut obj.opacity),
            "fontSize" => apply_number(value, &mut obj.font_size),
            "fill" => {
                if let Some(s) = value.as_str() {
                    obj.fill = s.to_string();
                }
            }
            "textColor" => {
                if let Some(s) = value.as_str() {
                    obj.text_color = s.to_string();
                }
            }
            "name" => {
                if let Some(s) = value.as_str() {
                    obj.name = s.to_string();
                }
            }
            "showLabel" => {
                if let Some(b) = value.as_bool() {
                    obj.show_label = b;
                }
            }
            _ => {}
        }
    }
}

fn apply_number(value: &serde_json::Value, target: &mut f32) {
    if let Some(n) = value.as_f64() {
        *target = n as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> SceneObject {
        SceneObject {
            id: id.to_string(),
            name: id.to_string(),
            kind: "rect".to_string(),
            layer_id: "1f".to_string(),
            x,
            y,
            width: w,
            height: h,
            ..SceneObject::default()
        }
    }

    fn store_with(objects: Vec<SceneObject>) -> SceneStore {
        let mut store = SceneStore::default();
        for obj in objects {
            store.add_object(obj);
        }
        store
    }

    #[test]
    fn add_object_defaults_to_active_layer() {
        let mut store = SceneStore::default();
        store.add_object(SceneObject {
            id: "a".into(),
            ..SceneObject::default()
        });
        assert_eq!(store.object("a").unwrap().layer_id, "1f");
    }

    #[test]
    fn update_unknown_object_is_a_no_op() {
        let mut store = SceneStore::default();
        store.update_object("ghost", |o| o.x = 99.0);
        assert!(!store.can_undo());
    }

    #[test]
    fn remove_object_cascades_children_and_links() {
        let mut store = store_with(vec![
            rect("g", 0.0, 0.0, 100.0, 100.0),
            SceneObject {
                parent_id: Some("g".into()),
                ..rect("child", 10.0, 10.0, 20.0, 20.0)
            },
            rect("other", 500.0, 0.0, 50.0, 50.0),
        ]);
        store.add_link(CanvasLink {
            id: "l1".into(),
            from: "child".into(),
            to: "other".into(),
            color: "black".into(),
        });
        store.add_link(CanvasLink {
            id: "l2".into(),
            from: "other".into(),
            to: "other".into(),
            color: "black".into(),
        });
        store.set_selection(vec!["g".into(), "other".into()]);

        store.remove_object("g");

        assert!(store.object("g").is_none());
        assert!(store.object("child").is_none());
        assert!(store.object("other").is_some());
        assert!(store.link("l1").is_none(), "dangling link must go");
        assert!(store.link("l2").is_some());
        assert_eq!(store.selected, vec!["other".to_string()]);
    }

    #[test]
    fn selection_order_survives_partial_deletion() {
        let mut store = store_with(vec![
            rect("a", 0.0, 0.0, 10.0, 10.0),
            rect("b", 20.0, 0.0, 10.0, 10.0),
            rect("c", 40.0, 0.0, 10.0, 10.0),
        ]);
        store.set_selection(vec!["c".into(), "a".into(), "b".into()]);
        store.remove_object("a");
        assert_eq!(store.selected, vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn add_layer_clones_common_objects_with_fresh_ids() {
        let mut store = SceneStore::default();
        store.add_object(SceneObject {
            layer_id: "default".into(),
            ..rect("wall1", 0.0, 0.0, 500.0, 500.0)
        });
        store.add_object(rect("floor_only", 0.0, 0.0, 500.0, 500.0));

        let new_id = store.add_layer("2F");

        assert_eq!(store.layers.len(), 3);
        let cloned: Vec<&SceneObject> = store
            .objects
            .iter()
            .filter(|o| o.layer_id == new_id)
            .collect();
        assert_eq!(cloned.len(), 1);
        assert_ne!(cloned[0].id, "wall1");
        assert_eq!(cloned[0].kind, "rect");
        // Source objects are untouched.
        assert!(store.object("wall1").is_some());
        let layer = store.layers.iter().find(|l| l.id == new_id).unwrap();
        assert_eq!(layer.grid_count_x, 60);
        assert_eq!(layer.height, 4000.0);
    }

    #[test]
    fn add_layer_remaps_group_parents_inside_the_clone_set() {
        let mut store = SceneStore::default();
        store.add_object(SceneObject {
            layer_id: "default".into(),
            kind: "group".into(),
            ..rect("grp", 0.0, 0.0, 100.0, 100.0)
        });
        store.add_object(SceneObject {
            layer_id: "default".into(),
            parent_id: Some("grp".into()),
            ..rect("kid", 5.0, 5.0, 10.0, 10.0)
        });
        let new_id = store.add_layer("2F");
        let cloned_group = store
            .objects
            .iter()
            .find(|o| o.layer_id == new_id && o.kind == "group")
            .unwrap()
            .id
            .clone();
        let cloned_kid = store
            .objects
            .iter()
            .find(|o| o.layer_id == new_id && o.parent_id.is_some())
            .unwrap();
        assert_eq!(cloned_kid.parent_id.as_deref(), Some(cloned_group.as_str()));
    }

    #[test]
    fn common_layer_cannot_be_removed() {
        let mut store = SceneStore::default();
        store.remove_layer("default");
        assert_eq!(store.layers.len(), 2);
    }

    #[test]
    fn remove_layer_cascades_and_reactivates() {
        let mut store = SceneStore::default();
        store.add_object(rect("a", 0.0, 0.0, 10.0, 10.0));
        store.add_object(rect("b", 0.0, 0.0, 10.0, 10.0));
        store.add_link(CanvasLink {
            id: "l".into(),
            from: "a".into(),
            to: "b".into(),
            color: "black".into(),
        });
        store.remove_layer("1f");
        assert!(store.objects.is_empty());
        assert!(store.links.is_empty());
        assert_eq!(store.active_layer_id, "default");
    }

    #[test]
    fn rename_layer_cascades_to_objects_and_active_pointer() {
        let mut store = SceneStore::default();
        store.add_object(rect("a", 0.0, 0.0, 10.0, 10.0));
        store.rename_layer("1f", "ground");
        assert_eq!(store.object("a").unwrap().layer_id, "ground");
        assert_eq!(store.active_layer_id, "ground");
        assert!(store.layers.iter().any(|l| l.id == "ground"));
    }

    #[test]
    fn rename_layer_collision_changes_nothing() {
        let mut store = SceneStore::default();
        store.add_object(rect("a", 0.0, 0.0, 10.0, 10.0));
        store.rename_layer("1f", "default");
        assert_eq!(store.object("a").unwrap().layer_id, "1f");
        assert_eq!(store.active_layer_id, "1f");
        store.rename_layer("1f", "");
        assert_eq!(store.active_layer_id, "1f");
    }

    #[test]
    fn rename_object_rewrites_links_and_selection() {
        let mut store = store_with(vec![
            rect("a", 0.0, 0.0, 10.0, 10.0),
            rect("b", 20.0, 0.0, 10.0, 10.0),
        ]);
        store.add_link(CanvasLink {
            id: "l".into(),
            from: "a".into(),
            to: "b".into(),
            color: "black".into(),
        });
        store.set_selection(vec!["a".into()]);
        store.rename_object("a", "station-1");
        assert!(store.object("station-1").is_some());
        assert_eq!(store.link("l").unwrap().from, "station-1");
        assert_eq!(store.selected, vec!["station-1".to_string()]);
        // Collision is rejected whole.
        store.rename_object("station-1", "b");
        assert!(store.object("station-1").is_some());
    }

    #[test]
    fn group_then_ungroup_restores_absolute_positions() {
        let mut store = store_with(vec![
            rect("a", 100.0, 200.0, 50.0, 60.0),
            rect("b", 400.0, 120.0, 80.0, 40.0),
        ]);
        store.group_objects(&["a".to_string(), "b".to_string()]);

        assert_eq!(store.selected.len(), 1);
        let group_id = store.selected[0].clone();
        let group = store.object(&group_id).unwrap().clone();
        assert_eq!(group.kind, "group");
        assert_eq!((group.x, group.y), (100.0, 120.0));
        assert_eq!((group.width, group.height), (380.0, 160.0));
        let a = store.object("a").unwrap();
        assert_eq!((a.x, a.y), (0.0, 80.0));
        assert_eq!(a.parent_id.as_deref(), Some(group_id.as_str()));

        store.ungroup_objects(&group_id);
        assert!(store.object(&group_id).is_none());
        let a = store.object("a").unwrap();
        let b = store.object("b").unwrap();
        assert_eq!((a.x, a.y), (100.0, 200.0));
        assert_eq!((b.x, b.y), (400.0, 120.0));
        assert!(a.parent_id.is_none());
        assert_eq!(store.selected, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn grouping_needs_at_least_two_objects() {
        let mut store = store_with(vec![rect("a", 0.0, 0.0, 10.0, 10.0)]);
        store.group_objects(&["a".to_string()]);
        assert_eq!(store.objects.len(), 1);
        store.group_objects(&["a".to_string(), "ghost".to_string()]);
        assert_eq!(store.objects.len(), 1);
    }

    #[test]
    fn align_left_and_right_match_the_bounding_box() {
        let mut store = store_with(vec![
            rect("a", 10.0, 0.0, 5.0, 5.0),
            rect("b", 50.0, 10.0, 5.0, 5.0),
            rect("c", 30.0, 20.0, 5.0, 5.0),
        ]);
        store.set_selection(vec!["a".into(), "b".into(), "c".into()]);
        store.align_selected(AlignKind::Left);
        for id in ["a", "b", "c"] {
            assert_eq!(store.object(id).unwrap().x, 10.0);
        }
        store.undo();
        store.align_selected(AlignKind::Right);
        for id in ["a", "b", "c"] {
            let obj = store.object(id).unwrap();
            assert_eq!(obj.x + obj.width, 55.0);
        }
        // y untouched by horizontal alignment
        assert_eq!(store.object("c").unwrap().y, 20.0);
    }

    #[test]
    fn align_middle_centers_on_the_vertical_centerline() {
        let mut store = store_with(vec![
            rect("a", 0.0, 0.0, 10.0, 10.0),
            rect("b", 20.0, 30.0, 10.0, 20.0),
        ]);
        store.set_selection(vec!["a".into(), "b".into()]);
        store.align_selected(AlignKind::Middle);
        // box is y 0..50, centerline 25
        assert_eq!(store.object("a").unwrap().y, 20.0);
        assert_eq!(store.object("b").unwrap().y, 15.0);
    }

    #[test]
    fn align_requires_two_selected() {
        let mut store = store_with(vec![rect("a", 10.0, 0.0, 5.0, 5.0)]);
        store.set_selection(vec!["a".into()]);
        store.align_selected(AlignKind::Left);
        assert_eq!(store.object("a").unwrap().x, 10.0);
    }

    #[test]
    fn paste_offsets_from_the_clipboard_snapshot_not_the_last_paste() {
        let mut store = store_with(vec![rect("a", 100.0, 100.0, 10.0, 10.0)]);
        store.set_selection(vec!["a".into()]);
        store.copy_selected();

        store.paste_clipboard();
        let first = store.selected.clone();
        store.paste_clipboard();
        let second = store.selected.clone();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0], second[0]);
        for id in first.iter().chain(second.iter()) {
            let obj = store.object(id).unwrap();
            assert_eq!((obj.x, obj.y), (120.0, 120.0));
            assert!(obj.parent_id.is_none());
            assert_eq!(obj.layer_id, "1f");
        }
        assert_eq!(store.objects.len(), 3);
    }

    #[test]
    fn paste_lands_on_the_active_layer() {
        let mut store = store_with(vec![rect("a", 0.0, 0.0, 10.0, 10.0)]);
        store.set_selection(vec!["a".into()]);
        store.copy_selected();
        let new_layer = store.add_layer("2F");
        store.set_active_layer(&new_layer);
        store.paste_clipboard();
        let pasted = store.selected[0].clone();
        assert_eq!(store.object(&pasted).unwrap().layer_id, new_layer);
    }

    #[test]
    fn undo_restores_the_exact_prior_content() {
        let mut store = store_with(vec![rect("a", 1.0, 2.0, 10.0, 10.0)]);
        let before = store.objects.clone();
        store.update_object("a", |o| {
            o.x = 500.0;
            o.name = "moved".into();
        });
        store.undo();
        assert_eq!(store.objects, before);
        store.redo();
        assert_eq!(store.object("a").unwrap().x, 500.0);
    }

    #[test]
    fn hundred_and_one_mutations_keep_only_the_last_hundred() {
        let mut store = store_with(vec![rect("a", 0.0, 0.0, 10.0, 10.0)]);
        for i in 1..=101 {
            store.update_object("a", |o| o.x = i as f32);
        }
        for _ in 0..200 {
            store.undo();
        }
        // The first mutation's prior state (x=0) was evicted; the deepest
        // reachable state is after mutation #1.
        assert_eq!(store.object("a").unwrap().x, 1.0);
    }

    #[test]
    fn undo_does_not_restore_layers_or_selection() {
        let mut store = SceneStore::default();
        let new_layer = store.add_layer("2F");
        store.undo();
        assert!(
            store.layers.iter().any(|l| l.id == new_layer),
            "layer list is outside the tracked slice"
        );
        assert!(store.objects.is_empty());
    }

    #[test]
    fn undo_prunes_selection_to_existing_ids() {
        let mut store = store_with(vec![rect("a", 0.0, 0.0, 10.0, 10.0)]);
        store.add_object(rect("b", 0.0, 0.0, 10.0, 10.0));
        store.set_selection(vec!["b".into(), "a".into()]);
        store.undo();
        assert_eq!(store.selected, vec!["a".to_string()]);
    }

    #[test]
    fn selection_and_asset_focus_are_mutually_exclusive() {
        let mut store = store_with(vec![rect("a", 0.0, 0.0, 10.0, 10.0)]);
        store.set_active_asset(Some("agv_std"));
        assert!(store.selected.is_empty());
        store.select_one(Some("a"));
        assert!(store.active_asset_id.is_none());
        store.toggle_selected("a");
        assert!(store.selected.is_empty());
        store.toggle_selected("a");
        assert_eq!(store.selected, vec!["a".to_string()]);
    }

    #[test]
    fn set_objects_replaces_content_and_clears_links() {
        let mut store = store_with(vec![rect("a", 0.0, 0.0, 10.0, 10.0)]);
        store.add_object(rect("b", 0.0, 0.0, 10.0, 10.0));
        store.add_link(CanvasLink {
            id: "l".into(),
            from: "a".into(),
            to: "b".into(),
            color: "black".into(),
        });
        store.set_objects(vec![SceneObject {
            id: "loaded".into(),
            ..SceneObject::default()
        }]);
        assert_eq!(store.objects.len(), 1);
        assert!(store.links.is_empty());
        assert_eq!(store.object("loaded").unwrap().layer_id, "1f");
    }

    #[test]
    fn spawn_clamps_to_floor_and_applies_presets() {
        let mut store = SceneStore::default();
        store.update_asset_preset("stocker_l", |a| {
            a.metadata
                .insert("fill".into(), serde_json::Value::String("#123456".into()));
            a.metadata.insert("width".into(), serde_json::json!(1500.0));
        });
        // extent is 30000 x 20000 with the default grid
        let id = store
            .spawn_object_at("stocker", Some("stocker_l"), 99_999.0, -50.0)
            .unwrap();
        let obj = store.object(&id).unwrap();
        assert_eq!(obj.x, 30_000.0 - 500.0);
        assert_eq!(obj.y, 0.0);
        assert_eq!(obj.fill, "#123456");
        assert_eq!(obj.width, 1500.0);
        assert_eq!(obj.height, 500.0);
        assert_eq!(store.selected, vec![id]);
    }

    #[test]
    fn spawn_is_refused_on_a_locked_floor() {
        let mut store = SceneStore::default();
        store.toggle_layer_lock("1f");
        assert!(store.spawn_object_at("agv", None, 0.0, 0.0).is_none());
        assert!(store.objects.is_empty());
    }

    #[test]
    fn overlay_fit_scales_and_centers_with_margin() {
        let mut store = SceneStore::default();
        store.set_overlay(Some(CadOverlay::new("plan".into(), 3000.0, 1000.0)));
        store.fit_overlay_to_floor();
        let overlay = store.overlay.as_ref().unwrap();
        // floor 30000x20000; fit = min(10, 20) * 0.95 = 9.5
        assert_eq!(overlay.width, 28_500.0);
        assert_eq!(overlay.height, 9_500.0);
        assert_eq!(overlay.x, 750.0);
        assert_eq!(overlay.y, 5_250.0);
        assert!(!store.can_undo(), "overlay is outside undo history");
    }

    #[test]
    fn overlay_focus_is_exclusive_with_selection() {
        let mut store = store_with(vec![rect("a", 0.0, 0.0, 10.0, 10.0)]);
        store.set_overlay(Some(CadOverlay::new("plan".into(), 100.0, 100.0)));
        assert!(store.overlay_selected);
        store.select_one(Some("a"));
        assert!(!store.overlay_selected);
        store.select_overlay();
        assert!(store.selected.is_empty());
    }

    #[test]
    fn visible_objects_follow_layer_and_view_mode() {
        let mut store = SceneStore::default();
        store.add_object(rect("bottom", 0.0, 0.0, 10.0, 10.0));
        store.add_object(SceneObject {
            sub_layer: SubLayer::Top,
            ..rect("top", 0.0, 0.0, 10.0, 10.0)
        });
        store.add_object(SceneObject {
            layer_id: "default".into(),
            ..rect("elsewhere", 0.0, 0.0, 10.0, 10.0)
        });
        let visible: Vec<&str> = store.visible_objects().map(|o| o.id.as_str()).collect();
        assert_eq!(visible, vec!["bottom"]);
        store.set_view_mode(SubLayer::Top);
        let visible: Vec<&str> = store.visible_objects().map(|o| o.id.as_str()).collect();
        assert_eq!(visible, vec!["top"]);
    }

    #[test]
    fn delete_selection_is_one_undo_step() {
        let mut store = store_with(vec![
            rect("a", 0.0, 0.0, 10.0, 10.0),
            rect("b", 0.0, 0.0, 10.0, 10.0),
        ]);
        store.set_selection(vec!["a".into(), "b".into()]);
        store.delete_selection();
        assert!(store.objects.is_empty());
        store.undo();
        assert_eq!(store.objects.len(), 2);
    }

    #[test]
    fn link_crud() {
        let mut store = store_with(vec![
            rect("a", 0.0, 0.0, 10.0, 10.0),
            rect("b", 0.0, 0.0, 10.0, 10.0),
        ]);
        store.add_link(CanvasLink {
            id: "l".into(),
            from: "a".into(),
            to: "b".into(),
            color: "black".into(),
        });
        store.update_link("l", |l| l.color = "#ff0000".into());
        assert_eq!(store.link("l").unwrap().color, "#ff0000");
        store.update_link("ghost", |l| l.color = "#00ff00".into());
        store.remove_link("l");
        assert!(store.links.is_empty());
        store.undo();
        assert_eq!(store.link("l").unwrap().color, "#ff0000");
    }
}
