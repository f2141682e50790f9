use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Random base-36 id suffix, nine characters.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    (0..9)
        .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubLayer {
    #[default]
    Bottom,
    Top,
}

/// Display unit for lengths. World coordinates are always stored in the
/// canonical internal unit; these factors govern display round-tripping only.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Cm,
    M,
    Km,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::M => "m",
            Unit::Km => "km",
        }
    }

    pub fn factor(self) -> f32 {
        match self {
            Unit::Mm => 1.0,
            Unit::Cm => 10.0,
            Unit::M => 1_000.0,
            Unit::Km => 1_000_000.0,
        }
    }

    fn decimals(self) -> i32 {
        match self {
            Unit::Mm => 1,
            Unit::Cm => 2,
            Unit::M => 3,
            Unit::Km => 6,
        }
    }

    pub fn to_display(self, world: f32) -> f32 {
        let scaled = world / self.factor();
        let pow = 10f32.powi(self.decimals());
        (scaled * pow).round() / pow
    }

    pub fn from_display(self, display: f32) -> f32 {
        display * self.factor()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    pub size: f32,
    pub unit: Unit,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 500.0,
            unit: Unit::Mm,
        }
    }
}

/// One placed piece of equipment (or a group of them). Positions are world
/// units; objects with a `parent_id` store coordinates relative to the owning
/// group's origin.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneObject {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub layer_id: String,
    pub sub_layer: SubLayer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub rotation: f32,
    pub opacity: f32,
    pub fill: String,
    pub text_color: String,
    pub font_family: String,
    pub font_size: f32,
    pub text: String,
    pub show_label: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: String::new(),
            layer_id: String::new(),
            sub_layer: SubLayer::Bottom,
            parent_id: None,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 0.0,
            height: 0.0,
            depth: 0.0,
            rotation: 0.0,
            opacity: 1.0,
            fill: String::new(),
            text_color: "#ffffff".to_string(),
            font_family: "Arial".to_string(),
            font_size: 14.0,
            text: String::new(),
            show_label: false,
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CanvasLink {
    pub id: String,
    pub from: String,
    pub to: String,
    pub color: String,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Common,
    #[default]
    Floor,
}

/// A floor of the fab. `uid` is the stable internal identity; `id` is the
/// user-editable key that objects reference via `layer_id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FabLayer {
    pub uid: String,
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub order: i32,
    pub height: f32,
    pub grid_count_x: u32,
    pub grid_count_y: u32,
    pub locked: bool,
}

impl Default for FabLayer {
    fn default() -> Self {
        Self {
            uid: String::new(),
            id: String::new(),
            name: String::new(),
            kind: LayerKind::Floor,
            order: 0,
            height: 4000.0,
            grid_count_x: 60,
            grid_count_y: 40,
            locked: false,
        }
    }
}

/// Template stamped onto newly dropped objects of the matching type.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetPreset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// At most one reference drawing per scene. Placement is in world units, the
/// crop rectangle in source pixels. Not part of the object list and not
/// covered by undo history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CadOverlay {
    pub name: String,
    pub opacity: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub natural_width: f32,
    pub natural_height: f32,
    pub crop_x: f32,
    pub crop_y: f32,
    pub crop_width: f32,
    pub crop_height: f32,
}

impl Default for CadOverlay {
    fn default() -> Self {
        Self {
            name: String::new(),
            opacity: 0.6,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            natural_width: 0.0,
            natural_height: 0.0,
            crop_x: 0.0,
            crop_y: 0.0,
            crop_width: 0.0,
            crop_height: 0.0,
        }
    }
}

impl CadOverlay {
    pub fn new(name: String, natural_width: f32, natural_height: f32) -> Self {
        Self {
            name,
            natural_width,
            natural_height,
            crop_width: natural_width,
            crop_height: natural_height,
            ..Self::default()
        }
    }

    /// Clamp a candidate crop to the source image: origin inside the image,
    /// extent at least 1x1 and never past the far edge.
    pub fn set_crop(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let cx = x.clamp(0.0, (self.natural_width - 1.0).max(0.0));
        let cy = y.clamp(0.0, (self.natural_height - 1.0).max(0.0));
        self.crop_x = cx;
        self.crop_y = cy;
        self.crop_width = width.clamp(1.0, (self.natural_width - cx).max(1.0));
        self.crop_height = height.clamp(1.0, (self.natural_height - cy).max(1.0));
    }
}

/// Parse a `#rrggbb` color. Returns `None` for anything else, including the
/// literal `transparent` used by group objects.
pub fn color_from_hex(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim_start_matches('#');
    if hex.len() < 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
