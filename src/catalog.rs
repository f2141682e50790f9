//! Registry mapping an object's open-ended `type` tag to its rendering and
//! spawn defaults. New equipment types only need a row here.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeHint {
    Rect,
    Circle,
    Text,
}

#[derive(Clone, Copy, Debug)]
pub struct TypeDescriptor {
    pub label: &'static str,
    pub shape: ShapeHint,
    pub fill: &'static str,
    pub opacity: f32,
}

const DEFAULT_FILL: &str = "#3b82f6";

static TABLE: &[(&str, TypeDescriptor)] = &[
    ("rect", desc("Rect", ShapeHint::Rect, DEFAULT_FILL, 0.5)),
    ("circle", desc("Circle", ShapeHint::Circle, DEFAULT_FILL, 0.5)),
    ("text", desc("Text", ShapeHint::Text, "#1f2937", 1.0)),
    ("agv", desc("Agv", ShapeHint::Rect, "#f59e0b", 1.0)),
    ("amr", desc("Amr", ShapeHint::Rect, "#10b981", 1.0)),
    ("oht", desc("Oht", ShapeHint::Rect, "#ec4899", 1.0)),
    ("rail", desc("Rail", ShapeHint::Rect, "#475569", 1.0)),
    ("conveyor", desc("Conveyor", ShapeHint::Rect, "#475569", 1.0)),
    ("stocker", desc("Stocker", ShapeHint::Rect, DEFAULT_FILL, 1.0)),
    ("rack", desc("Rack", ShapeHint::Rect, DEFAULT_FILL, 1.0)),
    ("buffer", desc("Buffer", ShapeHint::Rect, DEFAULT_FILL, 1.0)),
    ("crane", desc("Crane", ShapeHint::Circle, "#ef4444", 1.0)),
    ("port", desc("Port", ShapeHint::Circle, "#ef4444", 1.0)),
    ("equipment", desc("Equipment", ShapeHint::Rect, "#8b5cf6", 1.0)),
    ("lifter", desc("Lifter", ShapeHint::Rect, "#06b6d4", 1.0)),
    ("charger", desc("Charger", ShapeHint::Rect, "#84cc16", 1.0)),
    ("wall", desc("Wall", ShapeHint::Rect, "#64748b", 1.0)),
    ("pillar", desc("Pillar", ShapeHint::Rect, "#334155", 1.0)),
    ("group", desc("Group", ShapeHint::Rect, "transparent", 1.0)),
];

const fn desc(label: &'static str, shape: ShapeHint, fill: &'static str, opacity: f32) -> TypeDescriptor {
    TypeDescriptor {
        label,
        shape,
        fill,
        opacity,
    }
}

/// Look up a type tag. Unknown tags fall back to a plain rect so the scene
/// never refuses to render an object.
pub fn descriptor(kind: &str) -> TypeDescriptor {
    TABLE
        .iter()
        .find(|(tag, _)| *tag == kind)
        .map(|(_, d)| *d)
        .unwrap_or(desc("Object", ShapeHint::Rect, DEFAULT_FILL, 1.0))
}

/// Shape tags offered in the sidebar next to the asset presets.
pub const BASIC_KINDS: [&str; 3] = ["rect", "circle", "text"];
