use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    application::{editor::PointerButton, session::PointerPhase},
    domain::{
        document::{PartCategory, ShapeKind, ValueType},
        geometry::Point,
        mode::AppMode,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeRequest {
    pub mode: AppMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidebarResponse {
    pub sidebar_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub category: PartCategory,
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerRequest {
    pub phase: PointerPhase,
    #[serde(default = "primary_button")]
    pub button: PointerButton,
    pub x: f64,
    pub y: f64,
}

fn primary_button() -> PointerButton {
    PointerButton::Primary
}

impl PointerRequest {
    pub fn at(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelRequest {
    pub x: f64,
    pub y: f64,
    pub delta_y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub top_left: Point,
    pub bottom_right: Point,
}

/// Cambio de atributos de una parte de la categoría activa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartPatchRequest {
    pub name: String,
    #[serde(default, rename = "type")]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub shape: Option<ShapeKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveJsonRequest {
    pub filename: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEditResponse {
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}
