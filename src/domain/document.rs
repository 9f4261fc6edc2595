use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::errors::{DomainError, DomainResult};
use super::geometry::{CircleShape, Point, RectShape, Shape};

/// Los dos documentos que maneja el panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Config,
    Vehicle,
}

impl DocumentKind {
    pub fn filename(&self) -> &'static str {
        match self {
            DocumentKind::Config => "config.json",
            DocumentKind::Vehicle => "vehicle.json",
        }
    }

    /// Comprueba que `value` es un objeto y que cada campo numérico presente
    /// es un número. Claves ausentes o desconocidas no son un error.
    pub fn validate(&self, value: &Value) -> DomainResult<()> {
        match self {
            DocumentKind::Config => ConfigDocument::deserialize(value).map(|_| ()),
            DocumentKind::Vehicle => VehicleDocument::deserialize(value).map(|_| ()),
        }
        .map_err(|e| DomainError::InvalidInput(format!("{}: {e}", self.filename())))
    }
}

impl FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "config" => Ok(DocumentKind::Config),
            "vehicle" => Ok(DocumentKind::Vehicle),
            other => Err(DomainError::NotFound(format!("documento desconocido: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// config.json
// ---------------------------------------------------------------------------

// Los documentos se aceptan con claves ausentes o de tipo inesperado; lo único
// que se rechaza es un valor no numérico donde se espera un número. Los campos
// numéricos son `Option<f64>` estrictos, el resto pasa por `lenient`.

/// Campo no numérico: si falta o no tiene el tipo esperado queda en su valor por defecto.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Objeto anidado: se valida si es un objeto, se ignora si es otra cosa.
fn nested<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        v @ Value::Object(_) => serde_json::from_value(v).map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

/// Lista de partes. Un elemento que no es objeto ocupa su posición con una
/// parte vacía para que los índices sigan alineados con el JSON.
fn part_list<'de, D>(deserializer: D) -> Result<Vec<Part>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    items
        .into_iter()
        .map(|item| match item {
            v @ Value::Object(_) => serde_json::from_value(v).map_err(de::Error::custom),
            _ => Ok(Part::default()),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct PointSlot {
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
}

/// Punto de geometría: coordenadas numéricas; `None` si falta alguna.
fn point_slot<'de, D>(deserializer: D) -> Result<Option<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    let slot: Option<PointSlot> = nested(deserializer)?;
    Ok(slot.and_then(|p| Some(Point::new(p.x?, p.y?))))
}

/// Puerto u otro valor que en config.json aparece como texto o como número.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MqttSettings {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub port: Option<NumberOrText>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestApiSettings {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "_host", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub alt_host: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub port: Option<NumberOrText>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub focus_length: Option<NumberOrText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<f64>,
    #[serde(rename = "AnalogueGain", default, skip_serializing_if = "Option::is_none")]
    pub analogue_gain: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, deserialize_with = "nested", skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<MqttSettings>,
    #[serde(rename = "RestAPI", default, deserialize_with = "nested", skip_serializing_if = "Option::is_none")]
    pub rest_api: Option<RestApiSettings>,
    #[serde(default, deserialize_with = "nested", skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraSettings>,
    /// Número de frames por captura.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// vehicle.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartCategory {
    Icon,
    Meter,
    Ocr,
}

impl PartCategory {
    pub const ALL: [PartCategory; 3] = [PartCategory::Icon, PartCategory::Meter, PartCategory::Ocr];

    pub fn key(&self) -> &'static str {
        match self {
            PartCategory::Icon => "icon",
            PartCategory::Meter => "meter",
            PartCategory::Ocr => "ocr",
        }
    }
}

impl fmt::Display for PartCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PartCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartCategory::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| DomainError::InvalidInput(format!("categoría desconocida: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Float,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Box,
    Circle,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub position: Point,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeKind>,
    #[serde(default, deserialize_with = "point_slot", skip_serializing_if = "Option::is_none")]
    pub top_left: Option<Point>,
    #[serde(default, deserialize_with = "point_slot", skip_serializing_if = "Option::is_none")]
    pub bottom_right: Option<Point>,
    #[serde(default, deserialize_with = "point_slot", skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub circumference: Option<Vec<CalibrationPoint>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    /// Figura según el tipo declarado. Sin tipo, la deducen los campos
    /// presentes. `None` si faltan los campos de geometría.
    pub fn shape(&self) -> Option<Shape> {
        let rect = || Some(Shape::Rect(RectShape::new(self.top_left?, self.bottom_right?)));
        let circle = || Some(Shape::Circle(CircleShape { center: self.center?, radius: self.radius? }));
        match self.shape {
            Some(ShapeKind::Box | ShapeKind::Bar) => rect(),
            Some(ShapeKind::Circle) => circle(),
            None => rect().or_else(circle),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleDocument {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gray: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, deserialize_with = "part_list")]
    pub icon: Vec<Part>,
    #[serde(default, deserialize_with = "part_list")]
    pub meter: Vec<Part>,
    #[serde(default, deserialize_with = "part_list")]
    pub ocr: Vec<Part>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VehicleDocument {
    pub fn parts(&self, category: PartCategory) -> &[Part] {
        match category {
            PartCategory::Icon => &self.icon,
            PartCategory::Meter => &self.meter,
            PartCategory::Ocr => &self.ocr,
        }
    }
}

// ---------------------------------------------------------------------------
// Operaciones sobre el JSON crudo
// ---------------------------------------------------------------------------

/// Mezcla `patch` en `target`: las claves de primer nivel se reemplazan,
/// salvo que ambos lados sean objetos, en cuyo caso se mezclan un nivel más.
pub fn merge_one_level(target: &mut Value, patch: Value) -> DomainResult<()> {
    let Value::Object(patch) = patch else {
        return Err(DomainError::InvalidInput("el parche debe ser un objeto JSON".into()));
    };
    let Value::Object(target) = target else {
        return Err(DomainError::InvalidInput("el documento no es un objeto JSON".into()));
    };

    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                for (k, v) in nested {
                    existing.insert(k, v);
                }
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
    Ok(())
}

/// Número JSON como lo escribiría `JSON.stringify`: entero si no tiene parte decimal.
pub fn json_number(v: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn point_value(p: Point) -> Value {
    let mut m = Map::new();
    m.insert("x".into(), json_number(p.x));
    m.insert("y".into(), json_number(p.y));
    Value::Object(m)
}

/// Parte `index` de `category` dentro del JSON de vehicle, para escritura.
pub fn part_entry_mut(
    vehicle: &mut Value,
    category: PartCategory,
    index: usize,
) -> DomainResult<&mut Map<String, Value>> {
    vehicle
        .get_mut(category.key())
        .and_then(Value::as_array_mut)
        .and_then(|parts| parts.get_mut(index))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| DomainError::NotFound(format!("{category}[{index}]")))
}

/// Escribe la geometría de `shape` en la entrada de la parte. Sólo se tocan
/// los campos que la figura define; el resto queda igual.
pub fn write_shape(part: &mut Map<String, Value>, shape: &Shape) {
    match shape {
        Shape::Rect(r) => {
            part.insert("top_left".into(), point_value(r.top_left));
            part.insert("bottom_right".into(), point_value(r.bottom_right));
        }
        Shape::Circle(c) => {
            part.insert("center".into(), point_value(c.center));
        }
    }
}
