use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{
    document::{PartCategory, VehicleDocument},
    errors::{DomainError, DomainResult},
    geometry::{Geometry, Point, RectShape, Shape, Viewport},
    stream::{FrameSize, StreamFrame},
};

const ACTIVE_STROKE: &str = "#00ff00";
const LABEL_LIFT: f64 = 20.0;
const CIRCLE_LABEL_SHIFT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub category: Option<PartCategory>,
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeStyle {
    pub stroke: &'static str,
    pub stroke_width: u8,
    pub dash: Option<[u8; 2]>,
}

impl ShapeStyle {
    fn for_part(category: PartCategory, active: bool) -> Self {
        if active {
            return Self { stroke: ACTIVE_STROKE, stroke_width: 3, dash: None };
        }
        let stroke = match category {
            PartCategory::Icon => "#ff0000",
            PartCategory::Meter => "#0000ff",
            PartCategory::Ocr => "#ffff00",
        };
        Self { stroke, stroke_width: 2, dash: Some([5, 5]) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneShape {
    pub index: usize,
    pub name: String,
    pub active: bool,
    #[serde(flatten)]
    pub shape: Shape,
    pub style: ShapeStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Todo lo que el lienzo necesita para dibujar un fotograma del editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub viewport: Viewport,
    pub background: Option<FrameSize>,
    pub category: Option<PartCategory>,
    pub shapes: Vec<SceneShape>,
    pub label: Option<SceneLabel>,
}

/// Geometría confirmada al soltar un arrastre o redimensionar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeCommit {
    pub category: PartCategory,
    pub index: usize,
    pub shape: Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Drag {
    #[default]
    Idle,
    Panning {
        origin: Point,
    },
    Shape {
        category: PartCategory,
        index: usize,
        grab: Point,
        original: Shape,
        current: Shape,
    },
}

/// Estado del lienzo de edición: vista, selección y arrastre en curso.
/// No guarda geometría propia; las figuras salen siempre del documento.
#[derive(Debug, Default)]
pub struct ShapeEditor {
    viewport: Viewport,
    selection: Selection,
    drag: Drag,
    reference: Option<FrameSize>,
}

impl ShapeEditor {
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn reference_size(&self) -> Option<FrameSize> {
        self.reference
    }

    /// Carga el frame congelado como fondo. Si no se puede decodificar el
    /// editor queda sin imagen y no habrá figuras que tocar.
    pub fn load_reference(&mut self, frame: Option<&StreamFrame>) {
        self.viewport = Viewport::default();
        self.drag = Drag::Idle;
        self.reference = match frame.map(StreamFrame::dimensions) {
            Some(Ok(size)) => {
                debug!("Imagen de referencia cargada: {}x{}", size.width, size.height);
                Some(size)
            }
            Some(Err(e)) => {
                warn!("No se pudo cargar la imagen de referencia: {e}");
                None
            }
            None => None,
        };
    }

    pub fn select(
        &mut self,
        category: PartCategory,
        index: Option<usize>,
        doc: Option<&VehicleDocument>,
    ) -> DomainResult<Selection> {
        if let Some(i) = index {
            let len = doc.map(|d| d.parts(category).len()).unwrap_or(0);
            if i >= len {
                return Err(DomainError::NotFound(format!("{category}[{i}]")));
            }
        }
        self.selection = Selection { category: Some(category), index };
        Ok(self.selection)
    }

    /// Selección desde la barra lateral: la categoría con su primera parte.
    pub fn select_category(&mut self, category: PartCategory, doc: Option<&VehicleDocument>) -> Selection {
        let has_parts = doc.is_some_and(|d| !d.parts(category).is_empty());
        self.selection = Selection { category: Some(category), index: has_parts.then_some(0) };
        self.selection
    }

    /// Tras recargar vehicle.json se vuelve a la primera parte de `icon`.
    pub fn select_default(&mut self, doc: Option<&VehicleDocument>) {
        self.drag = Drag::Idle;
        if doc.is_some_and(|d| !d.icon.is_empty()) {
            self.selection = Selection { category: Some(PartCategory::Icon), index: Some(0) };
        } else {
            self.selection = Selection::default();
        }
    }

    /// Tras reemplazar el documento: se cancela cualquier arrastre y se
    /// descarta un índice que ya no exista.
    pub fn document_replaced(&mut self, doc: Option<&VehicleDocument>) {
        self.drag = Drag::Idle;
        if let (Some(category), Some(index)) = (self.selection.category, self.selection.index) {
            let len = doc.map(|d| d.parts(category).len()).unwrap_or(0);
            if index >= len {
                self.selection.index = None;
            }
        }
    }

    fn shapes_of<'a>(
        &self,
        doc: Option<&'a VehicleDocument>,
    ) -> impl Iterator<Item = (usize, &'a str, Shape)> + 'a {
        let parts = match (self.reference, self.selection.category, doc) {
            (Some(_), Some(category), Some(doc)) => doc.parts(category),
            _ => &[],
        };
        parts
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.shape().map(|s| (i, p.name.as_str(), s)))
    }

    pub fn pointer_down(&mut self, button: PointerButton, screen: Point, doc: Option<&VehicleDocument>) {
        if button != PointerButton::Primary {
            self.drag = Drag::Panning {
                origin: Point::new(screen.x - self.viewport.offset.x, screen.y - self.viewport.offset.y),
            };
            return;
        }
        let Some(category) = self.selection.category else { return };
        let world = self.viewport.to_world(screen);
        // La última figura dibujada queda encima.
        let hit = self
            .shapes_of(doc)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .find(|(_, _, shape)| shape.hit_test(world));
        if let Some((index, name, shape)) = hit {
            debug!("Figura seleccionada: {category}[{index}] {name}");
            self.selection.index = Some(index);
            self.drag = Drag::Shape { category, index, grab: world, original: shape, current: shape };
        }
    }

    pub fn pointer_move(&mut self, screen: Point) {
        match &mut self.drag {
            Drag::Idle => {}
            Drag::Panning { origin } => {
                self.viewport.offset = Point::new(screen.x - origin.x, screen.y - origin.y);
            }
            Drag::Shape { grab, original, current, .. } => {
                let (dx, dy) = grab.delta_to(self.viewport.to_world(screen));
                *current = original.translate(dx, dy);
            }
        }
    }

    /// Fin de gesto. Devuelve la geometría a escribir en el documento cuando
    /// un arrastre de figura movió algo.
    pub fn pointer_up(&mut self, screen: Point) -> Option<ShapeCommit> {
        self.pointer_move(screen);
        match std::mem::take(&mut self.drag) {
            Drag::Shape { category, index, original, current, .. } => {
                let shape = Shape::constrained(original, current);
                (shape != original).then_some(ShapeCommit { category, index, shape })
            }
            _ => None,
        }
    }

    pub fn wheel(&mut self, screen: Point, delta_y: f64) {
        self.viewport.zoom_at(screen, delta_y);
    }

    /// Nuevas esquinas para el rectángulo activo; por debajo del tamaño
    /// mínimo se mantiene la caja anterior.
    pub fn resize_active(
        &mut self,
        top_left: Point,
        bottom_right: Point,
        doc: Option<&VehicleDocument>,
    ) -> DomainResult<ShapeCommit> {
        let (Some(category), Some(index)) = (self.selection.category, self.selection.index) else {
            return Err(DomainError::InvalidInput("no hay figura activa".into()));
        };
        let prior = doc
            .and_then(|d| d.parts(category).get(index))
            .and_then(|p| p.shape())
            .ok_or_else(|| DomainError::NotFound(format!("{category}[{index}]")))?;
        if !matches!(prior, Shape::Rect(_)) {
            return Err(DomainError::InvalidInput("sólo los rectángulos se redimensionan".into()));
        }
        let shape = Shape::constrained(prior, Shape::Rect(RectShape::new(top_left, bottom_right)));
        Ok(ShapeCommit { category, index, shape })
    }

    pub fn scene(&self, doc: Option<&VehicleDocument>) -> Scene {
        let category = self.selection.category;
        let mut label = None;
        let shapes = self
            .shapes_of(doc)
            .map(|(index, name, shape)| {
                let shape = match self.drag {
                    Drag::Shape { index: i, current, .. } if i == index => current,
                    _ => shape,
                };
                let active = self.selection.index == Some(index);
                if active {
                    label = Some(label_for(&shape, name));
                }
                SceneShape {
                    index,
                    name: name.to_string(),
                    active,
                    shape,
                    style: ShapeStyle::for_part(category.unwrap_or(PartCategory::Icon), active),
                }
            })
            .collect();

        Scene { viewport: self.viewport, background: self.reference, category, shapes, label }
    }
}

fn label_for(shape: &Shape, name: &str) -> SceneLabel {
    let (x, y) = match shape {
        Shape::Rect(r) => (r.top_left.x, r.top_left.y - LABEL_LIFT),
        Shape::Circle(c) => (c.center.x - CIRCLE_LABEL_SHIFT, c.center.y - c.radius - LABEL_LIFT),
    };
    SceneLabel { x, y, text: name.to_string() }
}
