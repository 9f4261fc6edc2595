use serde::{Deserialize, Serialize};

/// Tamaño mínimo (ancho y alto) de un rectángulo editado.
pub const MIN_BOX_SIZE: f64 = 5.0;
/// Factor de escala por paso de rueda.
pub const ZOOM_STEP: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Vector `other - self`.
    pub fn delta_to(&self, other: Point) -> (f64, f64) {
        (other.x - self.x, other.y - self.y)
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let (dx, dy) = self.delta_to(other);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Caja alineada a los ejes, en coordenadas de mundo (píxeles de la imagen).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Interfaz común de las figuras editables.
pub trait Geometry {
    fn bounds(&self) -> Bounds;
    fn translate(&self, dx: f64, dy: f64) -> Self
    where
        Self: Sized;
    fn hit_test(&self, p: Point) -> bool;
}

/// Rectángulo de una parte `box`/`bar`. Ancho y alto nunca se guardan:
/// se derivan de las esquinas cada vez.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectShape {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl RectShape {
    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        Self { top_left, bottom_right }
    }

    pub fn width(&self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }

    pub fn meets_min_size(&self) -> bool {
        self.width() >= MIN_BOX_SIZE && self.height() >= MIN_BOX_SIZE
    }
}

impl Geometry for RectShape {
    fn bounds(&self) -> Bounds {
        let x = self.top_left.x.min(self.bottom_right.x);
        let y = self.top_left.y.min(self.bottom_right.y);
        Bounds { x, y, width: self.width().abs(), height: self.height().abs() }
    }

    fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            top_left: self.top_left.translated(dx, dy),
            bottom_right: self.bottom_right.translated(dx, dy),
        }
    }

    fn hit_test(&self, p: Point) -> bool {
        let b = self.bounds();
        p.x >= b.x && p.x <= b.x + b.width && p.y >= b.y && p.y <= b.y + b.height
    }
}

/// Círculo de una parte `circle` (medidores).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleShape {
    pub center: Point,
    pub radius: f64,
}

impl Geometry for CircleShape {
    fn bounds(&self) -> Bounds {
        Bounds {
            x: self.center.x - self.radius,
            y: self.center.y - self.radius,
            width: self.radius * 2.0,
            height: self.radius * 2.0,
        }
    }

    fn translate(&self, dx: f64, dy: f64) -> Self {
        Self { center: self.center.translated(dx, dy), radius: self.radius }
    }

    fn hit_test(&self, p: Point) -> bool {
        self.center.distance_to(p) <= self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Rect(RectShape),
    Circle(CircleShape),
}

impl Shape {
    /// Devuelve `candidate` salvo que sea un rectángulo por debajo del tamaño
    /// mínimo; en ese caso se conserva `prior` tal cual.
    pub fn constrained(prior: Shape, candidate: Shape) -> Shape {
        match candidate {
            Shape::Rect(r) if !r.meets_min_size() => prior,
            other => other,
        }
    }
}

impl Geometry for Shape {
    fn bounds(&self) -> Bounds {
        match self {
            Shape::Rect(r) => r.bounds(),
            Shape::Circle(c) => c.bounds(),
        }
    }

    fn translate(&self, dx: f64, dy: f64) -> Self {
        match self {
            Shape::Rect(r) => Shape::Rect(r.translate(dx, dy)),
            Shape::Circle(c) => Shape::Circle(c.translate(dx, dy)),
        }
    }

    fn hit_test(&self, p: Point) -> bool {
        match self {
            Shape::Rect(r) => r.hit_test(p),
            Shape::Circle(c) => c.hit_test(p),
        }
    }
}

/// Transformación pantalla ↔ mundo del lienzo: `screen = world * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f64,
    pub offset: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { scale: 1.0, offset: Point::default() }
    }
}

impl Viewport {
    pub fn to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.offset.x) / self.scale,
            (screen.y - self.offset.y) / self.scale,
        )
    }

    pub fn to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.scale + self.offset.x, world.y * self.scale + self.offset.y)
    }

    /// Zoom centrado en el cursor: el punto de mundo bajo `pointer` no se mueve.
    /// `delta_y < 0` acerca, cualquier otro valor aleja. Sin límites de escala.
    pub fn zoom_at(&mut self, pointer: Point, delta_y: f64) {
        let anchor = self.to_world(pointer);
        self.scale = if delta_y < 0.0 { self.scale * ZOOM_STEP } else { self.scale / ZOOM_STEP };
        self.offset = Point::new(pointer.x - anchor.x * self.scale, pointer.y - anchor.y * self.scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: f64, y1: f64, x2: f64, y2: f64) -> RectShape {
        RectShape::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    #[test]
    fn rect_translation_keeps_size() {
        let r = rect(10.0, 20.0, 60.0, 45.0);
        let moved = r.translate(-7.5, 13.0);
        assert_eq!(moved.width(), r.width());
        assert_eq!(moved.height(), r.height());
        assert_eq!(moved.top_left, Point::new(2.5, 33.0));
    }

    #[test]
    fn circle_translation_keeps_radius() {
        let c = CircleShape { center: Point::new(100.0, 100.0), radius: 32.0 };
        let moved = c.translate(4.0, -4.0);
        assert_eq!(moved.radius, 32.0);
        assert_eq!(moved.center, Point::new(104.0, 96.0));
    }

    #[test]
    fn hit_tests() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        assert!(r.hit_test(Point::new(10.0, 5.0)));
        assert!(!r.hit_test(Point::new(10.1, 5.0)));

        let c = CircleShape { center: Point::new(0.0, 0.0), radius: 5.0 };
        assert!(c.hit_test(Point::new(3.0, 4.0)));
        assert!(!c.hit_test(Point::new(4.0, 4.0)));
    }

    #[test]
    fn undersized_rect_reverts_to_prior() {
        let prior = Shape::Rect(rect(0.0, 0.0, 20.0, 20.0));
        let thin = Shape::Rect(rect(0.0, 0.0, 4.9, 20.0));
        assert_eq!(Shape::constrained(prior, thin), prior);

        let ok = Shape::Rect(rect(0.0, 0.0, 5.0, 5.0));
        assert_eq!(Shape::constrained(prior, ok), ok);
    }

    #[test]
    fn zoom_keeps_world_point_under_cursor() {
        let mut vp = Viewport { scale: 1.7, offset: Point::new(-40.0, 12.5) };
        let pointer = Point::new(321.0, 87.0);
        for delta in [-120.0, -120.0, 53.0, -1.0, 240.0] {
            let before = vp.to_world(pointer);
            vp.zoom_at(pointer, delta);
            let after = vp.to_world(pointer);
            assert!((before.x - after.x).abs() < 1e-9);
            assert!((before.y - after.y).abs() < 1e-9);
        }
    }

    #[test]
    fn zoom_direction_follows_wheel_sign() {
        let mut vp = Viewport::default();
        vp.zoom_at(Point::default(), -1.0);
        assert!((vp.scale - 1.1).abs() < 1e-12);
        vp.zoom_at(Point::default(), 1.0);
        assert!((vp.scale - 1.0).abs() < 1e-12);
    }
}
