//! Geometry primitives.
//!
//! Every point is tagged with the coordinate space it was produced in:
//!
//! - `Natural`: the original frame. Detections and stored zones live here.
//! - `DisplaySpace`: whatever surface an operator is interacting with.
//!
//! All functions are generic over the space, so both operands of a query must
//! share one. The only way between spaces is `CoordinateTransform`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

use crate::error::GeometryError;

pub mod transform;

pub use transform::CoordinateTransform;

/// Default minimum distance between two polygon vertices, in natural pixels.
pub const DEFAULT_MIN_POINT_SEPARATION: f64 = 5.0;

const EPSILON: f64 = 1e-9;

/// A coordinate space tag.
pub trait CoordinateSpace: Copy + Default + fmt::Debug + PartialEq + 'static {
    const NAME: &'static str;
}

/// Frame coordinates (detections, persisted zones).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Natural;

/// Interaction-surface coordinates (editor input, previews).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DisplaySpace;

impl CoordinateSpace for Natural {
    const NAME: &'static str = "natural";
}

impl CoordinateSpace for DisplaySpace {
    const NAME: &'static str = "display";
}

/// A point in coordinate space `S`.
///
/// ```compile_fail
/// use hygiene_kernel::geometry::{DisplayPoint, NaturalPoint};
///
/// let stored = NaturalPoint::new(10.0, 10.0);
/// let pointer = DisplayPoint::new(10.0, 10.0);
/// // Spaces cannot be mixed without a CoordinateTransform.
/// let _ = stored.distance_to(pointer);
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Point<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

pub type NaturalPoint = Point<Natural>;
pub type DisplayPoint = Point<DisplaySpace>;

impl<S: CoordinateSpace> Point<S> {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    pub fn distance_to(self, other: Point<S>) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn midpoint(self, other: Point<S>) -> Point<S> {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Offset by a pointer movement delta in the same space.
    pub fn translated(self, dx: f64, dy: f64) -> Point<S> {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Round to the nearest multiple of `grid`. A non-positive grid is a no-op.
    pub fn snapped(self, grid: f64) -> Point<S> {
        if grid <= 0.0 || !grid.is_finite() {
            return self;
        }
        Point::new((self.x / grid).round() * grid, (self.y / grid).round() * grid)
    }
}

impl<S: CoordinateSpace> fmt::Debug for Point<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", S::NAME, self.x, self.y)
    }
}

impl<S: CoordinateSpace> From<(f64, f64)> for Point<S> {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

// -------------------- Shapes --------------------

/// Zone shape. A rectangle is kept as its two defining corners; containment
/// derives the axis-aligned bounds from them.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape<S: CoordinateSpace> {
    Rectangle { p1: Point<S>, p2: Point<S> },
    Polygon(Vec<Point<S>>),
}

impl<S: CoordinateSpace> Shape<S> {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle { .. } => ShapeKind::Rectangle,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    /// Containment test. A malformed polygon (fewer than three points)
    /// contains nothing.
    pub fn contains(&self, point: Point<S>) -> bool {
        match self {
            Shape::Rectangle { p1, p2 } => point_in_rectangle(point, *p1, *p2),
            Shape::Polygon(points) => points.len() >= 3 && point_in_polygon(point, points),
        }
    }

    /// Outline vertices. Rectangles yield their four corners clockwise from
    /// the minimum corner.
    pub fn vertices(&self) -> Vec<Point<S>> {
        match self {
            Shape::Rectangle { p1, p2 } => {
                let (min_x, max_x) = (p1.x.min(p2.x), p1.x.max(p2.x));
                let (min_y, max_y) = (p1.y.min(p2.y), p1.y.max(p2.y));
                vec![
                    Point::new(min_x, min_y),
                    Point::new(max_x, min_y),
                    Point::new(max_x, max_y),
                    Point::new(min_x, max_y),
                ]
            }
            Shape::Polygon(points) => points.clone(),
        }
    }

    /// Map every point into another space.
    pub fn map_points<T, F>(&self, f: F) -> Shape<T>
    where
        T: CoordinateSpace,
        F: Fn(Point<S>) -> Point<T>,
    {
        match self {
            Shape::Rectangle { p1, p2 } => Shape::Rectangle {
                p1: f(*p1),
                p2: f(*p2),
            },
            Shape::Polygon(points) => Shape::Polygon(points.iter().copied().map(f).collect()),
        }
    }

    pub fn validate(&self, min_separation: f64) -> Result<(), GeometryError> {
        match self {
            Shape::Rectangle { p1, p2 } => validate_rectangle(*p1, *p2),
            Shape::Polygon(points) => validate_polygon(points, min_separation),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Polygon,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
        }
    }
}

// -------------------- Containment --------------------

/// Ray-casting parity test.
///
/// Each edge is treated as half-open in y (`min_y <= py < max_y`), so a ray
/// through a shared vertex is counted exactly once.
pub fn point_in_polygon<S: CoordinateSpace>(point: Point<S>, polygon: &[Point<S>]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Inclusive axis-aligned bounds test between two opposite corners.
pub fn point_in_rectangle<S: CoordinateSpace>(point: Point<S>, p1: Point<S>, p2: Point<S>) -> bool {
    point.x >= p1.x.min(p2.x)
        && point.x <= p1.x.max(p2.x)
        && point.y >= p1.y.min(p2.y)
        && point.y <= p1.y.max(p2.y)
}

/// Containment against a stored zone.
pub fn contained_by_zone(point: NaturalPoint, zone: &crate::zone::Zone) -> bool {
    zone.shape.contains(point)
}

// -------------------- Proximity queries --------------------

/// Index of the first point within `radius` of `point`.
pub fn nearest_point_index<S: CoordinateSpace>(
    point: Point<S>,
    points: &[Point<S>],
    radius: f64,
) -> Option<usize> {
    points.iter().position(|p| p.distance_to(point) <= radius)
}

/// Index `i` of the closest edge `(points[i], points[(i + 1) % n])` passing
/// within `radius` of `point`.
pub fn nearest_edge_index<S: CoordinateSpace>(
    point: Point<S>,
    points: &[Point<S>],
    radius: f64,
) -> Option<usize> {
    let n = points.len();
    if n < 2 {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for i in 0..n {
        let d = point_segment_distance(point, points[i], points[(i + 1) % n]);
        if d <= radius && best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Distance from `p` to the segment `a..b` (clamped to the endpoints).
pub fn point_segment_distance<S: CoordinateSpace>(p: Point<S>, a: Point<S>, b: Point<S>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

// -------------------- Intersection --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

fn orientation<S: CoordinateSpace>(p: Point<S>, q: Point<S>, r: Point<S>) -> Orientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val.abs() < EPSILON {
        Orientation::Collinear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// `q` lies on segment `p..r`, given the three are collinear.
fn on_segment<S: CoordinateSpace>(p: Point<S>, q: Point<S>, r: Point<S>) -> bool {
    q.x <= p.x.max(r.x) + EPSILON
        && q.x >= p.x.min(r.x) - EPSILON
        && q.y <= p.y.max(r.y) + EPSILON
        && q.y >= p.y.min(r.y) - EPSILON
}

/// Closed-segment intersection, including touching endpoints and collinear overlap.
pub fn segments_intersect<S: CoordinateSpace>(
    p1: Point<S>,
    q1: Point<S>,
    p2: Point<S>,
    q2: Point<S>,
) -> bool {
    let o1 = orientation(p1, q1, p2);
    let o2 = orientation(p1, q1, q2);
    let o3 = orientation(p2, q2, p1);
    let o4 = orientation(p2, q2, q1);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(p1, p2, q1))
        || (o2 == Orientation::Collinear && on_segment(p1, q2, q1))
        || (o3 == Orientation::Collinear && on_segment(p2, p1, q2))
        || (o4 == Orientation::Collinear && on_segment(p2, q1, q2))
}

/// First pair of non-adjacent edges that intersect, by edge index.
pub fn find_self_intersection<S: CoordinateSpace>(points: &[Point<S>]) -> Option<(usize, usize)> {
    let n = points.len();
    if n < 4 {
        return None;
    }
    for i in 0..n {
        let (a1, a2) = (points[i], points[(i + 1) % n]);
        for j in (i + 2)..n {
            // Edge n-1 closes onto edge 0; they share a vertex.
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b1, b2) = (points[j], points[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return Some((i, j));
            }
        }
    }
    None
}

pub fn polygon_self_intersects<S: CoordinateSpace>(points: &[Point<S>]) -> bool {
    find_self_intersection(points).is_some()
}

// -------------------- Validation --------------------

/// Polygon validity: finite coordinates, at least three points, pairwise
/// separation of at least `min_separation`, no crossing non-adjacent edges,
/// non-zero area.
pub fn validate_polygon<S: CoordinateSpace>(
    points: &[Point<S>],
    min_separation: f64,
) -> Result<(), GeometryError> {
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(GeometryError::NonFinite { index });
    }
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints {
            count: points.len(),
        });
    }
    for (i, a) in points.iter().enumerate() {
        for (j, b) in points.iter().enumerate().skip(i + 1) {
            let distance = a.distance_to(*b);
            if distance < min_separation {
                return Err(GeometryError::PointsTooClose {
                    first: i,
                    second: j,
                    distance,
                });
            }
        }
    }
    if let Some((edge_a, edge_b)) = find_self_intersection(points) {
        return Err(GeometryError::SelfIntersecting { edge_a, edge_b });
    }
    if polygon_area(points).abs() < EPSILON {
        return Err(GeometryError::DegeneratePolygon);
    }
    Ok(())
}

/// Signed shoelace area.
pub fn polygon_area<S: CoordinateSpace>(points: &[Point<S>]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice / 2.0
}

pub fn validate_rectangle<S: CoordinateSpace>(p1: Point<S>, p2: Point<S>) -> Result<(), GeometryError> {
    for (index, p) in [p1, p2].iter().enumerate() {
        if !p.is_finite() {
            return Err(GeometryError::NonFinite { index });
        }
    }
    if (p1.x - p2.x).abs() < EPSILON || (p1.y - p2.y).abs() < EPSILON {
        return Err(GeometryError::DegenerateRectangle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly(coords: &[(f64, f64)]) -> Vec<NaturalPoint> {
        coords.iter().map(|&(x, y)| NaturalPoint::new(x, y)).collect()
    }

    /// Winding number reference: non-zero means inside.
    fn winding_number(p: NaturalPoint, polygon: &[NaturalPoint]) -> i32 {
        let is_left = |a: NaturalPoint, b: NaturalPoint, c: NaturalPoint| {
            (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
        };
        let mut wn = 0;
        for i in 0..polygon.len() {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            if a.y <= p.y {
                if b.y > p.y && is_left(a, b, p) > 0.0 {
                    wn += 1;
                }
            } else if b.y <= p.y && is_left(a, b, p) < 0.0 {
                wn -= 1;
            }
        }
        wn
    }

    #[test]
    fn square_contains_center_not_outside() {
        let square = poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(point_in_polygon(NaturalPoint::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(NaturalPoint::new(15.0, 15.0), &square));
    }

    #[test]
    fn ray_through_vertex_counts_once() {
        // The ray at y = 5 passes exactly through the vertices (5, 5) and (15, 5).
        let diamond = poly(&[(10.0, 0.0), (15.0, 5.0), (10.0, 10.0), (5.0, 5.0)]);
        assert!(!point_in_polygon(NaturalPoint::new(0.0, 5.0), &diamond));
        assert!(point_in_polygon(NaturalPoint::new(10.0, 5.0), &diamond));
        assert!(!point_in_polygon(NaturalPoint::new(20.0, 5.0), &diamond));
    }

    #[test]
    fn agrees_with_winding_number_reference() {
        let shapes = vec![
            // convex hexagon
            poly(&[
                (20.0, 0.0),
                (40.0, 10.0),
                (40.0, 30.0),
                (20.0, 40.0),
                (0.0, 30.0),
                (0.0, 10.0),
            ]),
            // concave "U"
            poly(&[
                (0.0, 0.0),
                (30.0, 0.0),
                (30.0, 30.0),
                (20.0, 30.0),
                (20.0, 10.0),
                (10.0, 10.0),
                (10.0, 30.0),
                (0.0, 30.0),
            ]),
            // concave arrow
            poly(&[(0.0, 0.0), (40.0, 20.0), (0.0, 40.0), (15.0, 20.0)]),
        ];
        for shape in &shapes {
            let mut y = -2.25;
            while y < 43.0 {
                let mut x = -2.25;
                while x < 43.0 {
                    let p = NaturalPoint::new(x, y);
                    assert_eq!(
                        point_in_polygon(p, shape),
                        winding_number(p, shape) != 0,
                        "disagreement at {:?}",
                        p
                    );
                    x += 1.5;
                }
                y += 1.5;
            }
        }
    }

    #[test]
    fn rectangle_containment_uses_corner_bounds() {
        let p1 = NaturalPoint::new(10.0, 20.0);
        let p2 = NaturalPoint::new(0.0, 0.0);
        assert!(point_in_rectangle(NaturalPoint::new(5.0, 5.0), p1, p2));
        assert!(point_in_rectangle(NaturalPoint::new(10.0, 20.0), p1, p2));
        assert!(!point_in_rectangle(NaturalPoint::new(11.0, 5.0), p1, p2));
    }

    #[test]
    fn malformed_polygon_contains_nothing() {
        let shape = Shape::Polygon(poly(&[(0.0, 0.0), (10.0, 0.0)]));
        assert!(!shape.contains(NaturalPoint::new(5.0, 0.0)));
    }

    #[test]
    fn bowtie_self_intersects_square_does_not() {
        let bowtie = poly(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]);
        let square = poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(polygon_self_intersects(&bowtie));
        assert!(!polygon_self_intersects(&square));
    }

    #[test]
    fn collinear_overlap_counts_as_intersection() {
        let a1 = NaturalPoint::new(0.0, 0.0);
        let a2 = NaturalPoint::new(10.0, 0.0);
        let b1 = NaturalPoint::new(5.0, 0.0);
        let b2 = NaturalPoint::new(15.0, 0.0);
        assert!(segments_intersect(a1, a2, b1, b2));
        let c1 = NaturalPoint::new(11.0, 0.0);
        assert!(!segments_intersect(a1, a2, c1, b2));
    }

    #[test]
    fn validate_polygon_reports_reasons() {
        let near_duplicate = poly(&[(0.0, 0.0), (10.0, 0.0), (0.1, 0.1)]);
        assert!(matches!(
            validate_polygon(&near_duplicate, DEFAULT_MIN_POINT_SEPARATION),
            Err(GeometryError::PointsTooClose { first: 0, second: 2, .. })
        ));

        let quad = poly(&[(0.0, 0.0), (40.0, 0.0), (50.0, 30.0), (0.0, 30.0)]);
        assert!(validate_polygon(&quad, DEFAULT_MIN_POINT_SEPARATION).is_ok());

        let two = poly(&[(0.0, 0.0), (40.0, 0.0)]);
        assert_eq!(
            validate_polygon(&two, DEFAULT_MIN_POINT_SEPARATION),
            Err(GeometryError::TooFewPoints { count: 2 })
        );

        let bowtie = poly(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]);
        assert!(matches!(
            validate_polygon(&bowtie, DEFAULT_MIN_POINT_SEPARATION),
            Err(GeometryError::SelfIntersecting { .. })
        ));

        let collinear = poly(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        assert_eq!(
            validate_polygon(&collinear, DEFAULT_MIN_POINT_SEPARATION),
            Err(GeometryError::DegeneratePolygon)
        );

        let nan = poly(&[(0.0, 0.0), (f64::NAN, 0.0), (0.0, 10.0)]);
        assert_eq!(
            validate_polygon(&nan, DEFAULT_MIN_POINT_SEPARATION),
            Err(GeometryError::NonFinite { index: 1 })
        );
    }

    #[test]
    fn nearest_point_and_edge_queries() {
        let square = poly(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
        assert_eq!(
            nearest_point_index(NaturalPoint::new(98.0, 3.0), &square, 5.0),
            Some(1)
        );
        assert_eq!(
            nearest_point_index(NaturalPoint::new(50.0, 50.0), &square, 5.0),
            None
        );
        // Closing edge (3 -> 0).
        assert_eq!(
            nearest_edge_index(NaturalPoint::new(2.0, 50.0), &square, 4.0),
            Some(3)
        );
        // Beyond the segment end: point-to-segment, not point-to-line.
        assert_eq!(
            nearest_edge_index(NaturalPoint::new(150.0, 1.0), &square, 4.0),
            None
        );
    }

    #[test]
    fn snapping_rounds_to_grid() {
        let p = DisplayPoint::new(14.0, 26.0).snapped(10.0);
        assert_eq!((p.x, p.y), (10.0, 30.0));
        let unchanged = DisplayPoint::new(14.0, 26.0).snapped(0.0);
        assert_eq!((unchanged.x, unchanged.y), (14.0, 26.0));
    }

    #[test]
    fn rectangle_vertices_are_four_corners() {
        let rect = Shape::Rectangle {
            p1: NaturalPoint::new(10.0, 0.0),
            p2: NaturalPoint::new(0.0, 5.0),
        };
        let corners: Vec<(f64, f64)> = rect.vertices().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            corners,
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]
        );
        assert_eq!(
            Shape::Rectangle {
                p1: NaturalPoint::new(1.0, 1.0),
                p2: NaturalPoint::new(1.0, 9.0),
            }
            .validate(DEFAULT_MIN_POINT_SEPARATION),
            Err(GeometryError::DegenerateRectangle)
        );
    }
}
