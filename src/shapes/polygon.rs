use crate::collision::DistanceProxy;
use crate::core::{MAX_POLYGON_VERTICES, POLYGON_VERTEX_RADIUS};
use crate::math::{Aabb, RayCastInput, RayCastOutput, Rot, Transform, Vec2};
use crate::shapes::{MassData, Shape};
use std::any::Any;

/// A solid convex polygon with up to eight vertices
///
/// Vertices are stored counter-clockwise with one outward unit normal
/// per edge. Concave input is reduced to its convex hull.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Counter-clockwise vertices relative to the shape's local origin
    vertices: Vec<Vec2>,

    /// Outward unit normal for each edge
    normals: Vec<Vec2>,

    /// Centroid of the polygon
    centroid: Vec2,

    /// Radius of the rounded polygon corners
    vertex_radius: f32,
}

impl Polygon {
    /// Creates a polygon from a set of points
    ///
    /// The convex hull of the points is used, so ordering does not
    /// matter. At least three non-collinear points are required; fewer
    /// fall back to a small box around the origin.
    pub fn new(points: &[Vec2]) -> Self {
        debug_assert!(points.len() >= 3 && points.len() <= MAX_POLYGON_VERTICES);

        let hull = convex_hull(points);
        if hull.len() < 3 {
            debug_assert!(false, "degenerate polygon input");
            return Self::new_box(0.5, 0.5);
        }

        let normals = edge_normals(&hull);
        let centroid = compute_centroid(&hull);

        Self {
            vertices: hull,
            normals,
            centroid,
            vertex_radius: POLYGON_VERTEX_RADIUS,
        }
    }

    /// Creates an axis-aligned box with the given half extents
    pub fn new_box(half_width: f32, half_height: f32) -> Self {
        Self {
            vertices: vec![
                Vec2::new(-half_width, -half_height),
                Vec2::new(half_width, -half_height),
                Vec2::new(half_width, half_height),
                Vec2::new(-half_width, half_height),
            ],
            normals: vec![
                Vec2::new(0.0, -1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(-1.0, 0.0),
            ],
            centroid: Vec2::zero(),
            vertex_radius: POLYGON_VERTEX_RADIUS,
        }
    }

    /// Creates a box offset and rotated relative to the local origin
    pub fn new_oriented_box(half_width: f32, half_height: f32, center: Vec2, angle: f32) -> Self {
        let mut shape = Self::new_box(half_width, half_height);
        let xf = Transform::new(center, Rot::from_angle(angle));

        for vertex in &mut shape.vertices {
            *vertex = xf.transform_point(*vertex);
        }
        for normal in &mut shape.normals {
            *normal = xf.transform_direction(*normal);
        }
        shape.centroid = center;

        shape
    }

    /// Returns this polygon with a different corner radius
    pub fn with_vertex_radius(mut self, radius: f32) -> Self {
        self.vertex_radius = radius;
        self
    }

    /// Returns the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the vertices in counter-clockwise order
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Returns the outward edge normals
    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    /// Returns the centroid of the polygon
    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }
}

impl Shape for Polygon {
    fn shape_type(&self) -> &'static str {
        "polygon"
    }

    fn child_count(&self) -> usize {
        1
    }

    fn vertex_radius(&self) -> f32 {
        self.vertex_radius
    }

    fn compute_aabb(&self, transform: &Transform, _child_index: usize) -> Aabb {
        let mut lower = transform.transform_point(self.vertices[0]);
        let mut upper = lower;

        for vertex in self.vertices.iter().skip(1) {
            let v = transform.transform_point(*vertex);
            lower = lower.min(&v);
            upper = upper.max(&v);
        }

        Aabb::new(lower, upper).expand(self.vertex_radius)
    }

    fn compute_mass(&self, density: f32) -> MassData {
        // Accumulate signed triangle contributions about a reference
        // point near the shape to keep the integrals well conditioned.
        let count = self.vertices.len();
        let mut reference = Vec2::zero();
        for vertex in &self.vertices {
            reference += *vertex;
        }
        reference /= count as f32;

        let mut area = 0.0;
        let mut center = Vec2::zero();
        let mut inertia = 0.0;
        const INV3: f32 = 1.0 / 3.0;

        for i in 0..count {
            let e1 = self.vertices[i] - reference;
            let e2 = self.vertices[(i + 1) % count] - reference;

            let d = e1.cross(&e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;

            center += (e1 + e2) * (triangle_area * INV3);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * INV3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        debug_assert!(area > crate::math::EPSILON);
        center /= area;
        let world_center = center + reference;

        MassData {
            mass,
            center: world_center,
            // Shift the inertia from the reference point to the origin.
            inertia: density * inertia
                + mass * (world_center.length_squared() - center.length_squared()),
        }
    }

    fn distance_proxy(&self, _child_index: usize) -> DistanceProxy {
        DistanceProxy::new(self.vertices.clone(), self.vertex_radius)
    }

    fn ray_cast(
        &self,
        input: &RayCastInput,
        transform: &Transform,
        _child_index: usize,
    ) -> Option<RayCastOutput> {
        let p1 = transform.inverse_transform_point(input.p1);
        let p2 = transform.inverse_transform_point(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        for i in 0..self.vertices.len() {
            // p = p1 + t * d
            // dot(normal, p - v) = 0
            let numerator = self.normals[i].dot(&(self.vertices[i] - p1));
            let denominator = self.normals[i].dot(&d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else {
                let t = numerator / denominator;
                if denominator < 0.0 && t > lower {
                    lower = t;
                    index = Some(i);
                } else if denominator > 0.0 && t < upper {
                    upper = t;
                }
            }

            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            normal: transform.transform_direction(self.normals[i]),
            fraction: lower,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        Box::new(self.clone())
    }
}

/// Computes the counter-clockwise convex hull of a point set
fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    // Gift wrapping from the right-most point.
    let count = points.len().min(MAX_POLYGON_VERTICES);
    let points = &points[..count];

    let mut start = 0;
    for (i, point) in points.iter().enumerate().skip(1) {
        let best = points[start];
        if point.x > best.x || (point.x == best.x && point.y < best.y) {
            start = i;
        }
    }

    let mut hull: Vec<usize> = Vec::with_capacity(count);
    let mut current = start;

    loop {
        hull.push(current);

        let mut next = 0;
        for candidate in 1..count {
            if next == current {
                next = candidate;
                continue;
            }

            let r = points[next] - points[current];
            let v = points[candidate] - points[current];
            let c = r.cross(&v);
            if c < 0.0 || (c == 0.0 && v.length_squared() > r.length_squared()) {
                next = candidate;
            }
        }

        current = next;
        if current == start || hull.len() == count {
            break;
        }
    }

    hull.into_iter().map(|i| points[i]).collect()
}

/// Computes the outward unit normal of each hull edge
fn edge_normals(vertices: &[Vec2]) -> Vec<Vec2> {
    let count = vertices.len();
    let mut normals = Vec::with_capacity(count);

    for i in 0..count {
        let edge = vertices[(i + 1) % count] - vertices[i];
        debug_assert!(edge.length_squared() > crate::math::EPSILON * crate::math::EPSILON);
        normals.push(edge.right_perpendicular().normalize());
    }

    normals
}

/// Computes the area centroid of a convex polygon
fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
    let count = vertices.len();
    let mut center = Vec2::zero();
    let mut area = 0.0;
    const INV3: f32 = 1.0 / 3.0;

    let reference = vertices[0];
    for i in 1..count - 1 {
        let e1 = vertices[i] - reference;
        let e2 = vertices[i + 1] - reference;
        let triangle_area = 0.5 * e1.cross(&e2);
        area += triangle_area;
        center += (e1 + e2) * (triangle_area * INV3);
    }

    debug_assert!(area > crate::math::EPSILON);
    center / area + reference
}
