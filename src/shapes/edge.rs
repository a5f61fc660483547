use crate::collision::DistanceProxy;
use crate::core::POLYGON_VERTEX_RADIUS;
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::{MassData, Shape};
use std::any::Any;
use std::f32::consts::PI;

/// A line segment shape, optionally aware of its chain neighbors
///
/// When a neighbor vertex is present the edge is one-sided: contacts
/// approaching from the back side of the connected chain are rejected
/// by the collision functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// First endpoint of the segment
    pub vertex1: Vec2,

    /// Second endpoint of the segment
    pub vertex2: Vec2,

    /// Vertex preceding `vertex1` in the owning chain, if any
    pub ghost1: Option<Vec2>,

    /// Vertex following `vertex2` in the owning chain, if any
    pub ghost2: Option<Vec2>,

    /// Radius of the rounded segment ends
    pub vertex_radius: f32,
}

impl Edge {
    /// Creates a new free-standing two-sided edge
    pub fn new(vertex1: Vec2, vertex2: Vec2) -> Self {
        Self {
            vertex1,
            vertex2,
            ghost1: None,
            ghost2: None,
            vertex_radius: POLYGON_VERTEX_RADIUS,
        }
    }

    /// Creates a one-sided edge with the given neighbor vertices
    pub fn with_ghosts(
        vertex1: Vec2,
        vertex2: Vec2,
        ghost1: Option<Vec2>,
        ghost2: Option<Vec2>,
    ) -> Self {
        Self {
            vertex1,
            vertex2,
            ghost1,
            ghost2,
            vertex_radius: POLYGON_VERTEX_RADIUS,
        }
    }
}

impl Shape for Edge {
    fn shape_type(&self) -> &'static str {
        "edge"
    }

    fn child_count(&self) -> usize {
        1
    }

    fn vertex_radius(&self) -> f32 {
        self.vertex_radius
    }

    fn compute_aabb(&self, transform: &Transform, _child_index: usize) -> Aabb {
        let v1 = transform.transform_point(self.vertex1);
        let v2 = transform.transform_point(self.vertex2);

        Aabb::new(v1.min(&v2), v1.max(&v2)).expand(self.vertex_radius)
    }

    fn compute_mass(&self, density: f32) -> MassData {
        let center = (self.vertex1 + self.vertex2) * 0.5;
        let r = self.vertex_radius;
        if r <= 0.0 {
            // A raw segment has no area.
            return MassData {
                mass: 0.0,
                center,
                inertia: 0.0,
            };
        }

        // Rounded segment: a rectangle capped by two half circles.
        let length = (self.vertex2 - self.vertex1).length();
        let rect_mass = density * 2.0 * r * length;
        let caps_mass = density * PI * r * r;
        let mass = rect_mass + caps_mass;

        let rect_inertia = rect_mass * (length * length + 4.0 * r * r) / 12.0;
        let half_length = length * 0.5;
        let caps_inertia = caps_mass * (0.5 * r * r + half_length * half_length);

        MassData {
            mass,
            center,
            inertia: rect_inertia + caps_inertia + mass * center.length_squared(),
        }
    }

    fn distance_proxy(&self, _child_index: usize) -> DistanceProxy {
        DistanceProxy::new(vec![self.vertex1, self.vertex2], self.vertex_radius)
    }

    fn ray_cast(
        &self,
        input: &RayCastInput,
        transform: &Transform,
        _child_index: usize,
    ) -> Option<RayCastOutput> {
        // Work in the local frame of the edge.
        let p1 = transform.inverse_transform_point(input.p1);
        let p2 = transform.inverse_transform_point(input.p2);
        let d = p2 - p1;

        let v1 = self.vertex1;
        let v2 = self.vertex2;
        let e = v2 - v1;
        let normal = Vec2::new(e.y, -e.x).normalize();

        // q = p1 + t * d where dot(normal, q - v1) = 0
        let numerator = normal.dot(&(v1 - p1));
        let denominator = normal.dot(&d);

        if denominator == 0.0 {
            return None;
        }

        let t = numerator / denominator;
        if t < 0.0 || t > input.max_fraction {
            return None;
        }

        let q = p1 + d * t;

        // The hit point must lie within the segment.
        let rr = e.length_squared();
        if rr == 0.0 {
            return None;
        }
        let s = (q - v1).dot(&e) / rr;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        let world_normal = if numerator > 0.0 {
            transform.transform_direction(-normal)
        } else {
            transform.transform_direction(normal)
        };

        Some(RayCastOutput {
            normal: world_normal,
            fraction: t,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        Box::new(*self)
    }
}
