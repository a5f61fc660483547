use crate::collision::DistanceProxy;
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use crate::shapes::{MassData, Shape};
use std::any::Any;
use std::f32::consts::PI;

/// A solid circle shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center of the circle relative to the shape's local origin
    pub center: Vec2,

    /// Radius of the circle
    pub radius: f32,
}

impl Circle {
    /// Creates a new circle of the given radius centered on the origin
    pub fn new(radius: f32) -> Self {
        Self {
            center: Vec2::zero(),
            radius,
        }
    }

    /// Creates a new circle at the given local center
    pub fn with_center(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl Shape for Circle {
    fn shape_type(&self) -> &'static str {
        "circle"
    }

    fn child_count(&self) -> usize {
        1
    }

    fn vertex_radius(&self) -> f32 {
        self.radius
    }

    fn compute_aabb(&self, transform: &Transform, _child_index: usize) -> Aabb {
        let p = transform.transform_point(self.center);
        Aabb::from_center_half_extents(p, Vec2::new(self.radius, self.radius))
    }

    fn compute_mass(&self, density: f32) -> MassData {
        let mass = density * PI * self.radius * self.radius;
        MassData {
            mass,
            center: self.center,
            // Inertia about the origin via the parallel axis theorem.
            inertia: mass * (0.5 * self.radius * self.radius + self.center.length_squared()),
        }
    }

    fn distance_proxy(&self, _child_index: usize) -> DistanceProxy {
        DistanceProxy::new(vec![self.center], self.radius)
    }

    fn ray_cast(
        &self,
        input: &RayCastInput,
        transform: &Transform,
        _child_index: usize,
    ) -> Option<RayCastOutput> {
        let position = transform.transform_point(self.center);
        let s = input.p1 - position;
        let b = s.length_squared() - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(&r);
        let rr = r.length_squared();
        let sigma = c * c - rr * b;

        if sigma < 0.0 || rr < crate::math::EPSILON {
            return None;
        }

        let a = -(c + sigma.sqrt());
        if a >= 0.0 && a <= input.max_fraction * rr {
            let fraction = a / rr;
            return Some(RayCastOutput {
                normal: (s + r * fraction).normalize(),
                fraction,
            });
        }

        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_shape(&self) -> Box<dyn Shape> {
        Box::new(*self)
    }
}
