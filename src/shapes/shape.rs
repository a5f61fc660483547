use crate::collision::DistanceProxy;
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};
use std::any::Any;
use std::fmt::Debug;

/// Mass, center of mass, and rotational inertia computed from a shape
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassData {
    /// Mass of the shape in kilograms
    pub mass: f32,

    /// Center of mass relative to the shape's local origin
    pub center: Vec2,

    /// Rotational inertia about the shape's local origin
    pub inertia: f32,
}

/// Base trait for collision shapes
///
/// Shapes are immutable values shared between fixtures. Composite
/// shapes expose one convex child per index; simple shapes have a
/// single child.
pub trait Shape: Send + Sync + Debug + 'static {
    /// Returns the type name of the shape
    fn shape_type(&self) -> &'static str;

    /// Returns the number of convex children
    fn child_count(&self) -> usize;

    /// Returns the radius of the shape's rounded vertices
    fn vertex_radius(&self) -> f32;

    /// Computes the axis-aligned bounding box of a child in world space
    fn compute_aabb(&self, transform: &Transform, child_index: usize) -> Aabb;

    /// Computes the mass properties of the whole shape for a density
    fn compute_mass(&self, density: f32) -> MassData;

    /// Returns the convex distance proxy for a child
    fn distance_proxy(&self, child_index: usize) -> DistanceProxy;

    /// Casts a ray against a child in world space
    fn ray_cast(
        &self,
        input: &RayCastInput,
        transform: &Transform,
        child_index: usize,
    ) -> Option<RayCastOutput>;

    /// Returns a dynamic reference to any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Clone the shape to create a new box
    fn clone_shape(&self) -> Box<dyn Shape>;
}
