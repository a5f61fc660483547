use crate::collision::BroadPhase;
use crate::core::{BodyHandle, FixtureId};
use crate::math::{Aabb, Transform, Vec2};
use crate::shapes::Shape;
use std::sync::Arc;

/// Collision filtering data attached to a fixture
///
/// Two fixtures collide when each one's mask admits the other's
/// category, unless they share a non-zero group index, which forces
/// the outcome regardless of the bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    /// The category this fixture belongs to
    pub category_bits: u16,

    /// The categories this fixture accepts collisions with
    pub mask_bits: u16,

    /// Positive groups always collide, negative groups never do
    pub group_index: i16,
}

impl Filter {
    /// Returns whether two filters allow a collision
    pub fn should_collide(&self, other: &Self) -> bool {
        if self.group_index == other.group_index && self.group_index != 0 {
            return self.group_index > 0;
        }

        (self.mask_bits & other.category_bits) != 0
            && (other.mask_bits & self.category_bits) != 0
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category_bits: 0x0001,
            mask_bits: 0xFFFF,
            group_index: 0,
        }
    }
}

/// Parameters for creating a fixture
#[derive(Clone)]
pub struct FixtureDef {
    /// The shape of the fixture, shared and immutable
    pub shape: Arc<dyn Shape>,

    /// Coefficient of friction
    pub friction: f32,

    /// Coefficient of restitution (bounciness)
    pub restitution: f32,

    /// Mass per unit area; zero-density fixtures add no mass
    pub density: f32,

    /// Sensors detect overlap but never generate collision response
    pub is_sensor: bool,

    /// Collision filtering data
    pub filter: Filter,
}

impl FixtureDef {
    /// Creates a fixture definition with default material properties
    pub fn new(shape: Arc<dyn Shape>) -> Self {
        Self {
            shape,
            friction: 0.2,
            restitution: 0.0,
            density: 0.0,
            is_sensor: false,
            filter: Filter::default(),
        }
    }

    /// Sets the density
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Sets the friction coefficient
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Sets the restitution coefficient
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Marks the fixture as a sensor
    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    /// Sets the collision filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Identifies one broad-phase proxy: a fixture child on a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureProxy {
    /// The body owning the fixture
    pub body: BodyHandle,

    /// The fixture's world-unique id
    pub fixture: FixtureId,

    /// The shape child this proxy covers
    pub child_index: usize,
}

/// A shape attached to a body with material and filtering properties
pub struct Fixture {
    id: FixtureId,
    shape: Arc<dyn Shape>,
    friction: f32,
    restitution: f32,
    density: f32,
    sensor: bool,
    filter: Filter,

    /// One broad-phase proxy id per shape child; empty while the
    /// owning body is inactive
    proxy_ids: Vec<i32>,
}

impl Fixture {
    pub(crate) fn new(id: FixtureId, def: &FixtureDef) -> Self {
        debug_assert!(def.density >= 0.0);
        debug_assert!(def.friction >= 0.0);

        Self {
            id,
            shape: def.shape.clone(),
            friction: def.friction,
            restitution: def.restitution,
            density: def.density,
            sensor: def.is_sensor,
            filter: def.filter,
            proxy_ids: Vec::new(),
        }
    }

    /// Returns the fixture's world-unique id
    pub fn id(&self) -> FixtureId {
        self.id
    }

    /// Returns the fixture's shape
    pub fn shape(&self) -> &Arc<dyn Shape> {
        &self.shape
    }

    /// Returns the friction coefficient
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Sets the friction coefficient for future contacts
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// Returns the restitution coefficient
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Sets the restitution coefficient for future contacts
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// Returns the density
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Returns whether the fixture is a sensor
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Returns the collision filter
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Returns the broad-phase proxy ids, one per shape child
    pub fn proxy_ids(&self) -> &[i32] {
        &self.proxy_ids
    }

    pub(crate) fn create_proxies(
        &mut self,
        broad_phase: &mut BroadPhase<FixtureProxy>,
        body: BodyHandle,
        xf: &Transform,
    ) {
        debug_assert!(self.proxy_ids.is_empty());

        for child_index in 0..self.shape.child_count() {
            let aabb = self.shape.compute_aabb(xf, child_index);
            let proxy_id = broad_phase.create_proxy(
                &aabb,
                FixtureProxy {
                    body,
                    fixture: self.id,
                    child_index,
                },
            );
            self.proxy_ids.push(proxy_id);
        }
    }

    pub(crate) fn destroy_proxies(&mut self, broad_phase: &mut BroadPhase<FixtureProxy>) {
        for proxy_id in self.proxy_ids.drain(..) {
            broad_phase.destroy_proxy(proxy_id);
        }
    }

    /// Updates the broad-phase with the AABB swept between two poses
    pub(crate) fn synchronize(
        &mut self,
        broad_phase: &mut BroadPhase<FixtureProxy>,
        xf1: &Transform,
        xf2: &Transform,
    ) {
        for (child_index, proxy_id) in self.proxy_ids.iter().enumerate() {
            let aabb1 = self.shape.compute_aabb(xf1, child_index);
            let aabb2 = self.shape.compute_aabb(xf2, child_index);
            let aabb = aabb1.union(&aabb2);

            let displacement = aabb2.center() - aabb1.center();
            broad_phase.move_proxy(*proxy_id, &aabb, displacement);
        }
    }

    /// Recomputes the fixture's tight AABB for a child at a transform
    pub fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb {
        self.shape.compute_aabb(xf, child_index)
    }

    /// Tests whether a world point lies on this fixture
    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        let proxy = self.shape.distance_proxy(0);
        let local = xf.inverse_transform_point(point);

        // Point-in-convex test against the proxy's vertices.
        let vertices = proxy.vertices();
        if vertices.len() == 1 {
            return local.distance(&vertices[0]) <= proxy.radius();
        }

        for i in 0..vertices.len() {
            let v1 = vertices[i];
            let v2 = vertices[(i + 1) % vertices.len()];
            let edge = v2 - v1;
            if edge.cross(&(local - v1)) < 0.0 {
                return false;
            }
        }

        vertices.len() > 2
    }
}

impl std::fmt::Debug for Fixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixture")
            .field("id", &self.id)
            .field("shape", &self.shape.shape_type())
            .field("density", &self.density)
            .field("sensor", &self.sensor)
            .finish()
    }
}
