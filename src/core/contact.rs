use crate::bodies::Body;
use crate::collision::{
    collide_circles, collide_edge_circle, collide_edge_polygon, collide_polygon_circle,
    collide_polygons, test_overlap, Manifold,
};
use crate::core::{BodyHandle, FixtureId};
use crate::math::Transform;
use crate::shapes::{Chain, Circle, Edge, Polygon, Shape};
use bitflags::bitflags;

pub use crate::core::events::ContactImpulses;

bitflags! {
    /// State flags of a contact
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContactFlags: u32 {
        /// The contact participates in the solver
        const ENABLED = 0x01;

        /// The manifold currently has points
        const TOUCHING = 0x02;

        /// The filter must be re-run before the next narrow-phase update
        const FILTER = 0x04;

        /// The contact has been added to the island being solved
        const IN_ISLAND = 0x08;

        /// The cached time of impact is valid
        const TOI_VALID = 0x10;
    }
}

/// Mixes the friction of two fixtures
///
/// The geometric mean lets a slippery material dominate a rough one.
pub fn mix_friction(friction_a: f32, friction_b: f32) -> f32 {
    (friction_a * friction_b).sqrt()
}

/// Mixes the restitution of two fixtures
///
/// The maximum lets a bouncy material dominate an inelastic one.
pub fn mix_restitution(restitution_a: f32, restitution_b: f32) -> f32 {
    restitution_a.max(restitution_b)
}

/// A live narrow-phase relationship between two fixture children whose
/// broad-phase proxies overlap
pub struct Contact {
    body_a: BodyHandle,
    body_b: BodyHandle,
    fixture_a: FixtureId,
    fixture_b: FixtureId,
    child_a: usize,
    child_b: usize,

    manifold: Manifold,
    flags: ContactFlags,

    friction: f32,
    restitution: f32,

    /// Surface translation speed along the tangent, for conveyor belts
    tangent_speed: f32,

    /// Number of TOI sub-steps spent on this contact this world step
    pub(crate) toi_count: u32,

    /// Cached time of impact when `TOI_VALID` is set
    pub(crate) toi: f32,
}

impl Contact {
    pub(crate) fn new(
        body_a: BodyHandle,
        fixture_a: FixtureId,
        child_a: usize,
        body_b: BodyHandle,
        fixture_b: FixtureId,
        child_b: usize,
        friction: f32,
        restitution: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            fixture_a,
            fixture_b,
            child_a,
            child_b,
            manifold: Manifold::default(),
            flags: ContactFlags::ENABLED,
            friction,
            restitution,
            tangent_speed: 0.0,
            toi_count: 0,
            toi: 0.0,
        }
    }

    /// Returns the body owning fixture A
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Returns the body owning fixture B
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Returns fixture A's id
    pub fn fixture_a(&self) -> FixtureId {
        self.fixture_a
    }

    /// Returns fixture B's id
    pub fn fixture_b(&self) -> FixtureId {
        self.fixture_b
    }

    /// Returns the shape child index on fixture A
    pub fn child_a(&self) -> usize {
        self.child_a
    }

    /// Returns the shape child index on fixture B
    pub fn child_b(&self) -> usize {
        self.child_b
    }

    /// Returns the current manifold
    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    pub(crate) fn manifold_mut(&mut self) -> &mut Manifold {
        &mut self.manifold
    }

    /// Returns whether the fixtures are currently touching
    pub fn is_touching(&self) -> bool {
        self.flags.contains(ContactFlags::TOUCHING)
    }

    /// Returns whether the contact participates in the solver
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(ContactFlags::ENABLED)
    }

    /// Enables or disables the contact
    ///
    /// Disabling from `pre_solve` skips the response for one step; the
    /// flag is restored on the next narrow-phase update.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.flags.insert(ContactFlags::ENABLED);
        } else {
            self.flags.remove(ContactFlags::ENABLED);
        }
    }

    /// Schedules the collision filter to run again for this contact
    pub fn flag_for_filtering(&mut self) {
        self.flags.insert(ContactFlags::FILTER);
    }

    pub(crate) fn needs_filtering(&self) -> bool {
        self.flags.contains(ContactFlags::FILTER)
    }

    pub(crate) fn clear_filter_flag(&mut self) {
        self.flags.remove(ContactFlags::FILTER);
    }

    pub(crate) fn is_in_island(&self) -> bool {
        self.flags.contains(ContactFlags::IN_ISLAND)
    }

    pub(crate) fn set_in_island(&mut self, in_island: bool) {
        if in_island {
            self.flags.insert(ContactFlags::IN_ISLAND);
        } else {
            self.flags.remove(ContactFlags::IN_ISLAND);
        }
    }

    pub(crate) fn has_valid_toi(&self) -> bool {
        self.flags.contains(ContactFlags::TOI_VALID)
    }

    pub(crate) fn set_toi(&mut self, toi: f32) {
        self.toi = toi;
        self.flags.insert(ContactFlags::TOI_VALID);
    }

    pub(crate) fn invalidate_toi(&mut self) {
        self.flags.remove(ContactFlags::TOI_VALID);
    }

    /// Returns the mixed friction used by the solver
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Overrides the mixed friction
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// Returns the mixed restitution used by the solver
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Overrides the mixed restitution
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// Returns the tangent surface speed in meters per second
    pub fn tangent_speed(&self) -> f32 {
        self.tangent_speed
    }

    /// Sets the tangent surface speed, making the contact behave like
    /// a conveyor belt
    pub fn set_tangent_speed(&mut self, speed: f32) {
        self.tangent_speed = speed;
    }

    /// Recomputes the manifold and touching state
    ///
    /// Accumulated impulses carry over to new points with matching
    /// contact features so the solver can warm start. Returns the
    /// touching transition `(was_touching, is_touching)` and the prior
    /// manifold for listener dispatch.
    pub(crate) fn update(&mut self, body_a: &Body, body_b: &Body) -> (bool, bool, Manifold) {
        let old_manifold = self.manifold;
        let was_touching = self.is_touching();

        // A disabled contact gets another chance next update.
        self.flags.insert(ContactFlags::ENABLED);

        let (fixture_a, fixture_b) =
            match (body_a.fixture(self.fixture_a), body_b.fixture(self.fixture_b)) {
                (Some(a), Some(b)) => (a, b),
                // The fixture is gone; the manager destroys this
                // contact on its next pass.
                _ => {
                    self.flags.remove(ContactFlags::TOUCHING);
                    return (was_touching, false, old_manifold);
                }
            };

        let xf_a = body_a.transform();
        let xf_b = body_b.transform();

        let sensor = fixture_a.is_sensor() || fixture_b.is_sensor();
        let touching;

        if sensor {
            let proxy_a = fixture_a.shape().distance_proxy(self.child_a);
            let proxy_b = fixture_b.shape().distance_proxy(self.child_b);
            touching = test_overlap(&proxy_a, &xf_a, &proxy_b, &xf_b);

            // Sensors never drive the solver.
            self.manifold.clear();
        } else {
            self.manifold = evaluate_manifold(
                fixture_a.shape().as_ref(),
                &xf_a,
                self.child_a,
                fixture_b.shape().as_ref(),
                &xf_b,
                self.child_b,
            );
            touching = self.manifold.point_count() > 0;

            // Match accumulated impulses across frames by feature id.
            for point in self.manifold.points_mut() {
                for old_point in old_manifold.points() {
                    if old_point.feature == point.feature {
                        point.normal_impulse = old_point.normal_impulse;
                        point.tangent_impulse = old_point.tangent_impulse;
                        break;
                    }
                }
            }
        }

        if touching {
            self.flags.insert(ContactFlags::TOUCHING);
        } else {
            self.flags.remove(ContactFlags::TOUCHING);
        }

        (was_touching, touching, old_manifold)
    }
}

impl std::fmt::Debug for Contact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contact")
            .field("fixture_a", &self.fixture_a)
            .field("fixture_b", &self.fixture_b)
            .field("touching", &self.is_touching())
            .field("points", &self.manifold.point_count())
            .finish()
    }
}

/// Collision ordering rank; higher-ranked shapes take the A role
pub(crate) fn shape_rank(shape: &dyn Shape) -> u8 {
    match shape.shape_type() {
        "circle" => 0,
        "polygon" => 1,
        "edge" => 2,
        "chain" => 3,
        _ => 0,
    }
}

/// Computes the manifold for an ordered shape pair
///
/// The caller guarantees `shape_rank(a) >= shape_rank(b)`. Pairs with
/// no registered collision function (edge against edge or chain)
/// produce an empty manifold.
pub(crate) fn evaluate_manifold(
    shape_a: &dyn Shape,
    xf_a: &Transform,
    child_a: usize,
    shape_b: &dyn Shape,
    xf_b: &Transform,
    child_b: usize,
) -> Manifold {
    let any_a = shape_a.as_any();
    let any_b = shape_b.as_any();

    if let Some(circle_b) = any_b.downcast_ref::<Circle>() {
        if let Some(circle_a) = any_a.downcast_ref::<Circle>() {
            return collide_circles(circle_a, xf_a, circle_b, xf_b);
        }
        if let Some(polygon_a) = any_a.downcast_ref::<Polygon>() {
            return collide_polygon_circle(polygon_a, xf_a, circle_b, xf_b);
        }
        if let Some(edge_a) = any_a.downcast_ref::<Edge>() {
            return collide_edge_circle(edge_a, xf_a, circle_b, xf_b);
        }
        if let Some(chain_a) = any_a.downcast_ref::<Chain>() {
            let edge = chain_a.child_edge(child_a);
            return collide_edge_circle(&edge, xf_a, circle_b, xf_b);
        }
    }

    if let Some(polygon_b) = any_b.downcast_ref::<Polygon>() {
        if let Some(polygon_a) = any_a.downcast_ref::<Polygon>() {
            return collide_polygons(polygon_a, xf_a, polygon_b, xf_b);
        }
        if let Some(edge_a) = any_a.downcast_ref::<Edge>() {
            return collide_edge_polygon(edge_a, xf_a, polygon_b, xf_b);
        }
        if let Some(chain_a) = any_a.downcast_ref::<Chain>() {
            let edge = chain_a.child_edge(child_a);
            return collide_edge_polygon(&edge, xf_a, polygon_b, xf_b);
        }
    }

    let _ = child_b;
    Manifold::default()
}
