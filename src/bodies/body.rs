use crate::bodies::{body_flags::BodyFlags, BodyType, Fixture};
use crate::core::{ContactEdge, JointEdge};
use crate::math::{Sweep, Transform, Vec2};

/// Parameters for creating a body
#[derive(Debug, Clone)]
pub struct BodyDef {
    /// The body type: static, kinematic, or dynamic
    pub body_type: BodyType,

    /// World position of the body origin
    pub position: Vec2,

    /// World angle in radians
    pub angle: f32,

    /// Initial linear velocity of the origin
    pub linear_velocity: Vec2,

    /// Initial angular velocity
    pub angular_velocity: f32,

    /// Drag applied to linear velocity
    pub linear_damping: f32,

    /// Drag applied to angular velocity
    pub angular_damping: f32,

    /// Whether the body may fall asleep when still
    pub allow_sleep: bool,

    /// Whether the body starts awake
    pub awake: bool,

    /// Whether rotation is locked
    pub fixed_rotation: bool,

    /// Whether the body gets continuous collision detection against
    /// other dynamic bodies
    pub bullet: bool,

    /// Whether the body participates in simulation at all
    pub active: bool,

    /// Opaque user tag
    pub user_data: u64,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::zero(),
            angle: 0.0,
            linear_velocity: Vec2::zero(),
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            bullet: false,
            active: true,
            user_data: 0,
        }
    }
}

impl BodyDef {
    /// Creates a definition for a body of the given type
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            ..Default::default()
        }
    }

    /// Sets the starting position
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Sets the starting angle in radians
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Sets the starting linear velocity
    pub fn with_linear_velocity(mut self, velocity: Vec2) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// Marks the body for continuous collision detection
    pub fn as_bullet(mut self) -> Self {
        self.bullet = true;
        self
    }
}

/// A rigid body: a transform, velocities, mass, and attached fixtures
pub struct Body {
    /// World transform of the body origin
    transform: Transform,

    /// Swept motion of the center of mass over the current step
    sweep: Sweep,

    linear_velocity: Vec2,
    angular_velocity: f32,

    /// Accumulated force for the next integration
    force: Vec2,

    /// Accumulated torque for the next integration
    torque: f32,

    mass: f32,
    inv_mass: f32,

    /// Rotational inertia about the center of mass
    inertia: f32,
    inv_inertia: f32,

    linear_damping: f32,
    angular_damping: f32,

    body_type: BodyType,
    flags: BodyFlags,

    /// How long the body has been below the sleep thresholds
    sleep_time: f32,

    /// The fixtures attached to this body
    pub(crate) fixtures: Vec<Fixture>,

    /// Links to contacts involving this body
    pub(crate) contact_edges: Vec<ContactEdge>,

    /// Links to joints attached to this body
    pub(crate) joint_edges: Vec<JointEdge>,

    /// Position in the island currently being solved
    pub(crate) island_index: usize,

    user_data: u64,
}

impl Body {
    /// Creates a new body from a definition
    pub fn new(def: &BodyDef) -> Self {
        debug_assert!(def.position.is_valid());
        debug_assert!(def.angle.is_finite());
        debug_assert!(def.linear_velocity.is_valid());

        let mut flags = BodyFlags::empty();
        if def.allow_sleep {
            flags |= BodyFlags::AUTO_SLEEP;
        }
        if def.awake {
            flags |= BodyFlags::AWAKE;
        }
        if def.fixed_rotation {
            flags |= BodyFlags::FIXED_ROTATION;
        }
        if def.bullet {
            flags |= BodyFlags::BULLET;
        }
        if def.active {
            flags |= BodyFlags::ACTIVE;
        }

        let transform = Transform::from_position_angle(def.position, def.angle);
        let (mass, inv_mass) = if def.body_type == BodyType::Dynamic {
            (1.0, 1.0)
        } else {
            (0.0, 0.0)
        };

        Self {
            transform,
            sweep: Sweep::new(def.position, def.angle),
            linear_velocity: if def.body_type.is_speedable() {
                def.linear_velocity
            } else {
                Vec2::zero()
            },
            angular_velocity: if def.body_type.is_speedable() {
                def.angular_velocity
            } else {
                0.0
            },
            force: Vec2::zero(),
            torque: 0.0,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            body_type: def.body_type,
            flags,
            sleep_time: 0.0,
            fixtures: Vec::new(),
            contact_edges: Vec::new(),
            joint_edges: Vec::new(),
            island_index: 0,
            user_data: def.user_data,
        }
    }

    /// Returns the body type
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub(crate) fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;

        self.reset_mass_data();

        if body_type == BodyType::Static {
            self.linear_velocity = Vec2::zero();
            self.angular_velocity = 0.0;
            self.sweep.c0 = self.sweep.c;
            self.sweep.a0 = self.sweep.a;
        }

        self.set_awake(true);
        self.force = Vec2::zero();
        self.torque = 0.0;
    }

    /// Returns the body's world transform
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Returns the world position of the body origin
    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Returns the world angle in radians
    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    /// Returns the world position of the center of mass
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Returns the center of mass relative to the body origin
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    /// Returns the body's swept motion state
    pub fn sweep(&self) -> &Sweep {
        &self.sweep
    }

    pub(crate) fn sweep_mut(&mut self) -> &mut Sweep {
        &mut self.sweep
    }

    /// Moves the body to a new pose, resetting its sweep
    pub(crate) fn set_transform_internal(&mut self, position: Vec2, angle: f32) {
        debug_assert!(position.is_valid());
        debug_assert!(angle.is_finite());

        self.transform = Transform::from_position_angle(position, angle);

        self.sweep.c = self.transform.transform_point(self.sweep.local_center);
        self.sweep.a = angle;
        self.sweep.c0 = self.sweep.c;
        self.sweep.a0 = angle;
    }

    /// Rebuilds the transform from the end state of the sweep
    pub(crate) fn synchronize_transform(&mut self) {
        self.transform = Transform::from_position_angle(Vec2::zero(), self.sweep.a);
        self.transform.position =
            self.sweep.c - self.transform.rotation.rotate(self.sweep.local_center);
    }

    /// Advances the body's sweep to the given time and updates the
    /// transform to match
    pub(crate) fn advance(&mut self, alpha: f32) {
        self.sweep.advance(alpha);
        self.sweep.c = self.sweep.c0;
        self.sweep.a = self.sweep.a0;
        self.synchronize_transform();
    }

    /// Updates the broad-phase proxies of every fixture with the AABB
    /// swept from the start of the step to the current pose
    pub(crate) fn synchronize_fixtures_internal(
        &mut self,
        broad_phase: &mut crate::collision::BroadPhase<crate::bodies::FixtureProxy>,
    ) {
        let mut xf1 = Transform::from_position_angle(Vec2::zero(), self.sweep.a0);
        xf1.position = self.sweep.c0 - xf1.rotation.rotate(self.sweep.local_center);
        let xf2 = self.transform;

        for fixture in &mut self.fixtures {
            fixture.synchronize(broad_phase, &xf1, &xf2);
        }
    }

    /// Returns the linear velocity of the center of mass
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Sets the linear velocity of the center of mass
    pub fn set_linear_velocity(&mut self, velocity: Vec2) {
        if !self.body_type.is_speedable() {
            return;
        }

        if velocity.dot(&velocity) > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = velocity;
    }

    /// Returns the angular velocity in radians per second
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Sets the angular velocity in radians per second
    pub fn set_angular_velocity(&mut self, velocity: f32) {
        if !self.body_type.is_speedable() {
            return;
        }

        if velocity * velocity > 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = velocity;
    }

    pub(crate) fn set_velocity_internal(&mut self, linear: Vec2, angular: f32) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    /// Returns the mass of the body
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Returns the inverse mass
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Returns the rotational inertia about the center of mass
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Returns the inverse rotational inertia
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Returns the linear damping coefficient
    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Sets the linear damping coefficient
    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping;
    }

    /// Returns the angular damping coefficient
    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Sets the angular damping coefficient
    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping;
    }

    /// Returns the accumulated force
    pub(crate) fn force(&self) -> Vec2 {
        self.force
    }

    /// Returns the accumulated torque
    pub(crate) fn torque(&self) -> f32 {
        self.torque
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::zero();
        self.torque = 0.0;
    }

    /// Applies a force at the center of mass
    pub fn apply_force(&mut self, force: Vec2) {
        if !self.body_type.is_accelerable() {
            return;
        }
        self.set_awake(true);
        self.force += force;
    }

    /// Applies a force at a world point, inducing torque about the
    /// center of mass
    pub fn apply_force_at_point(&mut self, force: Vec2, point: Vec2) {
        if !self.body_type.is_accelerable() {
            return;
        }
        self.set_awake(true);
        self.force += force;
        self.torque += (point - self.sweep.c).cross(&force);
    }

    /// Applies a torque about the center of mass
    pub fn apply_torque(&mut self, torque: f32) {
        if !self.body_type.is_accelerable() {
            return;
        }
        self.set_awake(true);
        self.torque += torque;
    }

    /// Applies an instantaneous impulse at a world point
    pub fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2) {
        if !self.body_type.is_accelerable() {
            return;
        }
        self.set_awake(true);
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * (point - self.sweep.c).cross(&impulse);
    }

    /// Applies an instantaneous angular impulse
    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        if !self.body_type.is_accelerable() {
            return;
        }
        self.set_awake(true);
        self.angular_velocity += self.inv_inertia * impulse;
    }

    /// Recomputes mass, center of mass, and inertia from the fixtures
    pub(crate) fn reset_mass_data(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;
        self.sweep.local_center = Vec2::zero();

        if !self.body_type.is_accelerable() {
            self.sweep.c0 = self.transform.position;
            self.sweep.c = self.transform.position;
            self.sweep.a0 = self.sweep.a;
            return;
        }

        let mut local_center = Vec2::zero();
        for fixture in &self.fixtures {
            if fixture.density() == 0.0 {
                continue;
            }

            let mass_data = fixture.shape().compute_mass(fixture.density());
            self.mass += mass_data.mass;
            local_center += mass_data.center * mass_data.mass;
            self.inertia += mass_data.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            local_center *= self.inv_mass;
        } else {
            // Dynamic bodies always carry some mass so the solver's
            // mass matrices stay invertible.
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if self.inertia > 0.0 && !self.flags.contains(BodyFlags::FIXED_ROTATION) {
            // Shift to the center of mass.
            self.inertia -= self.mass * local_center.length_squared();
            debug_assert!(self.inertia > 0.0);
            self.inv_inertia = 1.0 / self.inertia;
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.transform.transform_point(local_center);
        self.sweep.c0 = self.sweep.c;

        // The center moved; update its velocity accordingly.
        self.linear_velocity +=
            Vec2::scalar_cross(self.angular_velocity, self.sweep.c - old_center);
    }

    /// Returns whether the body is awake
    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    /// Wakes the body or puts it to sleep
    pub fn set_awake(&mut self, awake: bool) {
        if awake {
            if !self.flags.contains(BodyFlags::AWAKE) {
                self.flags.insert(BodyFlags::AWAKE);
                self.sleep_time = 0.0;
            }
        } else {
            self.flags.remove(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::zero();
            self.angular_velocity = 0.0;
            self.force = Vec2::zero();
            self.torque = 0.0;
        }
    }

    /// Returns whether the body may fall asleep
    pub fn is_sleeping_allowed(&self) -> bool {
        self.flags.contains(BodyFlags::AUTO_SLEEP)
    }

    /// Allows or prevents automatic sleeping
    pub fn set_sleeping_allowed(&mut self, allowed: bool) {
        if allowed {
            self.flags.insert(BodyFlags::AUTO_SLEEP);
        } else {
            self.flags.remove(BodyFlags::AUTO_SLEEP);
            self.set_awake(true);
        }
    }

    /// Returns how long the body has been below the sleep thresholds
    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    pub(crate) fn set_sleep_time(&mut self, time: f32) {
        self.sleep_time = time;
    }

    /// Returns whether the body participates in simulation
    pub fn is_active(&self) -> bool {
        self.flags.contains(BodyFlags::ACTIVE)
    }

    pub(crate) fn set_active_flag(&mut self, active: bool) {
        if active {
            self.flags.insert(BodyFlags::ACTIVE);
        } else {
            self.flags.remove(BodyFlags::ACTIVE);
        }
    }

    /// Returns whether rotation is locked
    pub fn is_fixed_rotation(&self) -> bool {
        self.flags.contains(BodyFlags::FIXED_ROTATION)
    }

    /// Locks or unlocks rotation
    pub fn set_fixed_rotation(&mut self, fixed: bool) {
        if self.is_fixed_rotation() == fixed {
            return;
        }

        if fixed {
            self.flags.insert(BodyFlags::FIXED_ROTATION);
        } else {
            self.flags.remove(BodyFlags::FIXED_ROTATION);
        }

        self.angular_velocity = 0.0;
        self.reset_mass_data();
    }

    /// Returns whether the body uses continuous collision detection
    pub fn is_bullet(&self) -> bool {
        self.flags.contains(BodyFlags::BULLET)
    }

    /// Enables or disables continuous collision detection
    pub fn set_bullet(&mut self, bullet: bool) {
        if bullet {
            self.flags.insert(BodyFlags::BULLET);
        } else {
            self.flags.remove(BodyFlags::BULLET);
        }
    }

    pub(crate) fn is_in_island(&self) -> bool {
        self.flags.contains(BodyFlags::IN_ISLAND)
    }

    pub(crate) fn set_in_island(&mut self, in_island: bool) {
        if in_island {
            self.flags.insert(BodyFlags::IN_ISLAND);
        } else {
            self.flags.remove(BodyFlags::IN_ISLAND);
        }
    }

    /// Returns the fixtures attached to this body
    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Returns the fixture with the given id, if attached
    pub fn fixture(&self, id: crate::core::FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id() == id)
    }

    /// Returns the fixture with the given id mutably, if attached
    pub fn fixture_mut(&mut self, id: crate::core::FixtureId) -> Option<&mut Fixture> {
        self.fixtures.iter_mut().find(|f| f.id() == id)
    }

    /// Returns the body's contact edges
    pub fn contact_edges(&self) -> &[ContactEdge] {
        &self.contact_edges
    }

    /// Returns the body's joint edges
    pub fn joint_edges(&self) -> &[JointEdge] {
        &self.joint_edges
    }

    /// Returns the user tag supplied at creation
    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Sets the user tag
    pub fn set_user_data(&mut self, user_data: u64) {
        self.user_data = user_data;
    }

    /// Converts a local point to world coordinates
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.transform.transform_point(local)
    }

    /// Converts a world point to local coordinates
    pub fn local_point(&self, world: Vec2) -> Vec2 {
        self.transform.inverse_transform_point(world)
    }

    /// Converts a local direction to world coordinates
    pub fn world_vector(&self, local: Vec2) -> Vec2 {
        self.transform.transform_direction(local)
    }

    /// Converts a world direction to local coordinates
    pub fn local_vector(&self, world: Vec2) -> Vec2 {
        self.transform.inverse_transform_direction(world)
    }

    /// Returns the velocity of a world point on the body
    pub fn linear_velocity_from_world_point(&self, point: Vec2) -> Vec2 {
        self.linear_velocity + Vec2::scalar_cross(self.angular_velocity, point - self.sweep.c)
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("type", &self.body_type)
            .field("position", &self.transform.position)
            .field("angle", &self.sweep.a)
            .field("fixtures", &self.fixtures.len())
            .finish()
    }
}
