use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, LimitState, SolverData};
use crate::core::storage::BodyStorage;
use crate::core::{BodyHandle, ANGULAR_SLOP, LINEAR_SLOP};
use crate::math::{Mat33, Rot, Vec2, Vec3};
use std::any::Any;

/// A revolute joint pinning two bodies at a shared point
///
/// The bodies rotate freely about the anchor unless a limit restricts
/// the joint angle or a motor drives it.
pub struct RevoluteJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    collide_connected: bool,

    /// Anchor relative to body A's origin
    local_anchor_a: Vec2,

    /// Anchor relative to body B's origin
    local_anchor_b: Vec2,

    /// Body B angle minus body A angle at rest
    reference_angle: f32,

    /// Accumulated point impulse (x, y) and limit impulse (z)
    impulse: Vec3,
    motor_impulse: f32,

    motor_enabled: bool,
    max_motor_torque: f32,
    motor_speed: f32,

    limit_enabled: bool,
    lower_angle: f32,
    upper_angle: f32,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    r_a: Vec2,
    r_b: Vec2,
    mass: Mat33,
    motor_mass: f32,
    limit_state: LimitState,
}

impl RevoluteJoint {
    /// Creates a revolute joint anchored at a world point
    ///
    /// The local anchors and reference angle are derived from the
    /// bodies' current transforms.
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor: Vec2,
    ) -> Self {
        use crate::core::storage::Storage;

        let (local_anchor_a, local_anchor_b, reference_angle) =
            match (bodies.get(body_a), bodies.get(body_b)) {
                (Some(a), Some(b)) => (
                    a.local_point(world_anchor),
                    b.local_point(world_anchor),
                    b.angle() - a.angle(),
                ),
                _ => (Vec2::zero(), Vec2::zero(), 0.0),
            };

        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a,
            local_anchor_b,
            reference_angle,
            impulse: Vec3::zero(),
            motor_impulse: 0.0,
            motor_enabled: false,
            max_motor_torque: 0.0,
            motor_speed: 0.0,
            limit_enabled: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            mass: Mat33::zero(),
            motor_mass: 0.0,
            limit_state: LimitState::Inactive,
        }
    }

    /// Allows the attached bodies to collide with each other
    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    /// Returns the current joint angle in radians
    pub fn joint_angle(&self, bodies: &BodyStorage<Body>) -> f32 {
        use crate::core::storage::Storage;
        match (bodies.get(self.body_a), bodies.get(self.body_b)) {
            (Some(a), Some(b)) => b.angle() - a.angle() - self.reference_angle,
            _ => 0.0,
        }
    }

    /// Returns the current joint angular speed in radians per second
    pub fn joint_speed(&self, bodies: &BodyStorage<Body>) -> f32 {
        use crate::core::storage::Storage;
        match (bodies.get(self.body_a), bodies.get(self.body_b)) {
            (Some(a), Some(b)) => b.angular_velocity() - a.angular_velocity(),
            _ => 0.0,
        }
    }

    /// Enables the angle limit with the given bounds in radians
    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        debug_assert!(lower <= upper);
        if lower != self.lower_angle || upper != self.upper_angle {
            self.impulse.z = 0.0;
            self.lower_angle = lower;
            self.upper_angle = upper;
        }
        self.limit_enabled = true;
    }

    /// Enables or disables the angle limit
    pub fn enable_limit(&mut self, enabled: bool) {
        if enabled != self.limit_enabled {
            self.impulse.z = 0.0;
        }
        self.limit_enabled = enabled;
    }

    /// Returns whether the angle limit is enabled
    pub fn is_limit_enabled(&self) -> bool {
        self.limit_enabled
    }

    /// Returns the lower angle limit
    pub fn lower_limit(&self) -> f32 {
        self.lower_angle
    }

    /// Returns the upper angle limit
    pub fn upper_limit(&self) -> f32 {
        self.upper_angle
    }

    /// Enables the motor with a target speed and torque budget
    pub fn enable_motor(&mut self, speed: f32, max_torque: f32) {
        self.motor_enabled = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque.max(0.0);
    }

    /// Disables the motor
    pub fn disable_motor(&mut self) {
        self.motor_enabled = false;
    }

    /// Returns whether the motor is enabled
    pub fn is_motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    /// Returns the motor torque applied over the last step
    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    /// Returns the reference angle captured at creation
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Returns the anchor relative to body A's origin
    pub fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    /// Returns the anchor relative to body B's origin
    pub fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }

    fn fixed_rotation(&self) -> bool {
        self.data_a.inv_i + self.data_b.inv_i == 0.0
    }
}

impl Joint for RevoluteJoint {
    fn joint_type(&self) -> &'static str {
        "revolute"
    }

    fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    fn anchor_a(&self, bodies: &BodyStorage<Body>) -> Vec2 {
        use crate::core::storage::Storage;
        bodies
            .get(self.body_a)
            .map(|b| b.world_point(self.local_anchor_a))
            .unwrap_or(self.local_anchor_a)
    }

    fn anchor_b(&self, bodies: &BodyStorage<Body>) -> Vec2 {
        use crate::core::storage::Storage;
        bodies
            .get(self.body_b)
            .map(|b| b.world_point(self.local_anchor_b))
            .unwrap_or(self.local_anchor_b)
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        Vec2::new(self.impulse.x, self.impulse.y) * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.z
    }

    fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &BodyStorage<Body>) {
        self.data_a = JointBodyData::from_body(bodies, self.body_a);
        self.data_b = JointBodyData::from_body(bodies, self.body_b);

        let a_a = data.positions[self.data_a.index].a;
        let a_b = data.positions[self.data_b.index].a;
        let q_a = Rot::from_angle(a_a);
        let q_b = Rot::from_angle(a_b);

        self.r_a = q_a.rotate(self.local_anchor_a - self.data_a.local_center);
        self.r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);

        let m_a = self.data_a.inv_mass;
        let m_b = self.data_b.inv_mass;
        let i_a = self.data_a.inv_i;
        let i_b = self.data_b.inv_i;

        let fixed_rotation = self.fixed_rotation();

        self.mass.ex.x = m_a + m_b + self.r_a.y * self.r_a.y * i_a + self.r_b.y * self.r_b.y * i_b;
        self.mass.ey.x = -self.r_a.y * self.r_a.x * i_a - self.r_b.y * self.r_b.x * i_b;
        self.mass.ez.x = -self.r_a.y * i_a - self.r_b.y * i_b;
        self.mass.ex.y = self.mass.ey.x;
        self.mass.ey.y = m_a + m_b + self.r_a.x * self.r_a.x * i_a + self.r_b.x * self.r_b.x * i_b;
        self.mass.ez.y = self.r_a.x * i_a + self.r_b.x * i_b;
        self.mass.ex.z = self.mass.ez.x;
        self.mass.ey.z = self.mass.ez.y;
        self.mass.ez.z = i_a + i_b;

        self.motor_mass = i_a + i_b;
        if self.motor_mass > 0.0 {
            self.motor_mass = 1.0 / self.motor_mass;
        }

        if !self.motor_enabled || fixed_rotation {
            self.motor_impulse = 0.0;
        }

        if self.limit_enabled && !fixed_rotation {
            let joint_angle = a_b - a_a - self.reference_angle;
            if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_angle <= self.lower_angle {
                if self.limit_state != LimitState::AtLower {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtLower;
            } else if joint_angle >= self.upper_angle {
                if self.limit_state != LimitState::AtUpper {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtUpper;
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
        }

        if data.step.do_warm_start {
            self.impulse = self.impulse * data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;

            let p = Vec2::new(self.impulse.x, self.impulse.y);

            let va = &mut data.velocities[self.data_a.index];
            va.v -= p * m_a;
            va.w -= i_a * (self.r_a.cross(&p) + self.motor_impulse + self.impulse.z);

            let vb = &mut data.velocities[self.data_b.index];
            vb.v += p * m_b;
            vb.w += i_b * (self.r_b.cross(&p) + self.motor_impulse + self.impulse.z);
        } else {
            self.impulse = Vec3::zero();
            self.motor_impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let m_a = self.data_a.inv_mass;
        let m_b = self.data_b.inv_mass;
        let i_a = self.data_a.inv_i;
        let i_b = self.data_b.inv_i;

        let mut v_a = data.velocities[self.data_a.index].v;
        let mut w_a = data.velocities[self.data_a.index].w;
        let mut v_b = data.velocities[self.data_b.index].v;
        let mut w_b = data.velocities[self.data_b.index].w;

        let fixed_rotation = self.fixed_rotation();

        // Motor torque, clamped to the per-step budget.
        if self.motor_enabled && self.limit_state != LimitState::Equal && !fixed_rotation {
            let cdot = w_b - w_a - self.motor_speed;
            let impulse = -self.motor_mass * cdot;
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_torque * data.step.dt;
            self.motor_impulse =
                crate::math::clamp(old_impulse + impulse, -max_impulse, max_impulse);
            let impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        if self.limit_enabled && self.limit_state != LimitState::Inactive && !fixed_rotation {
            // Solve the point constraint and the limit together.
            let cdot1 =
                v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);
            let cdot2 = w_b - w_a;
            let cdot = Vec3::new(cdot1.x, cdot1.y, cdot2);

            let mut impulse = -self.mass.solve33(cdot);

            match self.limit_state {
                LimitState::Equal => {
                    self.impulse += impulse;
                }
                LimitState::AtLower => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse < 0.0 {
                        let rhs =
                            -cdot1 + Vec2::new(self.mass.ez.x, self.mass.ez.y) * self.impulse.z;
                        let reduced = self.mass.solve22(rhs);
                        impulse.x = reduced.x;
                        impulse.y = reduced.y;
                        impulse.z = -self.impulse.z;
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse += impulse;
                    }
                }
                LimitState::AtUpper => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse > 0.0 {
                        let rhs =
                            -cdot1 + Vec2::new(self.mass.ez.x, self.mass.ez.y) * self.impulse.z;
                        let reduced = self.mass.solve22(rhs);
                        impulse.x = reduced.x;
                        impulse.y = reduced.y;
                        impulse.z = -self.impulse.z;
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse += impulse;
                    }
                }
                LimitState::Inactive => unreachable!(),
            }

            let p = Vec2::new(impulse.x, impulse.y);
            v_a -= p * m_a;
            w_a -= i_a * (self.r_a.cross(&p) + impulse.z);
            v_b += p * m_b;
            w_b += i_b * (self.r_b.cross(&p) + impulse.z);
        } else {
            // Just the point constraint.
            let cdot =
                v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);
            let impulse = self.mass.solve22(-cdot);

            self.impulse.x += impulse.x;
            self.impulse.y += impulse.y;

            v_a -= impulse * m_a;
            w_a -= i_a * self.r_a.cross(&impulse);
            v_b += impulse * m_b;
            w_b += i_b * self.r_b.cross(&impulse);
        }

        data.velocities[self.data_a.index].v = v_a;
        data.velocities[self.data_a.index].w = w_a;
        data.velocities[self.data_b.index].v = v_b;
        data.velocities[self.data_b.index].w = w_b;
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let mut c_a = data.positions[self.data_a.index].c;
        let mut a_a = data.positions[self.data_a.index].a;
        let mut c_b = data.positions[self.data_b.index].c;
        let mut a_b = data.positions[self.data_b.index].a;

        let m_a = self.data_a.inv_mass;
        let m_b = self.data_b.inv_mass;
        let i_a = self.data_a.inv_i;
        let i_b = self.data_b.inv_i;

        let fixed_rotation = self.fixed_rotation();

        let mut angular_error = 0.0;

        if self.limit_enabled && self.limit_state != LimitState::Inactive && !fixed_rotation {
            let angle = a_b - a_a - self.reference_angle;
            let mut limit_impulse = 0.0;

            match self.limit_state {
                LimitState::Equal => {
                    let c = crate::math::clamp(
                        angle - self.lower_angle,
                        -data.step.max_angular_correction,
                        data.step.max_angular_correction,
                    );
                    limit_impulse = -self.motor_mass * c;
                    angular_error = c.abs();
                }
                LimitState::AtLower => {
                    let mut c = angle - self.lower_angle;
                    angular_error = -c;
                    c = crate::math::clamp(
                        c + ANGULAR_SLOP,
                        -data.step.max_angular_correction,
                        0.0,
                    );
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::AtUpper => {
                    let mut c = angle - self.upper_angle;
                    angular_error = c;
                    c = crate::math::clamp(
                        c - ANGULAR_SLOP,
                        0.0,
                        data.step.max_angular_correction,
                    );
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::Inactive => {}
            }

            a_a -= i_a * limit_impulse;
            a_b += i_b * limit_impulse;
        }

        // Point constraint.
        let q_a = Rot::from_angle(a_a);
        let q_b = Rot::from_angle(a_b);
        let r_a = q_a.rotate(self.local_anchor_a - self.data_a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);

        let c = c_b + r_b - c_a - r_a;
        let position_error = c.length();

        let k = crate::math::Mat22::from_entries(
            m_a + m_b + i_a * r_a.y * r_a.y + i_b * r_b.y * r_b.y,
            -i_a * r_a.x * r_a.y - i_b * r_b.x * r_b.y,
            -i_a * r_a.x * r_a.y - i_b * r_b.x * r_b.y,
            m_a + m_b + i_a * r_a.x * r_a.x + i_b * r_b.x * r_b.x,
        );

        let impulse = -k.solve(c);

        c_a -= impulse * m_a;
        a_a -= i_a * r_a.cross(&impulse);
        c_b += impulse * m_b;
        a_b += i_b * r_b.cross(&impulse);

        data.positions[self.data_a.index].c = c_a;
        data.positions[self.data_a.index].a = a_a;
        data.positions[self.data_b.index].c = c_b;
        data.positions[self.data_b.index].a = a_b;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
