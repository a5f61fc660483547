use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, LimitState, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::{BodyHandle, ANGULAR_SLOP, LINEAR_SLOP};
use crate::math::{Mat33, Rot, Vec2, Vec3};
use std::any::Any;

/// A prismatic joint constraining two bodies to slide along an axis
///
/// Relative rotation is locked; translation along the axis may be
/// limited or driven by a motor.
pub struct PrismaticJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    collide_connected: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,

    /// Slide axis relative to body A
    local_axis_a: Vec2,

    /// Perpendicular of the slide axis, used by the lock constraint
    local_perp_a: Vec2,

    reference_angle: f32,

    /// Accumulated impulses: perpendicular (x), angular (y), axial (z)
    impulse: Vec3,
    motor_impulse: f32,

    motor_enabled: bool,
    max_motor_force: f32,
    motor_speed: f32,

    limit_enabled: bool,
    lower_translation: f32,
    upper_translation: f32,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    k: Mat33,
    motor_mass: f32,
    limit_state: LimitState,
}

impl PrismaticJoint {
    /// Creates a prismatic joint through a world anchor along a world
    /// axis
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor: Vec2,
        world_axis: Vec2,
    ) -> Self {
        let (local_anchor_a, local_anchor_b, local_axis_a, reference_angle) =
            match (bodies.get(body_a), bodies.get(body_b)) {
                (Some(a), Some(b)) => (
                    a.local_point(world_anchor),
                    b.local_point(world_anchor),
                    a.local_vector(world_axis.normalize()),
                    b.angle() - a.angle(),
                ),
                _ => (Vec2::zero(), Vec2::zero(), Vec2::unit_x(), 0.0),
            };

        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a,
            local_anchor_b,
            local_axis_a,
            local_perp_a: local_axis_a.perpendicular(),
            reference_angle,
            impulse: Vec3::zero(),
            motor_impulse: 0.0,
            motor_enabled: false,
            max_motor_force: 0.0,
            motor_speed: 0.0,
            limit_enabled: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            axis: Vec2::zero(),
            perp: Vec2::zero(),
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat33::zero(),
            motor_mass: 0.0,
            limit_state: LimitState::Inactive,
        }
    }

    /// Allows the attached bodies to collide with each other
    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    /// Returns the current translation along the joint axis
    pub fn joint_translation(&self, bodies: &BodyStorage<Body>) -> f32 {
        match (bodies.get(self.body_a), bodies.get(self.body_b)) {
            (Some(a), Some(b)) => {
                let p_a = a.world_point(self.local_anchor_a);
                let p_b = b.world_point(self.local_anchor_b);
                let axis = a.world_vector(self.local_axis_a);
                (p_b - p_a).dot(&axis)
            }
            _ => 0.0,
        }
    }

    /// Enables the translation limit with the given bounds
    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        debug_assert!(lower <= upper);
        if lower != self.lower_translation || upper != self.upper_translation {
            self.impulse.z = 0.0;
            self.lower_translation = lower;
            self.upper_translation = upper;
        }
        self.limit_enabled = true;
    }

    /// Enables or disables the translation limit
    pub fn enable_limit(&mut self, enabled: bool) {
        if enabled != self.limit_enabled {
            self.impulse.z = 0.0;
        }
        self.limit_enabled = enabled;
    }

    /// Returns whether the translation limit is enabled
    pub fn is_limit_enabled(&self) -> bool {
        self.limit_enabled
    }

    /// Returns the lower translation limit
    pub fn lower_limit(&self) -> f32 {
        self.lower_translation
    }

    /// Returns the upper translation limit
    pub fn upper_limit(&self) -> f32 {
        self.upper_translation
    }

    /// Enables the motor with a target speed and force budget
    pub fn enable_motor(&mut self, speed: f32, max_force: f32) {
        self.motor_enabled = true;
        self.motor_speed = speed;
        self.max_motor_force = max_force.max(0.0);
    }

    /// Disables the motor
    pub fn disable_motor(&mut self) {
        self.motor_enabled = false;
    }

    /// Returns whether the motor is enabled
    pub fn is_motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    /// Returns the motor force applied over the last step
    pub fn motor_force(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    /// Returns the anchor relative to body A's origin
    pub fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    /// Returns the anchor relative to body B's origin
    pub fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }

    /// Returns the slide axis relative to body A
    pub fn local_axis_a(&self) -> Vec2 {
        self.local_axis_a
    }

    /// Returns the reference angle captured at creation
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }
}

impl Joint for PrismaticJoint {
    fn joint_type(&self) -> &'static str {
        "prismatic"
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
        bodies
            .get(self.body_a)
            .map(|b| b.world_point(self.local_anchor_a))
            .unwrap_or(self.local_anchor_a)
    }

    fn anchor_b(&self, bodies: &BodyStorage<Body>) -> Vec2 {
        bodies
            .get(self.body_b)
            .map(|b| b.world_point(self.local_anchor_b))
            .unwrap_or(self.local_anchor_b)
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (self.perp * self.impulse.x + self.axis * (self.motor_impulse + self.impulse.z)) * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.y
    }

    fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &BodyStorage<Body>) {
        self.data_a = JointBodyData::from_body(bodies, self.body_a);
        self.data_b = JointBodyData::from_body(bodies, self.body_b);

        let c_a = data.positions[self.data_a.index].c;
        let a_a = data.positions[self.data_a.index].a;
        let c_b = data.positions[self.data_b.index].c;
        let a_b = data.positions[self.data_b.index].a;

        let q_a = Rot::from_angle(a_a);
        let q_b = Rot::from_angle(a_b);

        let m_a = self.data_a.inv_mass;
        let m_b = self.data_b.inv_mass;
        let i_a = self.data_a.inv_i;
        let i_b = self.data_b.inv_i;

        let r_a = q_a.rotate(self.local_anchor_a - self.data_a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);
        let d = c_b - c_a + r_b - r_a;

        // Axial motor and limit terms.
        self.axis = q_a.rotate(self.local_axis_a);
        self.a1 = (d + r_a).cross(&self.axis);
        self.a2 = r_b.cross(&self.axis);

        self.motor_mass = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;
        if self.motor_mass > 0.0 {
            self.motor_mass = 1.0 / self.motor_mass;
        }

        // Perpendicular and angular lock terms.
        self.perp = q_a.rotate(self.local_perp_a);
        self.s1 = (d + r_a).cross(&self.perp);
        self.s2 = r_b.cross(&self.perp);

        let k11 = m_a + m_b + i_a * self.s1 * self.s1 + i_b * self.s2 * self.s2;
        let k12 = i_a * self.s1 + i_b * self.s2;
        let k13 = i_a * self.s1 * self.a1 + i_b * self.s2 * self.a2;
        let mut k22 = i_a + i_b;
        if k22 == 0.0 {
            // Both bodies have fixed rotation; the angular row must
            // stay invertible.
            k22 = 1.0;
        }
        let k23 = i_a * self.a1 + i_b * self.a2;
        let k33 = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;

        self.k.ex = Vec3::new(k11, k12, k13);
        self.k.ey = Vec3::new(k12, k22, k23);
        self.k.ez = Vec3::new(k13, k23, k33);

        if self.limit_enabled {
            let joint_translation = self.axis.dot(&d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_translation <= self.lower_translation {
                if self.limit_state != LimitState::AtLower {
                    self.limit_state = LimitState::AtLower;
                    self.impulse.z = 0.0;
                }
            } else if joint_translation >= self.upper_translation {
                if self.limit_state != LimitState::AtUpper {
                    self.limit_state = LimitState::AtUpper;
                    self.impulse.z = 0.0;
                }
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
            self.impulse.z = 0.0;
        }

        if !self.motor_enabled {
            self.motor_impulse = 0.0;
        }

        if data.step.do_warm_start {
            self.impulse = self.impulse * data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;

            let p = self.perp * self.impulse.x + self.axis * (self.motor_impulse + self.impulse.z);
            let l_a = self.impulse.x * self.s1
                + self.impulse.y
                + (self.motor_impulse + self.impulse.z) * self.a1;
            let l_b = self.impulse.x * self.s2
                + self.impulse.y
                + (self.motor_impulse + self.impulse.z) * self.a2;

            let va = &mut data.velocities[self.data_a.index];
            va.v -= p * m_a;
            va.w -= i_a * l_a;

            let vb = &mut data.velocities[self.data_b.index];
            vb.v += p * m_b;
            vb.w += i_b * l_b;
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

        // Motor force along the axis.
        if self.motor_enabled && self.limit_state != LimitState::Equal {
            let cdot = self.axis.dot(&(v_b - v_a)) + self.a2 * w_b - self.a1 * w_a;
            let impulse = self.motor_mass * (self.motor_speed - cdot);
            let old_impulse = self.motor_impulse;
            let max_impulse = self.max_motor_force * data.step.dt;
            self.motor_impulse =
                crate::math::clamp(old_impulse + impulse, -max_impulse, max_impulse);
            let impulse = self.motor_impulse - old_impulse;

            let p = self.axis * impulse;
            v_a -= p * m_a;
            w_a -= i_a * impulse * self.a1;
            v_b += p * m_b;
            w_b += i_b * impulse * self.a2;
        }

        let cdot1 = Vec2::new(
            self.perp.dot(&(v_b - v_a)) + self.s2 * w_b - self.s1 * w_a,
            w_b - w_a,
        );

        if self.limit_enabled && self.limit_state != LimitState::Inactive {
            // Solve the lock rows and the limit row together.
            let cdot2 = self.axis.dot(&(v_b - v_a)) + self.a2 * w_b - self.a1 * w_a;
            let cdot = Vec3::new(cdot1.x, cdot1.y, cdot2);

            let f1 = self.impulse;
            let df = -self.k.solve33(cdot);
            self.impulse += df;

            match self.limit_state {
                LimitState::AtLower => self.impulse.z = self.impulse.z.max(0.0),
                LimitState::AtUpper => self.impulse.z = self.impulse.z.min(0.0),
                _ => {}
            }

            // Re-solve the lock rows with the clamped axial impulse
            // substituted back in.
            let b = -cdot1
                - Vec2::new(self.k.ez.x, self.k.ez.y) * (self.impulse.z - f1.z);
            let f2r = self.k.solve22(b) + Vec2::new(f1.x, f1.y);
            self.impulse.x = f2r.x;
            self.impulse.y = f2r.y;

            let df = self.impulse - f1;

            let p = self.perp * df.x + self.axis * df.z;
            let l_a = df.x * self.s1 + df.y + df.z * self.a1;
            let l_b = df.x * self.s2 + df.y + df.z * self.a2;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
        } else {
            let df = self.k.solve22(-cdot1);
            self.impulse.x += df.x;
            self.impulse.y += df.y;

            let p = self.perp * df.x;
            let l_a = df.x * self.s1 + df.y;
            let l_b = df.x * self.s2 + df.y;

            v_a -= p * m_a;
            w_a -= i_a * l_a;
            v_b += p * m_b;
            w_b += i_b * l_b;
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

        let q_a = Rot::from_angle(a_a);
        let q_b = Rot::from_angle(a_b);

        let m_a = self.data_a.inv_mass;
        let m_b = self.data_b.inv_mass;
        let i_a = self.data_a.inv_i;
        let i_b = self.data_b.inv_i;

        let r_a = q_a.rotate(self.local_anchor_a - self.data_a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);
        let d = c_b + r_b - c_a - r_a;

        let axis = q_a.rotate(self.local_axis_a);
        let a1 = (d + r_a).cross(&axis);
        let a2 = r_b.cross(&axis);
        let perp = q_a.rotate(self.local_perp_a);
        let s1 = (d + r_a).cross(&perp);
        let s2 = r_b.cross(&perp);

        let c1 = Vec2::new(perp.dot(&d), a_b - a_a - self.reference_angle);
        let mut linear_error = c1.x.abs();
        let angular_error = c1.y.abs();

        let mut active = false;
        let mut c2 = 0.0;
        if self.limit_enabled {
            let translation = axis.dot(&d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                c2 = crate::math::clamp(
                    translation,
                    -data.step.max_linear_correction,
                    data.step.max_linear_correction,
                );
                linear_error = linear_error.max(translation.abs());
                active = true;
            } else if translation <= self.lower_translation {
                c2 = crate::math::clamp(
                    translation - self.lower_translation + LINEAR_SLOP,
                    -data.step.max_linear_correction,
                    0.0,
                );
                linear_error = linear_error.max(self.lower_translation - translation);
                active = true;
            } else if translation >= self.upper_translation {
                c2 = crate::math::clamp(
                    translation - self.upper_translation - LINEAR_SLOP,
                    0.0,
                    data.step.max_linear_correction,
                );
                linear_error = linear_error.max(translation - self.upper_translation);
                active = true;
            }
        }

        let impulse = if active {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let k13 = i_a * s1 * a1 + i_b * s2 * a2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }
            let k23 = i_a * a1 + i_b * a2;
            let k33 = m_a + m_b + i_a * a1 * a1 + i_b * a2 * a2;

            let k = Mat33::new(
                Vec3::new(k11, k12, k13),
                Vec3::new(k12, k22, k23),
                Vec3::new(k13, k23, k33),
            );

            k.solve33(-Vec3::new(c1.x, c1.y, c2))
        } else {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }

            let k = crate::math::Mat22::from_entries(k11, k12, k12, k22);
            let impulse1 = k.solve(-c1);
            Vec3::new(impulse1.x, impulse1.y, 0.0)
        };

        let p = perp * impulse.x + axis * impulse.z;
        let l_a = impulse.x * s1 + impulse.y + impulse.z * a1;
        let l_b = impulse.x * s2 + impulse.y + impulse.z * a2;

        c_a -= p * m_a;
        a_a -= i_a * l_a;
        c_b += p * m_b;
        a_b += i_b * l_b;

        data.positions[self.data_a.index].c = c_a;
        data.positions[self.data_a.index].a = a_a;
        data.positions[self.data_b.index].c = c_b;
        data.positions[self.data_b.index].a = a_b;

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
