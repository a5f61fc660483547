use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::BodyHandle;
use crate::math::{Mat22, Rot, Vec2};
use std::any::Any;

/// A friction joint damping all relative motion between two bodies
///
/// Applies force and torque against relative translation and rotation,
/// capped by the configured maxima. Useful for top-down games where
/// surface friction has no gravity to work with.
pub struct FrictionJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    collide_connected: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,

    max_force: f32,
    max_torque: f32,

    linear_impulse: Vec2,
    angular_impulse: f32,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    r_a: Vec2,
    r_b: Vec2,
    linear_mass: Mat22,
    angular_mass: f32,
}

impl FrictionJoint {
    /// Creates a friction joint anchored at a world point
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor: Vec2,
    ) -> Self {
        let (local_anchor_a, local_anchor_b) = match (bodies.get(body_a), bodies.get(body_b)) {
            (Some(a), Some(b)) => (a.local_point(world_anchor), b.local_point(world_anchor)),
            _ => (Vec2::zero(), Vec2::zero()),
        };

        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a,
            local_anchor_b,
            max_force: 0.0,
            max_torque: 0.0,
            linear_impulse: Vec2::zero(),
            angular_impulse: 0.0,
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            linear_mass: Mat22::zero(),
            angular_mass: 0.0,
        }
    }

    /// Sets the maximum friction force
    pub fn set_max_force(&mut self, force: f32) {
        debug_assert!(force >= 0.0);
        self.max_force = force;
    }

    /// Returns the maximum friction force
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Sets the maximum friction torque
    pub fn set_max_torque(&mut self, torque: f32) {
        debug_assert!(torque >= 0.0);
        self.max_torque = torque;
    }

    /// Returns the maximum friction torque
    pub fn max_torque(&self) -> f32 {
        self.max_torque
    }
}

impl Joint for FrictionJoint {
    fn joint_type(&self) -> &'static str {
        "friction"
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
        self.linear_impulse * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.angular_impulse
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

        let k = Mat22::from_entries(
            m_a + m_b + i_a * self.r_a.y * self.r_a.y + i_b * self.r_b.y * self.r_b.y,
            -i_a * self.r_a.x * self.r_a.y - i_b * self.r_b.x * self.r_b.y,
            -i_a * self.r_a.x * self.r_a.y - i_b * self.r_b.x * self.r_b.y,
            m_a + m_b + i_a * self.r_a.x * self.r_a.x + i_b * self.r_b.x * self.r_b.x,
        );
        self.linear_mass = k.inverse();

        self.angular_mass = i_a + i_b;
        if self.angular_mass > 0.0 {
            self.angular_mass = 1.0 / self.angular_mass;
        }

        if data.step.do_warm_start {
            self.linear_impulse *= data.step.dt_ratio;
            self.angular_impulse *= data.step.dt_ratio;

            let p = self.linear_impulse;
            let va = &mut data.velocities[self.data_a.index];
            va.v -= p * m_a;
            va.w -= i_a * (self.r_a.cross(&p) + self.angular_impulse);
            let vb = &mut data.velocities[self.data_b.index];
            vb.v += p * m_b;
            vb.w += i_b * (self.r_b.cross(&p) + self.angular_impulse);
        } else {
            self.linear_impulse = Vec2::zero();
            self.angular_impulse = 0.0;
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

        let h = data.step.dt;

        // Angular friction.
        {
            let cdot = w_b - w_a;
            let impulse = -self.angular_mass * cdot;

            let old_impulse = self.angular_impulse;
            let max_impulse = h * self.max_torque;
            self.angular_impulse =
                crate::math::clamp(old_impulse + impulse, -max_impulse, max_impulse);
            let impulse = self.angular_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Linear friction.
        {
            let cdot =
                v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);

            let mut impulse = -self.linear_mass.mul_vec(cdot);
            let old_impulse = self.linear_impulse;
            self.linear_impulse += impulse;

            let max_impulse = h * self.max_force;
            if self.linear_impulse.length_squared() > max_impulse * max_impulse {
                self.linear_impulse = self.linear_impulse.normalize() * max_impulse;
            }

            impulse = self.linear_impulse - old_impulse;

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

    fn solve_position_constraints(&mut self, _data: &mut SolverData) -> bool {
        // Friction has no position target.
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
