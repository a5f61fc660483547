use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, LimitState, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::{BodyHandle, LINEAR_SLOP};
use crate::math::{Rot, Vec2};
use std::any::Any;

/// A rope joint capping the distance between two anchor points
///
/// The rope is slack below the maximum length and pulls like an
/// inextensible cable at it.
pub struct RopeJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    collide_connected: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,

    /// Maximum separation of the anchors
    max_length: f32,

    impulse: f32,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    length: f32,
    mass: f32,
    state: LimitState,
}

impl RopeJoint {
    /// Creates a rope joint with the given local anchors and maximum
    /// length
    pub fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        max_length: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a,
            local_anchor_b,
            max_length,
            impulse: 0.0,
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            u: Vec2::zero(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            length: 0.0,
            mass: 0.0,
            state: LimitState::Inactive,
        }
    }

    /// Allows the attached bodies to collide with each other
    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    /// Returns the maximum length
    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    /// Sets the maximum length
    pub fn set_max_length(&mut self, length: f32) {
        self.max_length = length;
    }

    /// Returns whether the rope is currently taut
    pub fn is_taut(&self) -> bool {
        self.state == LimitState::AtUpper
    }
}

impl Joint for RopeJoint {
    fn joint_type(&self) -> &'static str {
        "rope"
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
        self.u * (inv_dt * self.impulse)
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
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

        self.r_a = q_a.rotate(self.local_anchor_a - self.data_a.local_center);
        self.r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);
        self.u = c_b + self.r_b - c_a - self.r_a;

        self.length = self.u.length();

        self.state = if self.length - self.max_length > 0.0 {
            LimitState::AtUpper
        } else {
            LimitState::Inactive
        };

        if self.length > LINEAR_SLOP {
            self.u /= self.length;
        } else {
            self.u = Vec2::zero();
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = self.r_a.cross(&self.u);
        let cr_b = self.r_b.cross(&self.u);
        let inv_mass = self.data_a.inv_mass
            + self.data_b.inv_mass
            + self.data_a.inv_i * cr_a * cr_a
            + self.data_b.inv_i * cr_b * cr_b;

        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if data.step.do_warm_start {
            self.impulse *= data.step.dt_ratio;

            let p = self.u * self.impulse;
            let va = &mut data.velocities[self.data_a.index];
            va.v -= p * self.data_a.inv_mass;
            va.w -= self.data_a.inv_i * self.r_a.cross(&p);
            let vb = &mut data.velocities[self.data_b.index];
            vb.v += p * self.data_b.inv_mass;
            vb.w += self.data_b.inv_i * self.r_b.cross(&p);
        } else {
            self.impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let mut v_a = data.velocities[self.data_a.index].v;
        let mut w_a = data.velocities[self.data_a.index].w;
        let mut v_b = data.velocities[self.data_b.index].v;
        let mut w_b = data.velocities[self.data_b.index].w;

        let vp_a = v_a + Vec2::scalar_cross(w_a, self.r_a);
        let vp_b = v_b + Vec2::scalar_cross(w_b, self.r_b);
        let c = self.length - self.max_length;
        let mut cdot = self.u.dot(&(vp_b - vp_a));

        // Predictively stiffen when the rope is about to go taut.
        if c < 0.0 {
            cdot += data.step.inv_dt() * c;
        }

        let impulse = -self.mass * cdot;
        let old_impulse = self.impulse;
        self.impulse = (old_impulse + impulse).min(0.0);
        let impulse = self.impulse - old_impulse;

        let p = self.u * impulse;
        v_a -= p * self.data_a.inv_mass;
        w_a -= self.data_a.inv_i * self.r_a.cross(&p);
        v_b += p * self.data_b.inv_mass;
        w_b += self.data_b.inv_i * self.r_b.cross(&p);

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

        let r_a = q_a.rotate(self.local_anchor_a - self.data_a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);
        let mut u = c_b + r_b - c_a - r_a;

        let length = u.normalize_mut();
        let c = crate::math::clamp(length - self.max_length, 0.0, data.step.max_linear_correction);

        let impulse = -self.mass * c;
        let p = u * impulse;

        c_a -= p * self.data_a.inv_mass;
        a_a -= self.data_a.inv_i * r_a.cross(&p);
        c_b += p * self.data_b.inv_mass;
        a_b += self.data_b.inv_i * r_b.cross(&p);

        data.positions[self.data_a.index].c = c_a;
        data.positions[self.data_a.index].a = a_a;
        data.positions[self.data_b.index].c = c_b;
        data.positions[self.data_b.index].a = a_b;

        length - self.max_length < LINEAR_SLOP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
