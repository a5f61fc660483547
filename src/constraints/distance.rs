use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::{BodyHandle, LINEAR_SLOP};
use crate::math::{Rot, Vec2};
use std::any::Any;
use std::f32::consts::PI;

/// A distance joint holding two anchor points a fixed length apart
///
/// With a non-zero frequency the rod becomes a damped spring.
pub struct DistanceJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    collide_connected: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,

    /// Rest length between the anchors
    length: f32,

    /// Spring frequency in hertz; zero makes the joint rigid
    frequency: f32,

    /// Spring damping ratio
    damping_ratio: f32,

    impulse: f32,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f32,
    gamma: f32,
    bias: f32,
}

impl DistanceJoint {
    /// Creates a distance joint between two world anchor points
    ///
    /// The rest length is the current distance between the anchors.
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor_a: Vec2,
        world_anchor_b: Vec2,
    ) -> Self {
        let (local_anchor_a, local_anchor_b) = match (bodies.get(body_a), bodies.get(body_b)) {
            (Some(a), Some(b)) => (a.local_point(world_anchor_a), b.local_point(world_anchor_b)),
            _ => (Vec2::zero(), Vec2::zero()),
        };

        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a,
            local_anchor_b,
            length: (world_anchor_b - world_anchor_a).length().max(LINEAR_SLOP),
            frequency: 0.0,
            damping_ratio: 0.0,
            impulse: 0.0,
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            u: Vec2::zero(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            mass: 0.0,
            gamma: 0.0,
            bias: 0.0,
        }
    }

    /// Allows the attached bodies to collide with each other
    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    /// Makes the joint springy with the given frequency and damping
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Self {
        self.frequency = frequency;
        self.damping_ratio = damping_ratio;
        self
    }

    /// Returns the rest length
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Sets the rest length
    pub fn set_length(&mut self, length: f32) {
        self.length = length.max(LINEAR_SLOP);
    }

    /// Returns the spring frequency in hertz
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Returns the spring damping ratio
    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }
}

impl Joint for DistanceJoint {
    fn joint_type(&self) -> &'static str {
        "distance"
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

        let length = self.u.normalize_mut();
        if length <= LINEAR_SLOP {
            self.u = Vec2::zero();
        }

        let cr_au = self.r_a.cross(&self.u);
        let cr_bu = self.r_b.cross(&self.u);
        let mut inv_mass = self.data_a.inv_mass
            + self.data_b.inv_mass
            + self.data_a.inv_i * cr_au * cr_au
            + self.data_b.inv_i * cr_bu * cr_bu;

        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.frequency > 0.0 {
            let c = length - self.length;

            let omega = 2.0 * PI * self.frequency;
            let d = 2.0 * self.mass * self.damping_ratio * omega;
            let k = self.mass * omega * omega;

            // Soften the constraint rather than solving it exactly.
            let h = data.step.dt;
            self.gamma = h * (d + h * k);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * k * self.gamma;

            inv_mass += self.gamma;
            self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }

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
        let cdot = self.u.dot(&(vp_b - vp_a));

        let impulse = -self.mass * (cdot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

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
        if self.frequency > 0.0 {
            // Springs stretch; there is no position error to fix.
            return true;
        }

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
        let c = crate::math::clamp(
            length - self.length,
            -data.step.max_linear_correction,
            data.step.max_linear_correction,
        );

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

        c.abs() < LINEAR_SLOP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
