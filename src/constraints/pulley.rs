use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::{BodyHandle, LINEAR_SLOP};
use crate::math::{Rot, Vec2};
use std::any::Any;

/// A pulley joint connecting two bodies through an idealized rope over
/// two ground anchors
///
/// The constraint keeps `length_a + ratio * length_b` constant, so one
/// side rises as the other falls. A ratio other than one turns the
/// pulley into a block and tackle.
pub struct PulleyJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,

    ground_anchor_a: Vec2,
    ground_anchor_b: Vec2,
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,

    length_a: f32,
    length_b: f32,
    ratio: f32,
    constant: f32,

    impulse: f32,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    u_a: Vec2,
    u_b: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f32,
}

impl PulleyJoint {
    /// Creates a pulley joint from world-space ground and body anchors
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        ground_anchor_a: Vec2,
        ground_anchor_b: Vec2,
        world_anchor_a: Vec2,
        world_anchor_b: Vec2,
        ratio: f32,
    ) -> Self {
        debug_assert!(ratio > crate::math::EPSILON);

        let (local_anchor_a, local_anchor_b) = match (bodies.get(body_a), bodies.get(body_b)) {
            (Some(a), Some(b)) => (a.local_point(world_anchor_a), b.local_point(world_anchor_b)),
            _ => (Vec2::zero(), Vec2::zero()),
        };

        let length_a = (world_anchor_a - ground_anchor_a).length();
        let length_b = (world_anchor_b - ground_anchor_b).length();

        Self {
            body_a,
            body_b,
            ground_anchor_a,
            ground_anchor_b,
            local_anchor_a,
            local_anchor_b,
            length_a,
            length_b,
            ratio,
            constant: length_a + ratio * length_b,
            impulse: 0.0,
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            u_a: Vec2::zero(),
            u_b: Vec2::zero(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            mass: 0.0,
        }
    }

    /// Returns the ground anchor on side A
    pub fn ground_anchor_a(&self) -> Vec2 {
        self.ground_anchor_a
    }

    /// Returns the ground anchor on side B
    pub fn ground_anchor_b(&self) -> Vec2 {
        self.ground_anchor_b
    }

    /// Returns the pulley ratio
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Returns the current rope length on side A
    pub fn current_length_a(&self, bodies: &BodyStorage<Body>) -> f32 {
        bodies
            .get(self.body_a)
            .map(|b| (b.world_point(self.local_anchor_a) - self.ground_anchor_a).length())
            .unwrap_or(self.length_a)
    }

    /// Returns the current rope length on side B
    pub fn current_length_b(&self, bodies: &BodyStorage<Body>) -> f32 {
        bodies
            .get(self.body_b)
            .map(|b| (b.world_point(self.local_anchor_b) - self.ground_anchor_b).length())
            .unwrap_or(self.length_b)
    }
}

impl Joint for PulleyJoint {
    fn joint_type(&self) -> &'static str {
        "pulley"
    }

    fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    fn collide_connected(&self) -> bool {
        true
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
        self.u_b * (inv_dt * self.impulse)
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

        self.u_a = c_a + self.r_a - self.ground_anchor_a;
        self.u_b = c_b + self.r_b - self.ground_anchor_b;

        let length_a = self.u_a.length();
        let length_b = self.u_b.length();

        if length_a > 10.0 * LINEAR_SLOP {
            self.u_a /= length_a;
        } else {
            self.u_a = Vec2::zero();
        }
        if length_b > 10.0 * LINEAR_SLOP {
            self.u_b /= length_b;
        } else {
            self.u_b = Vec2::zero();
        }

        let ru_a = self.r_a.cross(&self.u_a);
        let ru_b = self.r_b.cross(&self.u_b);

        let mass_a = self.data_a.inv_mass + self.data_a.inv_i * ru_a * ru_a;
        let mass_b = self.data_b.inv_mass + self.data_b.inv_i * ru_b * ru_b;

        self.mass = mass_a + self.ratio * self.ratio * mass_b;
        if self.mass > 0.0 {
            self.mass = 1.0 / self.mass;
        }

        if data.step.do_warm_start {
            self.impulse *= data.step.dt_ratio;

            let p_a = self.u_a * -self.impulse;
            let p_b = self.u_b * (-self.ratio * self.impulse);

            let va = &mut data.velocities[self.data_a.index];
            va.v += p_a * self.data_a.inv_mass;
            va.w += self.data_a.inv_i * self.r_a.cross(&p_a);
            let vb = &mut data.velocities[self.data_b.index];
            vb.v += p_b * self.data_b.inv_mass;
            vb.w += self.data_b.inv_i * self.r_b.cross(&p_b);
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

        let cdot = -self.u_a.dot(&vp_a) - self.ratio * self.u_b.dot(&vp_b);
        let impulse = -self.mass * cdot;
        self.impulse += impulse;

        let p_a = self.u_a * -impulse;
        let p_b = self.u_b * (-self.ratio * impulse);

        v_a += p_a * self.data_a.inv_mass;
        w_a += self.data_a.inv_i * self.r_a.cross(&p_a);
        v_b += p_b * self.data_b.inv_mass;
        w_b += self.data_b.inv_i * self.r_b.cross(&p_b);

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

        let mut u_a = c_a + r_a - self.ground_anchor_a;
        let mut u_b = c_b + r_b - self.ground_anchor_b;

        let length_a = u_a.length();
        let length_b = u_b.length();

        if length_a > 10.0 * LINEAR_SLOP {
            u_a /= length_a;
        } else {
            u_a = Vec2::zero();
        }
        if length_b > 10.0 * LINEAR_SLOP {
            u_b /= length_b;
        } else {
            u_b = Vec2::zero();
        }

        let ru_a = r_a.cross(&u_a);
        let ru_b = r_b.cross(&u_b);

        let mass_a = self.data_a.inv_mass + self.data_a.inv_i * ru_a * ru_a;
        let mass_b = self.data_b.inv_mass + self.data_b.inv_i * ru_b * ru_b;

        let mut mass = mass_a + self.ratio * self.ratio * mass_b;
        if mass > 0.0 {
            mass = 1.0 / mass;
        }

        let c = self.constant - length_a - self.ratio * length_b;
        let linear_error = c.abs();

        let impulse = -mass * c;

        let p_a = u_a * -impulse;
        let p_b = u_b * (-self.ratio * impulse);

        c_a += p_a * self.data_a.inv_mass;
        a_a += self.data_a.inv_i * r_a.cross(&p_a);
        c_b += p_b * self.data_b.inv_mass;
        a_b += self.data_b.inv_i * r_b.cross(&p_b);

        data.positions[self.data_a.index].c = c_a;
        data.positions[self.data_a.index].a = a_a;
        data.positions[self.data_b.index].c = c_b;
        data.positions[self.data_b.index].a = a_b;

        linear_error < LINEAR_SLOP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
