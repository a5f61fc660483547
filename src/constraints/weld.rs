use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::{BodyHandle, ANGULAR_SLOP, LINEAR_SLOP};
use crate::math::{Mat33, Rot, Vec2, Vec3};
use std::any::Any;
use std::f32::consts::PI;

/// A weld joint locking the relative transform of two bodies
///
/// With a non-zero frequency the angular lock softens into a damped
/// torsion spring, which can be more stable than a rigid weld.
pub struct WeldJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    collide_connected: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f32,

    /// Torsion frequency in hertz; zero welds rigidly
    frequency: f32,
    damping_ratio: f32,

    impulse: Vec3,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    r_a: Vec2,
    r_b: Vec2,
    mass: Mat33,
    gamma: f32,
    bias: f32,
}

impl WeldJoint {
    /// Creates a weld joint anchored at a world point
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor: Vec2,
    ) -> Self {
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
            frequency: 0.0,
            damping_ratio: 0.0,
            impulse: Vec3::zero(),
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            mass: Mat33::zero(),
            gamma: 0.0,
            bias: 0.0,
        }
    }

    /// Softens the angular lock into a damped spring
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Self {
        self.frequency = frequency;
        self.damping_ratio = damping_ratio;
        self
    }

    /// Returns the torsion frequency in hertz
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Returns the damping ratio
    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }

    /// Returns the reference angle captured at creation
    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }
}

impl Joint for WeldJoint {
    fn joint_type(&self) -> &'static str {
        "weld"
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

        let mut k = Mat33::zero();
        k.ex.x = m_a + m_b + self.r_a.y * self.r_a.y * i_a + self.r_b.y * self.r_b.y * i_b;
        k.ey.x = -self.r_a.y * self.r_a.x * i_a - self.r_b.y * self.r_b.x * i_b;
        k.ez.x = -self.r_a.y * i_a - self.r_b.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + self.r_a.x * self.r_a.x * i_a + self.r_b.x * self.r_b.x * i_b;
        k.ez.y = self.r_a.x * i_a + self.r_b.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;

        if self.frequency > 0.0 {
            self.mass = k.symmetric_inverse22();

            let mut inv_m = i_a + i_b;
            let m = if inv_m > 0.0 { 1.0 / inv_m } else { 0.0 };

            let c = a_b - a_a - self.reference_angle;

            let omega = 2.0 * PI * self.frequency;
            let d = 2.0 * m * self.damping_ratio * omega;
            let spring_k = m * omega * omega;

            let h = data.step.dt;
            self.gamma = h * (d + h * spring_k);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * h * spring_k * self.gamma;

            inv_m += self.gamma;
            self.mass.ez.z = if inv_m != 0.0 { 1.0 / inv_m } else { 0.0 };
        } else if k.ez.z == 0.0 {
            self.mass = k.symmetric_inverse22();
            self.gamma = 0.0;
            self.bias = 0.0;
        } else {
            self.mass = k.symmetric_inverse33();
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.do_warm_start {
            self.impulse = self.impulse * data.step.dt_ratio;

            let p = Vec2::new(self.impulse.x, self.impulse.y);
            let va = &mut data.velocities[self.data_a.index];
            va.v -= p * m_a;
            va.w -= i_a * (self.r_a.cross(&p) + self.impulse.z);
            let vb = &mut data.velocities[self.data_b.index];
            vb.v += p * m_b;
            vb.w += i_b * (self.r_b.cross(&p) + self.impulse.z);
        } else {
            self.impulse = Vec3::zero();
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

        if self.frequency > 0.0 {
            let cdot2 = w_b - w_a;
            let impulse2 = -self.mass.ez.z * (cdot2 + self.bias + self.gamma * self.impulse.z);
            self.impulse.z += impulse2;

            w_a -= i_a * impulse2;
            w_b += i_b * impulse2;

            let cdot1 =
                v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);
            let impulse1 = -self.mass.mul_vec2(cdot1);
            self.impulse.x += impulse1.x;
            self.impulse.y += impulse1.y;

            v_a -= impulse1 * m_a;
            w_a -= i_a * self.r_a.cross(&impulse1);
            v_b += impulse1 * m_b;
            w_b += i_b * self.r_b.cross(&impulse1);
        } else {
            let cdot1 =
                v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);
            let cdot2 = w_b - w_a;
            let cdot = Vec3::new(cdot1.x, cdot1.y, cdot2);

            let impulse = -self.mass.mul_vec(cdot);
            self.impulse += impulse;

            let p = Vec2::new(impulse.x, impulse.y);
            v_a -= p * m_a;
            w_a -= i_a * (self.r_a.cross(&p) + impulse.z);
            v_b += p * m_b;
            w_b += i_b * (self.r_b.cross(&p) + impulse.z);
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

        let mut k = Mat33::zero();
        k.ex.x = m_a + m_b + r_a.y * r_a.y * i_a + r_b.y * r_b.y * i_b;
        k.ey.x = -r_a.y * r_a.x * i_a - r_b.y * r_b.x * i_b;
        k.ez.x = -r_a.y * i_a - r_b.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + r_a.x * r_a.x * i_a + r_b.x * r_b.x * i_b;
        k.ez.y = r_a.x * i_a + r_b.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;

        let position_error;
        let angular_error;

        if self.frequency > 0.0 {
            let c1 = c_b + r_b - c_a - r_a;
            position_error = c1.length();
            angular_error = 0.0;

            let p = -k.solve22(c1);

            c_a -= p * m_a;
            a_a -= i_a * r_a.cross(&p);
            c_b += p * m_b;
            a_b += i_b * r_b.cross(&p);
        } else {
            let c1 = c_b + r_b - c_a - r_a;
            let c2 = a_b - a_a - self.reference_angle;

            position_error = c1.length();
            angular_error = c2.abs();

            let impulse = if k.ez.z > 0.0 {
                -k.solve33(Vec3::new(c1.x, c1.y, c2))
            } else {
                let impulse2 = -k.solve22(c1);
                Vec3::new(impulse2.x, impulse2.y, 0.0)
            };

            let p = Vec2::new(impulse.x, impulse.y);

            c_a -= p * m_a;
            a_a -= i_a * (r_a.cross(&p) + impulse.z);
            c_b += p * m_b;
            a_b += i_b * (r_b.cross(&p) + impulse.z);
        }

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
