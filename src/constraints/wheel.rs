use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::{BodyHandle, LINEAR_SLOP};
use crate::math::{Rot, Vec2};
use std::any::Any;
use std::f32::consts::PI;

/// A wheel joint: a point-on-axis constraint with suspension
///
/// The wheel body slides along an axis fixed to the chassis, carried
/// by a damped spring, while rotating freely or driven by a motor.
pub struct WheelJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    collide_connected: bool,

    local_anchor_a: Vec2,
    local_anchor_b: Vec2,

    /// Suspension axis relative to body A
    local_axis_a: Vec2,
    local_perp_a: Vec2,

    /// Suspension frequency in hertz
    frequency: f32,
    damping_ratio: f32,

    impulse: f32,
    motor_impulse: f32,
    spring_impulse: f32,

    motor_enabled: bool,
    max_motor_torque: f32,
    motor_speed: f32,

    // Solver state
    data_a: JointBodyData,
    data_b: JointBodyData,
    ax: Vec2,
    ay: Vec2,
    s_ax: f32,
    s_bx: f32,
    s_ay: f32,
    s_by: f32,
    mass: f32,
    motor_mass: f32,
    spring_mass: f32,
    bias: f32,
    gamma: f32,
}

impl WheelJoint {
    /// Creates a wheel joint through a world anchor along a world axis
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        world_anchor: Vec2,
        world_axis: Vec2,
    ) -> Self {
        let (local_anchor_a, local_anchor_b, local_axis_a) =
            match (bodies.get(body_a), bodies.get(body_b)) {
                (Some(a), Some(b)) => (
                    a.local_point(world_anchor),
                    b.local_point(world_anchor),
                    a.local_vector(world_axis.normalize()),
                ),
                _ => (Vec2::zero(), Vec2::zero(), Vec2::unit_y()),
            };

        Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a,
            local_anchor_b,
            local_axis_a,
            local_perp_a: local_axis_a.perpendicular(),
            frequency: 2.0,
            damping_ratio: 0.7,
            impulse: 0.0,
            motor_impulse: 0.0,
            spring_impulse: 0.0,
            motor_enabled: false,
            max_motor_torque: 0.0,
            motor_speed: 0.0,
            data_a: JointBodyData::default(),
            data_b: JointBodyData::default(),
            ax: Vec2::zero(),
            ay: Vec2::zero(),
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
        }
    }

    /// Tunes the suspension spring
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Self {
        self.frequency = frequency;
        self.damping_ratio = damping_ratio;
        self
    }

    /// Returns the suspension frequency in hertz
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Returns the suspension damping ratio
    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }

    /// Enables the wheel motor with a target speed and torque budget
    pub fn enable_motor(&mut self, speed: f32, max_torque: f32) {
        self.motor_enabled = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque.max(0.0);
    }

    /// Disables the wheel motor
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

    /// Returns the current translation along the suspension axis
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
}

impl Joint for WheelJoint {
    fn joint_type(&self) -> &'static str {
        "wheel"
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
        (self.ay * self.impulse + self.ax * self.spring_impulse) * inv_dt
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
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
        let d = c_b + r_b - c_a - r_a;

        // Point-on-line constraint.
        self.ay = q_a.rotate(self.local_perp_a);
        self.s_ay = (d + r_a).cross(&self.ay);
        self.s_by = r_b.cross(&self.ay);

        self.mass = m_a + m_b + i_a * self.s_ay * self.s_ay + i_b * self.s_by * self.s_by;
        if self.mass > 0.0 {
            self.mass = 1.0 / self.mass;
        }

        // Suspension spring.
        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;

        if self.frequency > 0.0 {
            self.ax = q_a.rotate(self.local_axis_a);
            self.s_ax = (d + r_a).cross(&self.ax);
            self.s_bx = r_b.cross(&self.ax);

            let inv_mass = m_a + m_b + i_a * self.s_ax * self.s_ax + i_b * self.s_bx * self.s_bx;
            if inv_mass > 0.0 {
                self.spring_mass = 1.0 / inv_mass;

                let c = d.dot(&self.ax);
                let omega = 2.0 * PI * self.frequency;
                let damp = 2.0 * self.spring_mass * self.damping_ratio * omega;
                let k = self.spring_mass * omega * omega;

                let h = data.step.dt;
                self.gamma = h * (damp + h * k);
                if self.gamma > 0.0 {
                    self.gamma = 1.0 / self.gamma;
                }
                self.bias = c * h * k * self.gamma;

                self.spring_mass = inv_mass + self.gamma;
                if self.spring_mass > 0.0 {
                    self.spring_mass = 1.0 / self.spring_mass;
                }
            }
        } else {
            self.spring_impulse = 0.0;
        }

        // Rotational motor.
        if self.motor_enabled {
            self.motor_mass = i_a + i_b;
            if self.motor_mass > 0.0 {
                self.motor_mass = 1.0 / self.motor_mass;
            }
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if data.step.do_warm_start {
            self.impulse *= data.step.dt_ratio;
            self.spring_impulse *= data.step.dt_ratio;
            self.motor_impulse *= data.step.dt_ratio;

            let p = self.ay * self.impulse + self.ax * self.spring_impulse;
            let l_a = self.impulse * self.s_ay + self.spring_impulse * self.s_ax + self.motor_impulse;
            let l_b = self.impulse * self.s_by + self.spring_impulse * self.s_bx + self.motor_impulse;

            let va = &mut data.velocities[self.data_a.index];
            va.v -= p * m_a;
            va.w -= i_a * l_a;
            let vb = &mut data.velocities[self.data_b.index];
            vb.v += p * m_b;
            vb.w += i_b * l_b;
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
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

        // Suspension spring along the axis.
        {
            let cdot = self.ax.dot(&(v_b - v_a)) + self.s_bx * w_b - self.s_ax * w_a;
            let impulse =
                -self.spring_mass * (cdot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;

            let p = self.ax * impulse;
            v_a -= p * m_a;
            w_a -= i_a * impulse * self.s_ax;
            v_b += p * m_b;
            w_b += i_b * impulse * self.s_bx;
        }

        // Wheel motor.
        {
            let cdot = w_b - w_a - self.motor_speed;
            let impulse = -self.motor_mass * cdot;

            let old_impulse = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_torque;
            self.motor_impulse =
                crate::math::clamp(old_impulse + impulse, -max_impulse, max_impulse);
            let impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Point-on-line lock.
        {
            let cdot = self.ay.dot(&(v_b - v_a)) + self.s_by * w_b - self.s_ay * w_a;
            let impulse = -self.mass * cdot;
            self.impulse += impulse;

            let p = self.ay * impulse;
            v_a -= p * m_a;
            w_a -= i_a * impulse * self.s_ay;
            v_b += p * m_b;
            w_b += i_b * impulse * self.s_by;
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

        let r_a = q_a.rotate(self.local_anchor_a - self.data_a.local_center);
        let r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);
        let d = c_b + r_b - c_a - r_a;

        let ay = q_a.rotate(self.local_perp_a);
        let s_ay = (d + r_a).cross(&ay);
        let s_by = r_b.cross(&ay);

        let c = d.dot(&ay);

        let k = self.data_a.inv_mass
            + self.data_b.inv_mass
            + self.data_a.inv_i * s_ay * s_ay
            + self.data_b.inv_i * s_by * s_by;

        let impulse = if k != 0.0 { -c / k } else { 0.0 };
        let p = ay * impulse;

        c_a -= p * self.data_a.inv_mass;
        a_a -= self.data_a.inv_i * impulse * s_ay;
        c_b += p * self.data_b.inv_mass;
        a_b += self.data_b.inv_i * impulse * s_by;

        data.positions[self.data_a.index].c = c_a;
        data.positions[self.data_a.index].a = a_a;
        data.positions[self.data_b.index].c = c_b;
        data.positions[self.data_b.index].a = a_b;

        c.abs() <= LINEAR_SLOP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
