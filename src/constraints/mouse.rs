use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, SolverData};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::BodyHandle;
use crate::math::{Mat22, Rot, Vec2};
use std::any::Any;
use std::f32::consts::PI;

/// A mouse joint dragging a body toward a world-space target
///
/// The pull is a critically tunable soft constraint so the body
/// follows the cursor without snapping rigidly. Body A is only a
/// bookkeeping peer (typically the ground body); all force goes into
/// body B.
pub struct MouseJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,

    /// Grab point relative to body B's origin
    local_anchor_b: Vec2,

    /// World-space point the body is pulled toward
    target: Vec2,

    max_force: f32,
    frequency: f32,
    damping_ratio: f32,

    impulse: Vec2,

    // Solver state
    data_b: JointBodyData,
    r_b: Vec2,
    mass: Mat22,
    c: Vec2,
    gamma: f32,
    beta: f32,
}

impl MouseJoint {
    /// Creates a mouse joint grabbing body B at a world point
    pub fn new(
        bodies: &BodyStorage<Body>,
        body_a: BodyHandle,
        body_b: BodyHandle,
        grab_point: Vec2,
        max_force: f32,
    ) -> Self {
        let local_anchor_b = bodies
            .get(body_b)
            .map(|b| b.local_point(grab_point))
            .unwrap_or(Vec2::zero());

        Self {
            body_a,
            body_b,
            local_anchor_b,
            target: grab_point,
            max_force,
            frequency: 5.0,
            damping_ratio: 0.7,
            impulse: Vec2::zero(),
            data_b: JointBodyData::default(),
            r_b: Vec2::zero(),
            mass: Mat22::zero(),
            c: Vec2::zero(),
            gamma: 0.0,
            beta: 0.0,
        }
    }

    /// Tunes the response spring
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Self {
        self.frequency = frequency;
        self.damping_ratio = damping_ratio;
        self
    }

    /// Returns the current target point
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Moves the target point
    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    /// Returns the maximum pull force
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    /// Sets the maximum pull force
    pub fn set_max_force(&mut self, force: f32) {
        self.max_force = force;
    }
}

impl Joint for MouseJoint {
    fn joint_type(&self) -> &'static str {
        "mouse"
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

    fn anchor_a(&self, _bodies: &BodyStorage<Body>) -> Vec2 {
        self.target
    }

    fn anchor_b(&self, bodies: &BodyStorage<Body>) -> Vec2 {
        bodies
            .get(self.body_b)
            .map(|b| b.world_point(self.local_anchor_b))
            .unwrap_or(self.local_anchor_b)
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.impulse * inv_dt
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }

    fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &BodyStorage<Body>) {
        self.data_b = JointBodyData::from_body(bodies, self.body_b);

        let mass = if self.data_b.inv_mass > 0.0 {
            1.0 / self.data_b.inv_mass
        } else {
            0.0
        };

        let c_b = data.positions[self.data_b.index].c;
        let a_b = data.positions[self.data_b.index].a;
        let q_b = Rot::from_angle(a_b);

        let omega = 2.0 * PI * self.frequency;
        let d = 2.0 * mass * self.damping_ratio * omega;
        let k = mass * omega * omega;

        let h = data.step.dt;
        self.gamma = h * (d + h * k);
        if self.gamma != 0.0 {
            self.gamma = 1.0 / self.gamma;
        }
        self.beta = h * k * self.gamma;

        self.r_b = q_b.rotate(self.local_anchor_b - self.data_b.local_center);

        let i_b = self.data_b.inv_i;
        let m_b = self.data_b.inv_mass;

        let k_matrix = Mat22::from_entries(
            m_b + i_b * self.r_b.y * self.r_b.y + self.gamma,
            -i_b * self.r_b.x * self.r_b.y,
            -i_b * self.r_b.x * self.r_b.y,
            m_b + i_b * self.r_b.x * self.r_b.x + self.gamma,
        );
        self.mass = k_matrix.inverse();

        self.c = (c_b + self.r_b - self.target) * self.beta;

        // A little extra damping keeps the drag from oscillating.
        data.velocities[self.data_b.index].w *= 0.98;

        if data.step.do_warm_start {
            self.impulse *= data.step.dt_ratio;
            let vb = &mut data.velocities[self.data_b.index];
            vb.v += self.impulse * m_b;
            vb.w += i_b * self.r_b.cross(&self.impulse);
        } else {
            self.impulse = Vec2::zero();
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let mut v_b = data.velocities[self.data_b.index].v;
        let mut w_b = data.velocities[self.data_b.index].w;

        let cdot = v_b + Vec2::scalar_cross(w_b, self.r_b);
        let mut impulse = self
            .mass
            .mul_vec(-(cdot + self.c + self.impulse * self.gamma));

        let old_impulse = self.impulse;
        self.impulse += impulse;
        let max_impulse = data.step.dt * self.max_force;
        if self.impulse.length_squared() > max_impulse * max_impulse {
            self.impulse *= max_impulse / self.impulse.length();
        }
        impulse = self.impulse - old_impulse;

        v_b += impulse * self.data_b.inv_mass;
        w_b += self.data_b.inv_i * self.r_b.cross(&impulse);

        data.velocities[self.data_b.index].v = v_b;
        data.velocities[self.data_b.index].w = w_b;
    }

    fn solve_position_constraints(&mut self, _data: &mut SolverData) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
