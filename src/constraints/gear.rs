use crate::bodies::Body;
use crate::constraints::joint::{Joint, JointBodyData, SolverData};
use crate::constraints::{PrismaticJoint, RevoluteJoint};
use crate::core::storage::{BodyStorage, Storage};
use crate::core::{BodyHandle, LINEAR_SLOP};
use crate::error::PhysicsError;
use crate::math::{Rot, Vec2};
use crate::Result;
use std::any::Any;

/// The kind of joint a gear is geared onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GearedKind {
    Revolute,
    Prismatic,
}

/// Cached description of one side of the gear train
#[derive(Debug, Clone, Copy)]
struct GearedJoint {
    kind: GearedKind,

    /// The moving body of the geared joint
    body: BodyHandle,

    /// The support body of the geared joint (often the ground)
    support: BodyHandle,

    local_anchor_body: Vec2,
    local_anchor_support: Vec2,

    /// Slide axis on the support body (prismatic only)
    local_axis: Vec2,

    /// Rest angle between the bodies (revolute only)
    reference_angle: f32,
}

impl GearedJoint {
    /// Extracts the data this gear needs from a revolute or prismatic
    /// joint
    fn capture(joint: &dyn Joint) -> Result<Self> {
        if let Some(revolute) = joint.as_any().downcast_ref::<RevoluteJoint>() {
            return Ok(Self {
                kind: GearedKind::Revolute,
                body: revolute.body_b(),
                support: revolute.body_a(),
                local_anchor_body: revolute.local_anchor_b(),
                local_anchor_support: revolute.local_anchor_a(),
                local_axis: Vec2::unit_x(),
                reference_angle: revolute.reference_angle(),
            });
        }

        if let Some(prismatic) = joint.as_any().downcast_ref::<PrismaticJoint>() {
            return Ok(Self {
                kind: GearedKind::Prismatic,
                body: prismatic.body_b(),
                support: prismatic.body_a(),
                local_anchor_body: prismatic.local_anchor_b(),
                local_anchor_support: prismatic.local_anchor_a(),
                local_axis: prismatic.local_axis_a(),
                reference_angle: prismatic.reference_angle(),
            });
        }

        Err(PhysicsError::InvalidParameter(
            "gear joints require revolute or prismatic joints".into(),
        ))
    }

    /// Measures the joint coordinate given both bodies' transforms
    fn coordinate(&self, bodies: &BodyStorage<Body>) -> f32 {
        let (body, support) = match (bodies.get(self.body), bodies.get(self.support)) {
            (Some(b), Some(s)) => (b, s),
            _ => return 0.0,
        };

        match self.kind {
            GearedKind::Revolute => body.angle() - support.angle() - self.reference_angle,
            GearedKind::Prismatic => {
                let p_body = support.local_point(body.world_point(self.local_anchor_body));
                (p_body - self.local_anchor_support).dot(&self.local_axis)
            }
        }
    }
}

/// Per-body solver data with a fallback for bodies outside the island
#[derive(Debug, Clone, Copy, Default)]
struct GearBodyState {
    data: JointBodyData,

    /// Whether the body's island index addresses the solver buffers
    in_island: bool,

    /// Snapshot pose used when the body is not being solved
    fallback: (Vec2, f32),
}

/// A gear joint coupling the coordinates of two other joints
///
/// Enforces `coordinate_1 + ratio * coordinate_2 == constant`, turning
/// a revolute angle or prismatic translation on one joint into motion
/// of the other. Both referenced joints must attach to a common
/// support (usually the ground) and stay alive while the gear exists.
pub struct GearJoint {
    joint_a: GearedJoint,
    joint_b: GearedJoint,

    ratio: f32,
    constant: f32,

    impulse: f32,

    // Solver state: the moving bodies (A, B) and their supports (C, D)
    state_a: GearBodyState,
    state_b: GearBodyState,
    state_c: GearBodyState,
    state_d: GearBodyState,

    jv_ac: Vec2,
    jv_bd: Vec2,
    jw_a: f32,
    jw_b: f32,
    jw_c: f32,
    jw_d: f32,
    mass: f32,
}

impl GearJoint {
    /// Creates a gear joint over two existing joints
    ///
    /// Each referenced joint must be a revolute or prismatic joint.
    pub fn new(
        bodies: &BodyStorage<Body>,
        joint_a: &dyn Joint,
        joint_b: &dyn Joint,
        ratio: f32,
    ) -> Result<Self> {
        let geared_a = GearedJoint::capture(joint_a)?;
        let geared_b = GearedJoint::capture(joint_b)?;

        let constant = geared_a.coordinate(bodies) + ratio * geared_b.coordinate(bodies);

        Ok(Self {
            joint_a: geared_a,
            joint_b: geared_b,
            ratio,
            constant,
            impulse: 0.0,
            state_a: GearBodyState::default(),
            state_b: GearBodyState::default(),
            state_c: GearBodyState::default(),
            state_d: GearBodyState::default(),
            jv_ac: Vec2::zero(),
            jv_bd: Vec2::zero(),
            jw_a: 0.0,
            jw_b: 0.0,
            jw_c: 0.0,
            jw_d: 0.0,
            mass: 0.0,
        })
    }

    /// Returns the gear ratio
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Sets the gear ratio
    pub fn set_ratio(&mut self, ratio: f32) {
        debug_assert!(ratio.is_finite());
        self.ratio = ratio;
    }

    fn capture_state(
        bodies: &BodyStorage<Body>,
        handle: BodyHandle,
        body_count: usize,
    ) -> GearBodyState {
        let data = JointBodyData::from_body(bodies, handle);
        let fallback = bodies
            .get(handle)
            .map(|b| (b.sweep().c, b.sweep().a))
            .unwrap_or((Vec2::zero(), 0.0));

        GearBodyState {
            in_island: data.index < body_count,
            data,
            fallback,
        }
    }

    fn pose(state: &GearBodyState, data: &SolverData) -> (Vec2, f32) {
        if state.in_island {
            let p = &data.positions[state.data.index];
            (p.c, p.a)
        } else {
            state.fallback
        }
    }

    fn velocity(state: &GearBodyState, data: &SolverData) -> (Vec2, f32) {
        if state.in_island {
            let v = &data.velocities[state.data.index];
            (v.v, v.w)
        } else {
            (Vec2::zero(), 0.0)
        }
    }

    fn apply_velocity(state: &GearBodyState, data: &mut SolverData, dv: Vec2, dw: f32) {
        if state.in_island {
            let v = &mut data.velocities[state.data.index];
            v.v += dv;
            v.w += dw;
        }
    }

    fn apply_position(state: &GearBodyState, data: &mut SolverData, dc: Vec2, da: f32) {
        if state.in_island {
            let p = &mut data.positions[state.data.index];
            p.c += dc;
            p.a += da;
        }
    }
}

impl Joint for GearJoint {
    fn joint_type(&self) -> &'static str {
        "gear"
    }

    fn body_a(&self) -> BodyHandle {
        self.joint_a.body
    }

    fn body_b(&self) -> BodyHandle {
        self.joint_b.body
    }

    fn collide_connected(&self) -> bool {
        false
    }

    fn anchor_a(&self, bodies: &BodyStorage<Body>) -> Vec2 {
        bodies
            .get(self.joint_a.body)
            .map(|b| b.world_point(self.joint_a.local_anchor_body))
            .unwrap_or(Vec2::zero())
    }

    fn anchor_b(&self, bodies: &BodyStorage<Body>) -> Vec2 {
        bodies
            .get(self.joint_b.body)
            .map(|b| b.world_point(self.joint_b.local_anchor_body))
            .unwrap_or(Vec2::zero())
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.jv_ac * (inv_dt * self.impulse)
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse * self.jw_a
    }

    fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &BodyStorage<Body>) {
        let body_count = data.positions.len();
        self.state_a = Self::capture_state(bodies, self.joint_a.body, body_count);
        self.state_b = Self::capture_state(bodies, self.joint_b.body, body_count);
        self.state_c = Self::capture_state(bodies, self.joint_a.support, body_count);
        self.state_d = Self::capture_state(bodies, self.joint_b.support, body_count);

        let (c_a, a_a) = Self::pose(&self.state_a, data);
        let (c_b, a_b) = Self::pose(&self.state_b, data);
        let (c_c, a_c) = Self::pose(&self.state_c, data);
        let (c_d, a_d) = Self::pose(&self.state_d, data);

        let q_a = Rot::from_angle(a_a);
        let q_b = Rot::from_angle(a_b);
        let q_c = Rot::from_angle(a_c);
        let q_d = Rot::from_angle(a_d);

        self.mass = 0.0;

        match self.joint_a.kind {
            GearedKind::Revolute => {
                self.jv_ac = Vec2::zero();
                self.jw_a = 1.0;
                self.jw_c = 1.0;
                self.mass += self.state_a.data.inv_i + self.state_c.data.inv_i;
            }
            GearedKind::Prismatic => {
                let u = q_c.rotate(self.joint_a.local_axis);
                let r_c =
                    q_c.rotate(self.joint_a.local_anchor_support - self.state_c.data.local_center);
                let r_a = q_a.rotate(self.joint_a.local_anchor_body - self.state_a.data.local_center);

                self.jv_ac = u;
                self.jw_c = (r_c + c_a - c_c).cross(&u);
                self.jw_a = r_a.cross(&u);
                self.mass += self.state_c.data.inv_mass
                    + self.state_a.data.inv_mass
                    + self.state_c.data.inv_i * self.jw_c * self.jw_c
                    + self.state_a.data.inv_i * self.jw_a * self.jw_a;
            }
        }

        match self.joint_b.kind {
            GearedKind::Revolute => {
                self.jv_bd = Vec2::zero();
                self.jw_b = self.ratio;
                self.jw_d = self.ratio;
                self.mass +=
                    self.ratio * self.ratio * (self.state_b.data.inv_i + self.state_d.data.inv_i);
            }
            GearedKind::Prismatic => {
                let u = q_d.rotate(self.joint_b.local_axis);
                let r_d =
                    q_d.rotate(self.joint_b.local_anchor_support - self.state_d.data.local_center);
                let r_b = q_b.rotate(self.joint_b.local_anchor_body - self.state_b.data.local_center);

                self.jv_bd = u * self.ratio;
                self.jw_d = self.ratio * (r_d + c_b - c_d).cross(&u);
                self.jw_b = self.ratio * r_b.cross(&u);
                self.mass += self.ratio
                    * self.ratio
                    * (self.state_d.data.inv_mass + self.state_b.data.inv_mass)
                    + self.state_d.data.inv_i * self.jw_d * self.jw_d
                    + self.state_b.data.inv_i * self.jw_b * self.jw_b;
            }
        }

        self.mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };

        if data.step.do_warm_start {
            self.impulse *= data.step.dt_ratio;

            let imp = self.impulse;
            Self::apply_velocity(
                &self.state_a,
                data,
                self.jv_ac * (self.state_a.data.inv_mass * imp),
                self.state_a.data.inv_i * imp * self.jw_a,
            );
            Self::apply_velocity(
                &self.state_b,
                data,
                self.jv_bd * (self.state_b.data.inv_mass * imp),
                self.state_b.data.inv_i * imp * self.jw_b,
            );
            Self::apply_velocity(
                &self.state_c,
                data,
                self.jv_ac * (-self.state_c.data.inv_mass * imp),
                -self.state_c.data.inv_i * imp * self.jw_c,
            );
            Self::apply_velocity(
                &self.state_d,
                data,
                self.jv_bd * (-self.state_d.data.inv_mass * imp),
                -self.state_d.data.inv_i * imp * self.jw_d,
            );
        } else {
            self.impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, data: &mut SolverData) {
        let (v_a, w_a) = Self::velocity(&self.state_a, data);
        let (v_b, w_b) = Self::velocity(&self.state_b, data);
        let (v_c, w_c) = Self::velocity(&self.state_c, data);
        let (v_d, w_d) = Self::velocity(&self.state_d, data);

        let cdot = self.jv_ac.dot(&(v_a - v_c)) + self.jv_bd.dot(&(v_b - v_d))
            + (self.jw_a * w_a - self.jw_c * w_c)
            + (self.jw_b * w_b - self.jw_d * w_d);

        let impulse = -self.mass * cdot;
        self.impulse += impulse;

        Self::apply_velocity(
            &self.state_a,
            data,
            self.jv_ac * (self.state_a.data.inv_mass * impulse),
            self.state_a.data.inv_i * impulse * self.jw_a,
        );
        Self::apply_velocity(
            &self.state_b,
            data,
            self.jv_bd * (self.state_b.data.inv_mass * impulse),
            self.state_b.data.inv_i * impulse * self.jw_b,
        );
        Self::apply_velocity(
            &self.state_c,
            data,
            self.jv_ac * (-self.state_c.data.inv_mass * impulse),
            -self.state_c.data.inv_i * impulse * self.jw_c,
        );
        Self::apply_velocity(
            &self.state_d,
            data,
            self.jv_bd * (-self.state_d.data.inv_mass * impulse),
            -self.state_d.data.inv_i * impulse * self.jw_d,
        );
    }

    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool {
        let (c_a, a_a) = Self::pose(&self.state_a, data);
        let (c_b, a_b) = Self::pose(&self.state_b, data);
        let (c_c, a_c) = Self::pose(&self.state_c, data);
        let (c_d, a_d) = Self::pose(&self.state_d, data);

        let q_a = Rot::from_angle(a_a);
        let q_b = Rot::from_angle(a_b);
        let q_c = Rot::from_angle(a_c);
        let q_d = Rot::from_angle(a_d);

        let mut mass = 0.0;

        let (jv_ac, jw_a, jw_c, coordinate_a);
        match self.joint_a.kind {
            GearedKind::Revolute => {
                jv_ac = Vec2::zero();
                jw_a = 1.0;
                jw_c = 1.0;
                mass += self.state_a.data.inv_i + self.state_c.data.inv_i;
                coordinate_a = a_a - a_c - self.joint_a.reference_angle;
            }
            GearedKind::Prismatic => {
                let u = q_c.rotate(self.joint_a.local_axis);
                let r_c =
                    q_c.rotate(self.joint_a.local_anchor_support - self.state_c.data.local_center);
                let r_a = q_a.rotate(self.joint_a.local_anchor_body - self.state_a.data.local_center);

                jv_ac = u;
                jw_c = (r_c + c_a - c_c).cross(&u);
                jw_a = r_a.cross(&u);
                mass += self.state_c.data.inv_mass
                    + self.state_a.data.inv_mass
                    + self.state_c.data.inv_i * jw_c * jw_c
                    + self.state_a.data.inv_i * jw_a * jw_a;

                let p_c = self.joint_a.local_anchor_support - self.state_c.data.local_center;
                let p_a = q_c.inverse_rotate(r_a + c_a - c_c);
                coordinate_a = (p_a - p_c).dot(&self.joint_a.local_axis);
            }
        }

        let (jv_bd, jw_b, jw_d, coordinate_b);
        match self.joint_b.kind {
            GearedKind::Revolute => {
                jv_bd = Vec2::zero();
                jw_b = self.ratio;
                jw_d = self.ratio;
                mass +=
                    self.ratio * self.ratio * (self.state_b.data.inv_i + self.state_d.data.inv_i);
                coordinate_b = a_b - a_d - self.joint_b.reference_angle;
            }
            GearedKind::Prismatic => {
                let u = q_d.rotate(self.joint_b.local_axis);
                let r_d =
                    q_d.rotate(self.joint_b.local_anchor_support - self.state_d.data.local_center);
                let r_b = q_b.rotate(self.joint_b.local_anchor_body - self.state_b.data.local_center);

                jv_bd = u * self.ratio;
                jw_d = self.ratio * (r_d + c_b - c_d).cross(&u);
                jw_b = self.ratio * r_b.cross(&u);
                mass += self.ratio
                    * self.ratio
                    * (self.state_d.data.inv_mass + self.state_b.data.inv_mass)
                    + self.state_d.data.inv_i * jw_d * jw_d
                    + self.state_b.data.inv_i * jw_b * jw_b;

                let p_d = self.joint_b.local_anchor_support - self.state_d.data.local_center;
                let p_b = q_d.inverse_rotate(r_b + c_b - c_d);
                coordinate_b = (p_b - p_d).dot(&self.joint_b.local_axis);
            }
        }

        let c = (coordinate_a + self.ratio * coordinate_b) - self.constant;

        let impulse = if mass > 0.0 { -c / mass } else { 0.0 };

        Self::apply_position(
            &self.state_a,
            data,
            jv_ac * (self.state_a.data.inv_mass * impulse),
            self.state_a.data.inv_i * impulse * jw_a,
        );
        Self::apply_position(
            &self.state_b,
            data,
            jv_bd * (self.state_b.data.inv_mass * impulse),
            self.state_b.data.inv_i * impulse * jw_b,
        );
        Self::apply_position(
            &self.state_c,
            data,
            jv_ac * (-self.state_c.data.inv_mass * impulse),
            -self.state_c.data.inv_i * impulse * jw_c,
        );
        Self::apply_position(
            &self.state_d,
            data,
            jv_bd * (-self.state_d.data.inv_mass * impulse),
            -self.state_d.data.inv_i * impulse * jw_d,
        );

        c.abs() < LINEAR_SLOP
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
