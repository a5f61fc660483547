use crate::bodies::Body;
use crate::core::island::{Position, Velocity};
use crate::core::storage::BodyStorage;
use crate::core::{BodyHandle, StepConf};
use crate::math::Vec2;
use std::any::Any;

/// Solver state shared with joints during an island solve
///
/// Positions and velocities are indexed by island-local body indices,
/// which each joint captures in `init_velocity_constraints`.
pub struct SolverData<'a> {
    /// The step configuration driving this solve
    pub step: &'a StepConf,

    /// Island-local body positions
    pub positions: &'a mut [Position],

    /// Island-local body velocities
    pub velocities: &'a mut [Velocity],
}

/// Base trait for joints connecting two bodies
///
/// Joints contribute velocity constraints each iteration and position
/// corrections after integration, mirroring the contact solver's
/// split. Accumulated impulses persist across steps for warm starting.
pub trait Joint: Send + Sync + 'static {
    /// Returns the type name of the joint
    fn joint_type(&self) -> &'static str;

    /// Returns the first attached body
    fn body_a(&self) -> BodyHandle;

    /// Returns the second attached body
    fn body_b(&self) -> BodyHandle;

    /// Returns whether the attached bodies may collide with each other
    fn collide_connected(&self) -> bool;

    /// Returns the joint's anchor on body A in world coordinates
    fn anchor_a(&self, bodies: &BodyStorage<Body>) -> Vec2;

    /// Returns the joint's anchor on body B in world coordinates
    fn anchor_b(&self, bodies: &BodyStorage<Body>) -> Vec2;

    /// Returns the reaction force on body B at the anchor
    fn reaction_force(&self, inv_dt: f32) -> Vec2;

    /// Returns the reaction torque on body B
    fn reaction_torque(&self, inv_dt: f32) -> f32;

    /// Caches body data and effective masses, and warm starts
    fn init_velocity_constraints(&mut self, data: &mut SolverData, bodies: &BodyStorage<Body>);

    /// Runs one velocity iteration
    fn solve_velocity_constraints(&mut self, data: &mut SolverData);

    /// Runs one position iteration; returns whether the joint's
    /// position error is within tolerance
    fn solve_position_constraints(&mut self, data: &mut SolverData) -> bool;

    /// Returns a dynamic reference to any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Returns a dynamic mutable reference to any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// State of an inequality limit constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum LimitState {
    /// The limit is not engaged
    #[default]
    Inactive,

    /// The joint coordinate sits at the lower limit
    AtLower,

    /// The joint coordinate sits at the upper limit
    AtUpper,

    /// The lower and upper limits coincide
    Equal,
}

/// Per-body data every joint caches during initialization
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct JointBodyData {
    pub index: usize,
    pub local_center: Vec2,
    pub inv_mass: f32,
    pub inv_i: f32,
}

impl JointBodyData {
    /// Reads the island-solve data of a body
    pub fn from_body(bodies: &BodyStorage<Body>, handle: BodyHandle) -> Self {
        use crate::core::storage::Storage;
        match bodies.get(handle) {
            Some(body) => Self {
                index: body.island_index,
                local_center: body.local_center(),
                inv_mass: body.inv_mass(),
                inv_i: body.inv_inertia(),
            },
            None => Self::default(),
        }
    }
}
