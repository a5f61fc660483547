pub mod contact;
pub mod contact_manager;
pub mod contact_solver;
pub mod events;
pub mod island;
pub mod step_conf;
pub mod storage;
pub mod world;

pub use self::contact::{Contact, ContactImpulses};
pub use self::contact_manager::ContactManager;
pub use self::events::{
    ContactFilter, ContactListener, DestructionListener, PreStepStats, RegStepStats, StepStats,
    ToiStepStats,
};
pub use self::island::{Island, Position, Velocity};
pub use self::step_conf::StepConf;
pub use self::storage::{BodyStorage, ContactStorage, JointStorage, Storage};
pub use self::world::{World, WorldDef};

use std::f32::consts::PI;

/// A small length used as a collision and position tolerance
///
/// Chosen so stacks neither jitter nor visibly overlap.
pub const LINEAR_SLOP: f32 = 0.005;

/// A small angle used as a joint-limit tolerance
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// Corner rounding applied to polygons and edges
///
/// Keeps the time-of-impact target separation positive so sub-stepping
/// can park bodies just short of touching.
pub const POLYGON_VERTEX_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Smallest vertex radius accepted on fixture creation
pub const MIN_VERTEX_RADIUS: f32 = 0.0;

/// Default for the largest vertex radius accepted on fixture creation
pub const MAX_VERTEX_RADIUS: f32 = 255.0;

/// Maximum number of vertices in a convex polygon
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Margin added around tight AABBs stored in the broad-phase
pub const AABB_EXTENSION: f32 = LINEAR_SLOP * 20.0;

/// Default iteration cap for the time-of-impact root finder
pub const MAX_TOI_ROOT_ITERATIONS: u32 = 30;

/// Default iteration cap for conservative advancement
pub const MAX_TOI_ITERATIONS: u32 = 20;

/// A unique identifier for a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u32);

/// A unique identifier for a joint in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointHandle(pub(crate) u32);

/// A unique identifier for a contact owned by the contact manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactHandle(pub(crate) u32);

/// A world-unique identifier for a fixture
///
/// Stays valid while the fixture lives, independent of its position in
/// the owning body's fixture list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(pub(crate) u32);

/// A body's link to one of its contacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEdge {
    /// The contact itself
    pub contact: ContactHandle,

    /// The body on the other end of the contact
    pub other: BodyHandle,
}

/// A body's link to one of its joints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointEdge {
    /// The joint itself
    pub joint: JointHandle,

    /// The body on the other end of the joint
    pub other: BodyHandle,
}
