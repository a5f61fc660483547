pub mod bodies;
pub mod collision;
pub mod constraints;
pub mod core;
pub mod math;
pub mod shapes;

/// Re-export common types for easier usage
pub use crate::bodies::{Body, BodyDef, BodyType, Filter, Fixture, FixtureDef};
pub use crate::core::{
    BodyHandle, ContactHandle, FixtureId, JointHandle, StepConf, StepStats, World, WorldDef,
};
pub use crate::math::Vec2;

/// Error types for the physics engine
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum PhysicsError {
        #[error("World is locked: structural changes are not allowed during a step")]
        WorldLocked,

        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        #[error("Resource not found: {0}")]
        ResourceNotFound(String),
    }
}

/// Result type for physics engine operations
pub type Result<T> = std::result::Result<T, error::PhysicsError>;

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
