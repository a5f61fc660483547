mod body;
mod body_type;
mod fixture;

pub use self::body::{Body, BodyDef};
pub use self::body_type::BodyType;
pub use self::fixture::{Filter, Fixture, FixtureDef, FixtureProxy};

/// Flags for controlling body behavior
pub mod body_flags {
    use bitflags::bitflags;

    bitflags! {
        /// Flags for controlling the behavior of rigid bodies
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct BodyFlags: u32 {
            /// Body participates in simulation
            const ACTIVE = 0x01;

            /// Body is awake and being simulated
            const AWAKE = 0x02;

            /// Body may go to sleep when still
            const AUTO_SLEEP = 0x04;

            /// Body rotation is locked
            const FIXED_ROTATION = 0x08;

            /// Body gets continuous collision detection against other
            /// dynamic bodies
            const BULLET = 0x10;

            /// Body has been added to the island being solved
            const IN_ISLAND = 0x20;
        }
    }
}
