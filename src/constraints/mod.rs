mod distance;
mod friction;
mod gear;
mod joint;
mod motor;
mod mouse;
mod prismatic;
mod pulley;
mod revolute;
mod rope;
mod weld;
mod wheel;

pub use self::distance::DistanceJoint;
pub use self::friction::FrictionJoint;
pub use self::gear::GearJoint;
pub use self::joint::{Joint, SolverData};
pub use self::motor::MotorJoint;
pub use self::mouse::MouseJoint;
pub use self::prismatic::PrismaticJoint;
pub use self::pulley::PulleyJoint;
pub use self::revolute::RevoluteJoint;
pub use self::rope::RopeJoint;
pub use self::weld::WeldJoint;
pub use self::wheel::WheelJoint;
