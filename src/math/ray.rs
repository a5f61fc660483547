use crate::math::Vec2;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Input for a ray cast, described as a segment from `p1` toward `p2`
///
/// The cast covers `p1 + t * (p2 - p1)` for `t` in `[0, max_fraction]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RayCastInput {
    /// Start point of the segment
    pub p1: Vec2,

    /// End point of the segment
    pub p2: Vec2,

    /// Upper bound on the reported hit fraction
    pub max_fraction: f32,
}

impl RayCastInput {
    /// Creates a ray cast input covering the full segment
    pub fn new(p1: Vec2, p2: Vec2) -> Self {
        Self {
            p1,
            p2,
            max_fraction: 1.0,
        }
    }
}

/// Output of a successful ray cast against a shape
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct RayCastOutput {
    /// Surface normal at the hit point
    pub normal: Vec2,

    /// Fraction along the segment at which the hit occurred
    pub fraction: f32,
}

/// Directive returned by a ray cast visitor to control the traversal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayCastBehavior {
    /// Terminate the ray cast
    Stop,

    /// Keep casting with the current segment unchanged
    Continue,

    /// Clip the segment to the given fraction and keep casting
    ///
    /// Passing the reported hit fraction finds the closest hit overall.
    Clip(f32),
}
