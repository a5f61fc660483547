use crate::math::{Transform, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Describes the motion of a body's origin and angle over a time step
///
/// The solver advances bodies in terms of their center of mass, while
/// shapes attach to the body origin, so the sweep also records the
/// local center that relates the two.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Sweep {
    /// Center of mass world position at the start of the interval
    pub c0: Vec2,

    /// Center of mass world position at the end of the interval
    pub c: Vec2,

    /// World angle at the start of the interval
    pub a0: f32,

    /// World angle at the end of the interval
    pub a: f32,

    /// Local center of mass relative to the body origin
    pub local_center: Vec2,

    /// Fraction of the current time step already consumed by TOI
    /// sub-stepping; the start state corresponds to this time
    pub alpha0: f32,
}

impl Sweep {
    /// Creates a sweep at rest at the given center and angle
    pub fn new(center: Vec2, angle: f32) -> Self {
        Self {
            c0: center,
            c: center,
            a0: angle,
            a: angle,
            local_center: Vec2::zero(),
            alpha0: 0.0,
        }
    }

    /// Computes the interpolated transform at the normalized time `beta`,
    /// where 0 yields the start state and 1 the end state
    pub fn transform_at(&self, beta: f32) -> Transform {
        let center = self.c0 * (1.0 - beta) + self.c * beta;
        let angle = self.a0 * (1.0 - beta) + self.a * beta;
        let mut xf = Transform::from_position_angle(center, angle);

        // Shift from center of mass to body origin.
        xf.position -= xf.rotation.rotate(self.local_center);
        xf
    }

    /// Advances the start state to the absolute time `alpha`
    ///
    /// `alpha` is measured on the same scale as `alpha0` and must be
    /// below 1 so the remaining interval stays non-degenerate.
    pub fn advance(&mut self, alpha: f32) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.c0 += (self.c - self.c0) * beta;
        self.a0 += (self.a - self.a0) * beta;
        self.alpha0 = alpha;
    }

    /// Normalizes both angles into the range [-2*PI, 2*PI]
    ///
    /// Keeps the relative angle intact so interpolation is unaffected.
    pub fn normalize_angles(&mut self) {
        let two_pi = 2.0 * std::f32::consts::PI;
        let d = two_pi * (self.a0 / two_pi).floor();
        self.a0 -= d;
        self.a -= d;
    }
}
