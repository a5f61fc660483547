use crate::math::Vec2;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A 2D rotation stored as the cosine and sine of the angle
///
/// Keeping the unit-vector form avoids repeated trigonometry when
/// transforming points and composing rotations.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Rot {
    /// Cosine of the rotation angle
    pub c: f32,

    /// Sine of the rotation angle
    pub s: f32,
}

impl Rot {
    /// Creates a rotation from an angle in radians
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self {
            c: angle.cos(),
            s: angle.sin(),
        }
    }

    /// Creates a rotation from an angle given in degrees
    #[inline]
    pub fn from_degrees(degrees: f32) -> Self {
        Self::from_angle(crate::math::to_radians(degrees))
    }

    /// Creates a rotation pointing along the given vector, or the
    /// fallback direction when the vector is too short to normalize
    pub fn from_vector(v: Vec2, fallback: Self) -> Self {
        let length = v.length();
        if length > crate::math::EPSILON {
            Self {
                c: v.x / length,
                s: v.y / length,
            }
        } else {
            fallback
        }
    }

    /// Creates an identity rotation (zero angle)
    #[inline]
    pub const fn identity() -> Self {
        Self { c: 1.0, s: 0.0 }
    }

    /// Returns the rotation angle in radians (in the range [-PI, PI])
    #[inline]
    pub fn angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Returns the x axis of the rotated frame
    #[inline]
    pub fn x_axis(&self) -> Vec2 {
        Vec2::new(self.c, self.s)
    }

    /// Returns the y axis of the rotated frame
    #[inline]
    pub fn y_axis(&self) -> Vec2 {
        Vec2::new(-self.s, self.c)
    }

    /// Rotates a vector
    #[inline]
    pub fn rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Applies the inverse rotation to a vector
    #[inline]
    pub fn inverse_rotate(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Composes two rotations (self followed by other)
    #[inline]
    pub fn mul(&self, other: Self) -> Self {
        Self {
            c: self.c * other.c - self.s * other.s,
            s: self.s * other.c + self.c * other.s,
        }
    }

    /// Composes the inverse of this rotation with another
    #[inline]
    pub fn mul_t(&self, other: Self) -> Self {
        Self {
            c: self.c * other.c + self.s * other.s,
            s: self.c * other.s - self.s * other.c,
        }
    }
}

impl Default for Rot {
    fn default() -> Self {
        Self::identity()
    }
}
