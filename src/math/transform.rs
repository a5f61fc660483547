use crate::math::{Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A rigid transformation in 2D space (translation and rotation)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Translation of the frame origin
    pub position: Vec2,

    /// Rotation of the frame
    pub rotation: Rot,
}

impl Transform {
    /// Creates a new transform from a position and a rotation
    #[inline]
    pub const fn new(position: Vec2, rotation: Rot) -> Self {
        Self { position, rotation }
    }

    /// Creates a new identity transform
    #[inline]
    pub const fn identity() -> Self {
        Self {
            position: Vec2::zero(),
            rotation: Rot::identity(),
        }
    }

    /// Creates a new transform from just a position
    #[inline]
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            rotation: Rot::identity(),
        }
    }

    /// Creates a new transform from a position and an angle in radians
    #[inline]
    pub fn from_position_angle(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            rotation: Rot::from_angle(angle),
        }
    }

    /// Transforms a point from local space to world space
    #[inline]
    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        self.rotation.rotate(point) + self.position
    }

    /// Transforms a point from world space to local space
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec2) -> Vec2 {
        self.rotation.inverse_rotate(point - self.position)
    }

    /// Transforms a direction from local space to world space
    #[inline]
    pub fn transform_direction(&self, direction: Vec2) -> Vec2 {
        self.rotation.rotate(direction)
    }

    /// Transforms a direction from world space to local space
    #[inline]
    pub fn inverse_transform_direction(&self, direction: Vec2) -> Vec2 {
        self.rotation.inverse_rotate(direction)
    }

    /// Combines two transforms (apply self, then other)
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            position: other.rotation.rotate(self.position) + other.position,
            rotation: other.rotation.mul(self.rotation),
        }
    }

    /// Returns the transform mapping from this frame into another
    ///
    /// `a.relative_to(&b)` maps points local to `a` into coordinates
    /// local to `b`.
    pub fn relative_to(&self, other: &Self) -> Self {
        Self {
            position: other.rotation.inverse_rotate(self.position - other.position),
            rotation: other.rotation.mul_t(self.rotation),
        }
    }

    /// Inverts this transform
    pub fn inverse(&self) -> Self {
        let inv_rotation = Rot {
            c: self.rotation.c,
            s: -self.rotation.s,
        };
        Self {
            position: inv_rotation.rotate(-self.position),
            rotation: inv_rotation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
