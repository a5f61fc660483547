use crate::math::{Vec2, Vec3};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A 2x2 matrix stored in column-major order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Mat22 {
    /// The first column
    pub ex: Vec2,

    /// The second column
    pub ey: Vec2,
}

impl Mat22 {
    /// Creates a new matrix from two columns
    #[inline]
    pub const fn new(ex: Vec2, ey: Vec2) -> Self {
        Self { ex, ey }
    }

    /// Creates a new matrix from the four scalar entries
    #[inline]
    pub const fn from_entries(a11: f32, a12: f32, a21: f32, a22: f32) -> Self {
        Self {
            ex: Vec2::new(a11, a21),
            ey: Vec2::new(a12, a22),
        }
    }

    /// Creates a zero matrix
    #[inline]
    pub const fn zero() -> Self {
        Self {
            ex: Vec2::zero(),
            ey: Vec2::zero(),
        }
    }

    /// Creates an identity matrix
    #[inline]
    pub const fn identity() -> Self {
        Self {
            ex: Vec2::new(1.0, 0.0),
            ey: Vec2::new(0.0, 1.0),
        }
    }

    /// Multiplies this matrix by a vector
    #[inline]
    pub fn mul_vec(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Returns the inverse of this matrix, or the zero matrix when singular
    pub fn inverse(&self) -> Self {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ex.y;
        let d = self.ey.y;

        let det = a * d - b * c;
        let inv_det = if det != 0.0 { 1.0 / det } else { 0.0 };

        Self {
            ex: Vec2::new(inv_det * d, -inv_det * c),
            ey: Vec2::new(-inv_det * b, inv_det * a),
        }
    }

    /// Solves A * x = b for x using Cramer's rule
    ///
    /// More efficient than computing the inverse when solving once.
    pub fn solve(&self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;

        let det = a11 * a22 - a12 * a21;
        let inv_det = if det != 0.0 { 1.0 / det } else { 0.0 };

        Vec2::new(
            inv_det * (a22 * b.x - a12 * b.y),
            inv_det * (a11 * b.y - a21 * b.x),
        )
    }
}

/// A 3x3 matrix stored in column-major order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Mat33 {
    /// The first column
    pub ex: Vec3,

    /// The second column
    pub ey: Vec3,

    /// The third column
    pub ez: Vec3,
}

impl Mat33 {
    /// Creates a new matrix from three columns
    #[inline]
    pub const fn new(ex: Vec3, ey: Vec3, ez: Vec3) -> Self {
        Self { ex, ey, ez }
    }

    /// Creates a zero matrix
    #[inline]
    pub const fn zero() -> Self {
        Self {
            ex: Vec3::zero(),
            ey: Vec3::zero(),
            ez: Vec3::zero(),
        }
    }

    /// Multiplies this matrix by a vector
    #[inline]
    pub fn mul_vec(&self, v: Vec3) -> Vec3 {
        self.ex * v.x + self.ey * v.y + self.ez * v.z
    }

    /// Multiplies the upper-left 2x2 block of this matrix by a vector
    #[inline]
    pub fn mul_vec2(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Solves A * x = b for x using Cramer's rule
    pub fn solve33(&self, b: Vec3) -> Vec3 {
        let mut det = self.ex.dot(&self.ey.cross(&self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }

        Vec3::new(
            det * b.dot(&self.ey.cross(&self.ez)),
            det * self.ex.dot(&b.cross(&self.ez)),
            det * self.ex.dot(&self.ey.cross(&b)),
        )
    }

    /// Solves the 2x2 sub-problem A * x = b using Cramer's rule
    pub fn solve22(&self, b: Vec2) -> Vec2 {
        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a21 = self.ex.y;
        let a22 = self.ey.y;

        let det = a11 * a22 - a12 * a21;
        let inv_det = if det != 0.0 { 1.0 / det } else { 0.0 };

        Vec2::new(
            inv_det * (a22 * b.x - a12 * b.y),
            inv_det * (a11 * b.y - a21 * b.x),
        )
    }

    /// Writes the inverse of the upper-left 2x2 block into the output,
    /// degrading to zero rows when singular
    pub fn symmetric_inverse22(&self) -> Self {
        let a = self.ex.x;
        let b = self.ey.x;
        let c = self.ey.y;

        let mut det = a * c - b * b;
        if det != 0.0 {
            det = 1.0 / det;
        }

        Self {
            ex: Vec3::new(det * c, -det * b, 0.0),
            ey: Vec3::new(-det * b, det * a, 0.0),
            ez: Vec3::zero(),
        }
    }

    /// Returns the inverse of this matrix treated as symmetric,
    /// degrading to the zero matrix when singular
    pub fn symmetric_inverse33(&self) -> Self {
        let mut det = self.ex.dot(&self.ey.cross(&self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }

        let a11 = self.ex.x;
        let a12 = self.ey.x;
        let a13 = self.ez.x;
        let a22 = self.ey.y;
        let a23 = self.ez.y;
        let a33 = self.ez.z;

        let ex = Vec3::new(
            det * (a22 * a33 - a23 * a23),
            det * (a13 * a23 - a12 * a33),
            det * (a12 * a23 - a13 * a22),
        );
        let ey = Vec3::new(
            ex.y,
            det * (a11 * a33 - a13 * a13),
            det * (a13 * a12 - a11 * a23),
        );
        let ez = Vec3::new(ex.z, ey.z, det * (a11 * a22 - a12 * a12));

        Self { ex, ey, ez }
    }
}
