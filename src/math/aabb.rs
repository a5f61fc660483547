use crate::math::{RayCastInput, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box used by the broad-phase and queries
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner of the box
    pub min: Vec2,

    /// Maximum corner of the box
    pub max: Vec2,
}

impl Aabb {
    /// Creates a new AABB from minimum and maximum corners
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates an AABB centered at a position with the given half extents
    #[inline]
    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Creates an AABB enclosing a set of points
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min = points[0];
        let mut max = points[0];

        for point in points.iter().skip(1) {
            min = min.min(point);
            max = max.max(point);
        }

        Some(Self { min, max })
    }

    /// Returns the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Returns the extents of the AABB in each dimension
    #[inline]
    pub fn extents(&self) -> Vec2 {
        self.max - self.min
    }

    /// Returns half the extents of the AABB in each dimension
    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        self.extents() * 0.5
    }

    /// Returns the perimeter of the AABB
    #[inline]
    pub fn perimeter(&self) -> f32 {
        let extents = self.extents();
        2.0 * (extents.x + extents.y)
    }

    /// Checks if this AABB contains a point
    #[inline]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Checks if this AABB fully contains another AABB
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Checks if this AABB overlaps another AABB
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Returns the union of this AABB with another
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(&other.min),
            max: self.max.max(&other.max),
        }
    }

    /// Expands this AABB to include another AABB
    #[inline]
    pub fn include(&mut self, other: &Self) {
        self.min = self.min.min(&other.min);
        self.max = self.max.max(&other.max);
    }

    /// Returns this AABB grown by a margin in all directions
    #[inline]
    pub fn expand(&self, margin: f32) -> Self {
        let margin_vec = Vec2::new(margin, margin);
        Self {
            min: self.min - margin_vec,
            max: self.max + margin_vec,
        }
    }

    /// Returns this AABB displaced along a motion vector
    ///
    /// The box is stretched to cover both endpoints of the motion.
    pub fn displace(&self, displacement: Vec2) -> Self {
        let mut result = *self;
        if displacement.x < 0.0 {
            result.min.x += displacement.x;
        } else {
            result.max.x += displacement.x;
        }
        if displacement.y < 0.0 {
            result.min.y += displacement.y;
        } else {
            result.max.y += displacement.y;
        }
        result
    }

    /// Performs a slab test of a ray segment against this AABB
    ///
    /// Returns the entry fraction when the segment hits the box within
    /// `[0, max_fraction]`.
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<f32> {
        let mut t_min = f32::MIN;
        let mut t_max = f32::MAX;

        let p = input.p1;
        let d = input.p2 - input.p1;

        for axis in 0..2 {
            let (p_i, d_i, min_i, max_i) = if axis == 0 {
                (p.x, d.x, self.min.x, self.max.x)
            } else {
                (p.y, d.y, self.min.y, self.max.y)
            };

            if d_i.abs() < crate::math::EPSILON {
                // Parallel ray misses unless it starts inside the slab.
                if p_i < min_i || p_i > max_i {
                    return None;
                }
            } else {
                let inv_d = 1.0 / d_i;
                let mut t1 = (min_i - p_i) * inv_d;
                let mut t2 = (max_i - p_i) * inv_d;

                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }

                t_min = t_min.max(t1);
                t_max = t_max.min(t2);

                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_min < 0.0 || t_min > input.max_fraction {
            return None;
        }

        Some(t_min)
    }
}
