use crate::math::{Transform, Vec2};

/// Maximum number of contact points in a manifold
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Identifies whether a contact feature is a vertex or a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureKind {
    #[default]
    Vertex,
    Face,
}

/// Names the vertex or face pair that produced a contact point
///
/// Features stay stable while the same geometry keeps touching, which
/// lets the solver match accumulated impulses across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactFeature {
    pub kind_a: FeatureKind,
    pub kind_b: FeatureKind,
    pub index_a: u8,
    pub index_b: u8,
}

impl ContactFeature {
    /// Creates a feature pairing two vertices
    pub fn vertex_vertex(index_a: u8, index_b: u8) -> Self {
        Self {
            kind_a: FeatureKind::Vertex,
            kind_b: FeatureKind::Vertex,
            index_a,
            index_b,
        }
    }

    /// Creates a feature pairing a face on A with a vertex on B
    pub fn face_vertex(index_a: u8, index_b: u8) -> Self {
        Self {
            kind_a: FeatureKind::Face,
            kind_b: FeatureKind::Vertex,
            index_a,
            index_b,
        }
    }

    /// Returns this feature with the A and B roles exchanged
    pub fn swapped(&self) -> Self {
        Self {
            kind_a: self.kind_b,
            kind_b: self.kind_a,
            index_a: self.index_b,
            index_b: self.index_a,
        }
    }
}

/// A single contact point within a manifold
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManifoldPoint {
    /// Contact location in the frame of the non-reference shape
    ///
    /// For `Circles` this is the center of circle B; for `FaceA` it is
    /// a clipped point in B's frame, and for `FaceB` in A's frame.
    pub local_point: Vec2,

    /// Accumulated normal impulse, kept for warm starting
    pub normal_impulse: f32,

    /// Accumulated tangent impulse, kept for warm starting
    pub tangent_impulse: f32,

    /// Feature identifier used to match points across frames
    pub feature: ContactFeature,
}

/// The kind of a manifold, naming which shape holds the reference face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifoldKind {
    #[default]
    Circles,
    FaceA,
    FaceB,
}

/// A compact description of up to two contact points between two shapes
///
/// The normal and reference point are stored in the local frame of the
/// reference shape so the manifold stays valid while bodies move
/// between narrow-phase updates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Manifold {
    /// The manifold kind
    pub kind: ManifoldKind,

    /// Normal in the reference shape's frame (unused for `Circles`)
    pub local_normal: Vec2,

    /// Reference point: circle A center or a point on the reference face
    pub local_point: Vec2,

    points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    point_count: usize,
}

impl Manifold {
    /// Creates an empty manifold of the given kind
    pub fn new(kind: ManifoldKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Returns the number of contact points
    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Returns the contact points
    #[inline]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    /// Returns the contact points mutably
    #[inline]
    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points[..self.point_count]
    }

    /// Appends a contact point
    pub fn add_point(&mut self, local_point: Vec2, feature: ContactFeature) {
        debug_assert!(self.point_count < MAX_MANIFOLD_POINTS);
        self.points[self.point_count] = ManifoldPoint {
            local_point,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            feature,
        };
        self.point_count += 1;
    }

    /// Clears all contact points
    pub fn clear(&mut self) {
        self.point_count = 0;
    }
}

/// A manifold evaluated in world coordinates at specific transforms
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldManifold {
    /// World-space contact normal pointing from A to B
    pub normal: Vec2,

    /// World-space contact points
    pub points: [Vec2; MAX_MANIFOLD_POINTS],

    /// Signed separation at each point (negative when overlapping)
    pub separations: [f32; MAX_MANIFOLD_POINTS],

    /// Number of valid points
    pub point_count: usize,
}

impl WorldManifold {
    /// Evaluates a manifold at the given transforms and shape radii
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut result = Self {
            point_count: manifold.point_count(),
            ..Default::default()
        };

        if manifold.point_count() == 0 {
            return result;
        }

        match manifold.kind {
            ManifoldKind::Circles => {
                let point_a = xf_a.transform_point(manifold.local_point);
                let point_b = xf_b.transform_point(manifold.points()[0].local_point);

                result.normal = if point_a.distance_squared(&point_b)
                    > crate::math::EPSILON * crate::math::EPSILON
                {
                    (point_b - point_a).normalize()
                } else {
                    Vec2::unit_x()
                };

                let c_a = point_a + result.normal * radius_a;
                let c_b = point_b - result.normal * radius_b;
                result.points[0] = (c_a + c_b) * 0.5;
                result.separations[0] = (c_b - c_a).dot(&result.normal);
            }
            ManifoldKind::FaceA => {
                result.normal = xf_a.transform_direction(manifold.local_normal);
                let plane_point = xf_a.transform_point(manifold.local_point);

                for (i, point) in manifold.points().iter().enumerate() {
                    let clip_point = xf_b.transform_point(point.local_point);
                    let c_a = clip_point
                        + result.normal * (radius_a - (clip_point - plane_point).dot(&result.normal));
                    let c_b = clip_point - result.normal * radius_b;
                    result.points[i] = (c_a + c_b) * 0.5;
                    result.separations[i] = (c_b - c_a).dot(&result.normal);
                }
            }
            ManifoldKind::FaceB => {
                let normal = xf_b.transform_direction(manifold.local_normal);
                let plane_point = xf_b.transform_point(manifold.local_point);

                for (i, point) in manifold.points().iter().enumerate() {
                    let clip_point = xf_a.transform_point(point.local_point);
                    let c_b = clip_point
                        + normal * (radius_b - (clip_point - plane_point).dot(&normal));
                    let c_a = clip_point - normal * radius_a;
                    result.points[i] = (c_a + c_b) * 0.5;
                    result.separations[i] = (c_a - c_b).dot(&normal);
                }

                // Report the normal pointing from A to B.
                result.normal = -normal;
            }
        }

        result
    }
}

/// A vertex flowing through the face clipping pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipVertex {
    /// World-space vertex position
    pub vertex: Vec2,

    /// Feature describing how this vertex was produced
    pub feature: ContactFeature,
}

/// Clips a two-vertex segment against a half plane
///
/// Returns the clipped vertices; fewer than two means the segment was
/// entirely outside the plane and clipping failed.
pub fn clip_segment_to_line(
    input: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: u8,
) -> ([ClipVertex; 2], usize) {
    let mut output = [ClipVertex::default(); 2];
    let mut count = 0;

    // Signed distances of both endpoints to the plane.
    let distance0 = normal.dot(&input[0].vertex) - offset;
    let distance1 = normal.dot(&input[1].vertex) - offset;

    if distance0 <= 0.0 {
        output[count] = input[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        output[count] = input[1];
        count += 1;
    }

    if distance0 * distance1 < 0.0 {
        // The segment straddles the plane; emit the intersection.
        let interp = distance0 / (distance0 - distance1);
        output[count] = ClipVertex {
            vertex: input[0].vertex + (input[1].vertex - input[0].vertex) * interp,
            feature: ContactFeature {
                kind_a: FeatureKind::Vertex,
                kind_b: FeatureKind::Face,
                index_a: vertex_index_a,
                index_b: input[0].feature.index_b,
            },
        };
        count += 1;
    }

    (output, count)
}
