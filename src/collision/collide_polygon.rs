use crate::collision::{
    clip_segment_to_line, ClipVertex, ContactFeature, FeatureKind, Manifold, ManifoldKind,
};
use crate::core::LINEAR_SLOP;
use crate::math::Transform;
use crate::shapes::Shape;
use crate::shapes::Polygon;

/// Finds the face of `poly1` with the maximum separation from `poly2`
///
/// Returns the best separation and the index of the face that realizes
/// it. A positive result larger than the combined radii proves the
/// polygons disjoint.
fn find_max_separation(
    poly1: &Polygon,
    xf1: &Transform,
    poly2: &Polygon,
    xf2: &Transform,
) -> (f32, usize) {
    let vertices1 = poly1.vertices();
    let normals1 = poly1.normals();
    let vertices2 = poly2.vertices();

    // Work in poly2's frame to transform each candidate only once.
    let xf = xf1.relative_to(xf2);

    let mut best_index = 0;
    let mut max_separation = f32::MIN;

    for i in 0..vertices1.len() {
        let n = xf.transform_direction(normals1[i]);
        let v1 = xf.transform_point(vertices1[i]);

        let mut min_dot = f32::MAX;
        for v2 in vertices2 {
            let dot = n.dot(&(*v2 - v1));
            if dot < min_dot {
                min_dot = dot;
            }
        }

        if min_dot > max_separation {
            max_separation = min_dot;
            best_index = i;
        }
    }

    (max_separation, best_index)
}

/// Finds the edge of `poly2` most anti-parallel to the reference normal
fn find_incident_edge(
    poly1: &Polygon,
    xf1: &Transform,
    edge1: usize,
    poly2: &Polygon,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    let normals1 = poly1.normals();
    let vertices2 = poly2.vertices();
    let normals2 = poly2.normals();
    let count2 = vertices2.len();

    // Reference normal in poly2's frame.
    let normal1 = xf2
        .rotation
        .inverse_rotate(xf1.transform_direction(normals1[edge1]));

    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, n) in normals2.iter().enumerate() {
        let dot = normal1.dot(n);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = (index + 1) % count2;

    [
        ClipVertex {
            vertex: xf2.transform_point(vertices2[i1]),
            feature: ContactFeature {
                kind_a: FeatureKind::Face,
                kind_b: FeatureKind::Vertex,
                index_a: edge1 as u8,
                index_b: i1 as u8,
            },
        },
        ClipVertex {
            vertex: xf2.transform_point(vertices2[i2]),
            feature: ContactFeature {
                kind_a: FeatureKind::Face,
                kind_b: FeatureKind::Vertex,
                index_a: edge1 as u8,
                index_b: i2 as u8,
            },
        },
    ]
}

/// Computes the manifold between two convex polygons
///
/// The reference face is the one with the largest separating axis;
/// B's face wins only when it beats A's by a small bias, which keeps
/// the choice stable when the axes are nearly tied.
pub fn collide_polygons(
    poly_a: &Polygon,
    xf_a: &Transform,
    poly_b: &Polygon,
    xf_b: &Transform,
) -> Manifold {
    let total_radius = poly_a.vertex_radius() + poly_b.vertex_radius();

    let (separation_a, edge_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return Manifold::new(ManifoldKind::FaceA);
    }

    let (separation_b, edge_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return Manifold::new(ManifoldKind::FaceA);
    }

    let (poly1, poly2, xf1, xf2, edge1, kind, flip);
    if separation_b > separation_a + 0.1 * LINEAR_SLOP {
        poly1 = poly_b;
        poly2 = poly_a;
        xf1 = xf_b;
        xf2 = xf_a;
        edge1 = edge_b;
        kind = ManifoldKind::FaceB;
        flip = true;
    } else {
        poly1 = poly_a;
        poly2 = poly_b;
        xf1 = xf_a;
        xf2 = xf_b;
        edge1 = edge_a;
        kind = ManifoldKind::FaceA;
        flip = false;
    }

    let mut manifold = Manifold::new(kind);

    let incident_edge = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let vertices1 = poly1.vertices();
    let count1 = vertices1.len();
    let iv1 = edge1;
    let iv2 = (edge1 + 1) % count1;

    let mut v11 = vertices1[iv1];
    let mut v12 = vertices1[iv2];

    let local_tangent = (v12 - v11).normalize();
    let local_normal = local_tangent.right_perpendicular();
    let plane_point = (v11 + v12) * 0.5;

    let tangent = xf1.transform_direction(local_tangent);
    let normal = tangent.right_perpendicular();

    v11 = xf1.transform_point(v11);
    v12 = xf1.transform_point(v12);

    let front_offset = normal.dot(&v11);

    // Side plane offsets extended by the rounding radius.
    let side_offset1 = -tangent.dot(&v11) + total_radius;
    let side_offset2 = tangent.dot(&v12) + total_radius;

    let (clip1, count) = clip_segment_to_line(&incident_edge, -tangent, side_offset1, iv1 as u8);
    if count < 2 {
        return manifold;
    }

    let (clip2, count) = clip_segment_to_line(&clip1, tangent, side_offset2, iv2 as u8);
    if count < 2 {
        return manifold;
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    for clip in &clip2 {
        let separation = normal.dot(&clip.vertex) - front_offset;
        if separation <= total_radius {
            let local_point = xf2.inverse_transform_point(clip.vertex);
            let feature = if flip {
                clip.feature.swapped()
            } else {
                clip.feature
            };
            manifold.add_point(local_point, feature);
        }
    }

    manifold
}
