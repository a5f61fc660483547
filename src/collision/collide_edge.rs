use crate::collision::{
    clip_segment_to_line, ClipVertex, ContactFeature, FeatureKind, Manifold, ManifoldKind,
};
use crate::core::LINEAR_SLOP;
use crate::math::{Transform, Vec2};
use crate::shapes::Shape;
use crate::shapes::{Circle, Edge, Polygon};

/// Computes the manifold between an edge and a circle
///
/// Ghost vertices make the edge one-sided: a circle beyond an endpoint
/// that the neighboring chain segment owns produces no contact here.
pub fn collide_edge_circle(
    edge: &Edge,
    xf_a: &Transform,
    circle: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::new(ManifoldKind::Circles);

    // Circle center in the edge's frame.
    let q = xf_a.inverse_transform_point(xf_b.transform_point(circle.center));

    let a = edge.vertex1;
    let b = edge.vertex2;
    let e = b - a;

    // Barycentric coordinates of the projection onto the segment.
    let u = e.dot(&(b - q));
    let v = e.dot(&(q - a));

    let radius = edge.vertex_radius + circle.radius;

    if v <= 0.0 {
        // Region A: closest to the first endpoint.
        let d = q - a;
        if d.length_squared() > radius * radius {
            return manifold;
        }

        // The previous chain segment owns contacts beyond this end.
        if let Some(ghost) = edge.ghost1 {
            let e1 = a - ghost;
            if e1.dot(&(a - q)) > 0.0 {
                return manifold;
            }
        }

        manifold.local_point = a;
        manifold.add_point(circle.center, ContactFeature::vertex_vertex(0, 0));
        return manifold;
    }

    if u <= 0.0 {
        // Region B: closest to the second endpoint.
        let d = q - b;
        if d.length_squared() > radius * radius {
            return manifold;
        }

        if let Some(ghost) = edge.ghost2 {
            let e2 = ghost - b;
            if e2.dot(&(q - b)) > 0.0 {
                return manifold;
            }
        }

        manifold.local_point = b;
        manifold.add_point(circle.center, ContactFeature::vertex_vertex(1, 0));
        return manifold;
    }

    // Region AB: closest to the interior of the segment.
    let den = e.length_squared();
    debug_assert!(den > 0.0);
    let p = (a * u + b * v) / den;
    let d = q - p;
    if d.length_squared() > radius * radius {
        return manifold;
    }

    let mut n = Vec2::new(-e.y, e.x);
    if n.dot(&(q - a)) < 0.0 {
        n = -n;
    }

    manifold.kind = ManifoldKind::FaceA;
    manifold.local_normal = n.normalize();
    manifold.local_point = a;
    manifold.add_point(circle.center, ContactFeature::face_vertex(0, 0));
    manifold
}

/// Computes the manifold between an edge and a polygon
///
/// The edge acts as a degenerate two-vertex polygon. With ghost
/// vertices present, approaches from the back side of the chain are
/// rejected outright rather than having their normals adjusted.
pub fn collide_edge_polygon(
    edge: &Edge,
    xf_a: &Transform,
    polygon: &Polygon,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::new(ManifoldKind::FaceA);

    // Bring the polygon into the edge's frame.
    let xf = xf_b.relative_to(xf_a);
    let centroid_b = xf.transform_point(polygon.centroid());

    let v1 = edge.vertex1;
    let v2 = edge.vertex2;

    let edge_dir = (v2 - v1).normalize();
    // Front normal for a counter-clockwise chain winding.
    let front_normal = Vec2::new(edge_dir.y, -edge_dir.x);
    let offset = front_normal.dot(&(centroid_b - v1));

    let one_sided = edge.ghost1.is_some() || edge.ghost2.is_some();
    if one_sided && offset < 0.0 {
        return manifold;
    }

    let vertices_b: Vec<Vec2> = polygon
        .vertices()
        .iter()
        .map(|v| xf.transform_point(*v))
        .collect();
    let normals_b: Vec<Vec2> = polygon
        .normals()
        .iter()
        .map(|n| xf.transform_direction(*n))
        .collect();

    let total_radius = edge.vertex_radius + polygon.vertex_radius();

    // Best separating axis among the edge's two candidate normals.
    let mut edge_separation = f32::MIN;
    let mut edge_normal = front_normal;
    for candidate in [front_normal, -front_normal] {
        if one_sided && candidate.dot(&front_normal) < 0.0 {
            continue;
        }
        let mut min_dot = f32::MAX;
        for v in &vertices_b {
            min_dot = min_dot.min(candidate.dot(&(*v - v1)));
        }
        if min_dot > edge_separation {
            edge_separation = min_dot;
            edge_normal = candidate;
        }
    }
    if edge_separation > total_radius {
        return manifold;
    }

    // Best separating axis among the polygon's faces.
    let mut polygon_separation = f32::MIN;
    let mut polygon_index = 0;
    for i in 0..vertices_b.len() {
        let n = normals_b[i];
        let s = (n.dot(&(v1 - vertices_b[i]))).min(n.dot(&(v2 - vertices_b[i])));
        if s > polygon_separation {
            polygon_separation = s;
            polygon_index = i;
        }
    }
    if polygon_separation > total_radius {
        return manifold;
    }

    if polygon_separation > edge_separation + 0.1 * LINEAR_SLOP {
        // Polygon face is the reference; the edge is the incident side.
        let count_b = vertices_b.len();
        let i1 = polygon_index;
        let i2 = (polygon_index + 1) % count_b;
        let ref_normal = normals_b[i1];

        let incident = [
            ClipVertex {
                vertex: v1,
                feature: ContactFeature {
                    kind_a: FeatureKind::Vertex,
                    kind_b: FeatureKind::Face,
                    index_a: 0,
                    index_b: i1 as u8,
                },
            },
            ClipVertex {
                vertex: v2,
                feature: ContactFeature {
                    kind_a: FeatureKind::Vertex,
                    kind_b: FeatureKind::Face,
                    index_a: 1,
                    index_b: i1 as u8,
                },
            },
        ];

        let rv1 = vertices_b[i1];
        let rv2 = vertices_b[i2];
        let tangent = (rv2 - rv1).normalize();

        let side_offset1 = -tangent.dot(&rv1) + total_radius;
        let side_offset2 = tangent.dot(&rv2) + total_radius;

        let (clip1, count) = clip_segment_to_line(&incident, -tangent, side_offset1, i1 as u8);
        if count < 2 {
            return manifold;
        }
        let (clip2, count) = clip_segment_to_line(&clip1, tangent, side_offset2, i2 as u8);
        if count < 2 {
            return manifold;
        }

        manifold.kind = ManifoldKind::FaceB;
        manifold.local_normal = polygon.normals()[i1];
        manifold.local_point = (polygon.vertices()[i1] + polygon.vertices()[i2]) * 0.5;

        let front_offset = ref_normal.dot(&rv1);
        for clip in &clip2 {
            let separation = ref_normal.dot(&clip.vertex) - front_offset;
            if separation <= total_radius {
                // Clip points are already in the edge's (A's) frame.
                manifold.add_point(clip.vertex, clip.feature);
            }
        }
    } else {
        // The edge is the reference face.
        let ref_normal = edge_normal;

        // Incident face: the polygon face most anti-parallel to the
        // reference normal.
        let mut incident_index = 0;
        let mut min_dot = f32::MAX;
        for (i, n) in normals_b.iter().enumerate() {
            let dot = ref_normal.dot(n);
            if dot < min_dot {
                min_dot = dot;
                incident_index = i;
            }
        }

        let count_b = vertices_b.len();
        let i1 = incident_index;
        let i2 = (incident_index + 1) % count_b;

        let incident = [
            ClipVertex {
                vertex: vertices_b[i1],
                feature: ContactFeature {
                    kind_a: FeatureKind::Face,
                    kind_b: FeatureKind::Vertex,
                    index_a: 0,
                    index_b: i1 as u8,
                },
            },
            ClipVertex {
                vertex: vertices_b[i2],
                feature: ContactFeature {
                    kind_a: FeatureKind::Face,
                    kind_b: FeatureKind::Vertex,
                    index_a: 0,
                    index_b: i2 as u8,
                },
            },
        ];

        let tangent = edge_dir;

        let side_offset1 = -tangent.dot(&v1) + total_radius;
        let side_offset2 = tangent.dot(&v2) + total_radius;

        let (clip1, count) = clip_segment_to_line(&incident, -tangent, side_offset1, 0);
        if count < 2 {
            return manifold;
        }
        let (clip2, count) = clip_segment_to_line(&clip1, tangent, side_offset2, 1);
        if count < 2 {
            return manifold;
        }

        manifold.kind = ManifoldKind::FaceA;
        manifold.local_normal = ref_normal;
        manifold.local_point = v1;

        let front_offset = ref_normal.dot(&v1);
        for clip in &clip2 {
            let separation = ref_normal.dot(&clip.vertex) - front_offset;
            if separation <= total_radius {
                // Convert back into the polygon's frame.
                let local_point = xf.inverse_transform_point(clip.vertex);
                manifold.add_point(local_point, clip.feature);
            }
        }
    }

    manifold
}
