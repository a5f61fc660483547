use crate::collision::{ContactFeature, Manifold, ManifoldKind};
use crate::math::Transform;
use crate::shapes::Shape;
use crate::shapes::{Circle, Polygon};

/// Computes the manifold between two circles
pub fn collide_circles(
    circle_a: &Circle,
    xf_a: &Transform,
    circle_b: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::new(ManifoldKind::Circles);

    let p_a = xf_a.transform_point(circle_a.center);
    let p_b = xf_b.transform_point(circle_b.center);

    let distance_squared = p_a.distance_squared(&p_b);
    let radius = circle_a.radius + circle_b.radius;
    if distance_squared > radius * radius {
        return manifold;
    }

    manifold.local_point = circle_a.center;
    manifold.add_point(circle_b.center, ContactFeature::vertex_vertex(0, 0));
    manifold
}

/// Computes the manifold between a polygon and a circle
pub fn collide_polygon_circle(
    polygon: &Polygon,
    xf_a: &Transform,
    circle: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::new(ManifoldKind::FaceA);

    // Circle center in the polygon's frame.
    let c = xf_b.transform_point(circle.center);
    let c_local = xf_a.inverse_transform_point(c);

    let radius = polygon.vertex_radius() + circle.radius;
    let vertices = polygon.vertices();
    let normals = polygon.normals();
    let count = vertices.len();

    // Face of maximum separation from the circle center.
    let mut normal_index = 0;
    let mut separation = f32::MIN;
    for i in 0..count {
        let s = normals[i].dot(&(c_local - vertices[i]));
        if s > radius {
            return manifold;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = vertices[normal_index];
    let v2 = vertices[(normal_index + 1) % count];
    let feature = ContactFeature::face_vertex(normal_index as u8, 0);

    // Center inside the polygon: use the deepest face directly.
    if separation < crate::math::EPSILON {
        manifold.local_normal = normals[normal_index];
        manifold.local_point = (v1 + v2) * 0.5;
        manifold.add_point(circle.center, feature);
        return manifold;
    }

    // Otherwise the closest feature may be either face vertex.
    let u1 = (c_local - v1).dot(&(v2 - v1));
    let u2 = (c_local - v2).dot(&(v1 - v2));

    if u1 <= 0.0 {
        if c_local.distance_squared(&v1) > radius * radius {
            return manifold;
        }
        manifold.local_normal = (c_local - v1).normalize();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(&v2) > radius * radius {
            return manifold;
        }
        manifold.local_normal = (c_local - v2).normalize();
        manifold.local_point = v2;
    } else {
        let face_center = (v1 + v2) * 0.5;
        if (c_local - face_center).dot(&normals[normal_index]) > radius {
            return manifold;
        }
        manifold.local_normal = normals[normal_index];
        manifold.local_point = face_center;
    }

    manifold.add_point(circle.center, feature);
    manifold
}
