use approx::assert_relative_eq;
use rigid2d::math::{Aabb, Mat22, Mat33, RayCastInput, Rot, Sweep, Transform, Vec2, Vec3};
use std::f32::consts::PI;

#[test]
fn test_vec2_operations() {
    let v1 = Vec2::new(1.0, 2.0);
    let v2 = Vec2::new(3.0, -4.0);

    // Addition and subtraction
    assert_eq!(v1 + v2, Vec2::new(4.0, -2.0));
    assert_eq!(v2 - v1, Vec2::new(2.0, -6.0));

    // Scalar multiplication
    assert_eq!(v1 * 2.0, Vec2::new(2.0, 4.0));
    assert_eq!(2.0 * v1, Vec2::new(2.0, 4.0));

    // Dot and cross products
    assert_eq!(v1.dot(&v2), 1.0 * 3.0 + 2.0 * -4.0);
    assert_eq!(v1.cross(&v2), 1.0 * -4.0 - 2.0 * 3.0);

    // Length
    let length = v1.length();
    assert_relative_eq!(length, 5.0_f32.sqrt());

    // Normalize
    let normalized = v1.normalize();
    assert_relative_eq!(normalized.length(), 1.0);
    assert_relative_eq!(normalized.x, v1.x / length);

    // Perpendicular vectors are orthogonal
    assert_eq!(v1.dot(&v1.perpendicular()), 0.0);
    assert_eq!(v1.dot(&v1.right_perpendicular()), 0.0);

    // Cross product identities used by the solver
    let s = 3.0;
    assert_eq!(v1.cross_scalar(s), Vec2::new(s * v1.y, -s * v1.x));
    assert_eq!(Vec2::scalar_cross(s, v1), Vec2::new(-s * v1.y, s * v1.x));
}

#[test]
fn test_mat22_solve() {
    let m = Mat22::from_entries(2.0, 1.0, 1.0, 3.0);
    let b = Vec2::new(5.0, 10.0);

    let x = m.solve(b);

    // Verify A * x == b
    let check = m.mul_vec(x);
    assert_relative_eq!(check.x, b.x, epsilon = 1e-5);
    assert_relative_eq!(check.y, b.y, epsilon = 1e-5);

    // Inverse agrees with the solve
    let inv = m.inverse();
    let x2 = inv.mul_vec(b);
    assert_relative_eq!(x.x, x2.x, epsilon = 1e-5);
    assert_relative_eq!(x.y, x2.y, epsilon = 1e-5);
}

#[test]
fn test_mat22_singular_degrades_to_zero() {
    // Rows are linearly dependent.
    let m = Mat22::from_entries(1.0, 2.0, 2.0, 4.0);
    let x = m.solve(Vec2::new(1.0, 1.0));
    assert_eq!(x, Vec2::zero());
    assert_eq!(m.inverse(), Mat22::zero());
}

#[test]
fn test_mat33_solves() {
    let m = Mat33::new(
        Vec3::new(4.0, 1.0, 0.0),
        Vec3::new(1.0, 3.0, 1.0),
        Vec3::new(0.0, 1.0, 2.0),
    );

    let b3 = Vec3::new(1.0, 2.0, 3.0);
    let x3 = m.solve33(b3);
    let check = m.mul_vec(x3);
    assert_relative_eq!(check.x, b3.x, epsilon = 1e-4);
    assert_relative_eq!(check.y, b3.y, epsilon = 1e-4);
    assert_relative_eq!(check.z, b3.z, epsilon = 1e-4);

    let b2 = Vec2::new(1.0, 2.0);
    let x2 = m.solve22(b2);
    let check2 = m.mul_vec2(x2);
    assert_relative_eq!(check2.x, b2.x, epsilon = 1e-5);
    assert_relative_eq!(check2.y, b2.y, epsilon = 1e-5);
}

#[test]
fn test_rotation() {
    let rot = Rot::from_angle(PI / 2.0);

    let rotated = rot.rotate(Vec2::unit_x());
    assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-6);

    // Inverse rotation undoes the rotation
    let back = rot.inverse_rotate(rotated);
    assert_relative_eq!(back.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(back.y, 0.0, epsilon = 1e-6);

    // Angle round trip
    assert_relative_eq!(rot.angle(), PI / 2.0, epsilon = 1e-6);

    // Composition adds angles
    let r1 = Rot::from_angle(0.3);
    let r2 = Rot::from_angle(0.5);
    assert_relative_eq!(r1.mul(r2).angle(), 0.8, epsilon = 1e-6);
    assert_relative_eq!(r1.mul_t(r2).angle(), 0.2, epsilon = 1e-6);

    // Construction from a vector with fallback
    let from_vec = Rot::from_vector(Vec2::new(0.0, 2.0), Rot::identity());
    assert_relative_eq!(from_vec.angle(), PI / 2.0, epsilon = 1e-6);
    let fallback = Rot::from_vector(Vec2::zero(), Rot::from_angle(1.0));
    assert_relative_eq!(fallback.angle(), 1.0, epsilon = 1e-6);
}

#[test]
fn test_transform_round_trip() {
    let xf = Transform::from_position_angle(Vec2::new(3.0, -2.0), 0.7);
    let point = Vec2::new(1.5, 2.5);

    let world = xf.transform_point(point);
    let back = xf.inverse_transform_point(world);

    assert_relative_eq!(back.x, point.x, epsilon = 1e-5);
    assert_relative_eq!(back.y, point.y, epsilon = 1e-5);

    // The explicit inverse agrees
    let inv = xf.inverse();
    let back2 = inv.transform_point(world);
    assert_relative_eq!(back2.x, point.x, epsilon = 1e-5);
    assert_relative_eq!(back2.y, point.y, epsilon = 1e-5);
}

#[test]
fn test_aabb_operations() {
    let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0));
    let b = Aabb::new(Vec2::new(1.0, 0.5), Vec2::new(3.0, 2.0));
    let c = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0));

    assert!(a.overlaps(&b));
    assert!(!a.overlaps(&c));

    let union = a.union(&b);
    assert_eq!(union.min, Vec2::new(0.0, 0.0));
    assert_eq!(union.max, Vec2::new(3.0, 2.0));
    assert!(union.contains(&a));
    assert!(union.contains(&b));

    assert_relative_eq!(a.perimeter(), 2.0 * (2.0 + 1.0));

    assert!(a.contains_point(Vec2::new(1.0, 0.5)));
    assert!(!a.contains_point(Vec2::new(-1.0, 0.5)));

    // Displacement stretches toward the motion
    let displaced = a.displace(Vec2::new(-1.0, 2.0));
    assert_eq!(displaced.min, Vec2::new(-1.0, 0.0));
    assert_eq!(displaced.max, Vec2::new(2.0, 3.0));
}

#[test]
fn test_aabb_ray_cast() {
    let aabb = Aabb::new(Vec2::new(1.0, -1.0), Vec2::new(2.0, 1.0));

    // Straight-on hit
    let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
    let fraction = aabb.ray_cast(&input).expect("ray should hit");
    assert_relative_eq!(fraction, 0.25, epsilon = 1e-5);

    // Miss above the box
    let input = RayCastInput::new(Vec2::new(0.0, 2.0), Vec2::new(4.0, 2.0));
    assert!(aabb.ray_cast(&input).is_none());

    // Pointing away
    let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(-4.0, 0.0));
    assert!(aabb.ray_cast(&input).is_none());
}

#[test]
fn test_sweep_interpolation() {
    let mut sweep = Sweep::new(Vec2::zero(), 0.0);
    sweep.c = Vec2::new(10.0, 0.0);
    sweep.a = PI;

    let start = sweep.transform_at(0.0);
    assert_relative_eq!(start.position.x, 0.0, epsilon = 1e-6);

    let mid = sweep.transform_at(0.5);
    assert_relative_eq!(mid.position.x, 5.0, epsilon = 1e-5);
    assert_relative_eq!(mid.rotation.angle(), PI / 2.0, epsilon = 1e-5);

    // Advancing moves the start state without touching the end state
    sweep.advance(0.5);
    assert_relative_eq!(sweep.c0.x, 5.0, epsilon = 1e-5);
    assert_relative_eq!(sweep.alpha0, 0.5);
    assert_relative_eq!(sweep.c.x, 10.0);

    // The normalized interpolation still lands on the same endpoint
    let end = sweep.transform_at(1.0);
    assert_relative_eq!(end.position.x, 10.0, epsilon = 1e-4);
}

#[test]
fn test_sweep_angle_normalization() {
    let mut sweep = Sweep::new(Vec2::zero(), 5.0 * PI);
    sweep.a = 5.0 * PI + 0.25;

    sweep.normalize_angles();

    assert!(sweep.a0 >= -2.0 * PI && sweep.a0 <= 2.0 * PI);
    // Relative angle is preserved
    assert_relative_eq!(sweep.a - sweep.a0, 0.25, epsilon = 1e-5);
}
