use approx::assert_relative_eq;
use rigid2d::collision::{
    collide_circles, collide_edge_circle, collide_polygon_circle, collide_polygons, distance,
    BroadPhase, DynamicTree, ManifoldKind, SimplexCache, WorldManifold,
};
use rigid2d::math::{Aabb, RayCastInput, Transform, Vec2};
use rigid2d::shapes::{Circle, Edge, Polygon, Shape};

#[test]
fn test_circle_mass_data() {
    let circle = Circle::new(2.0);
    let density = 1.5;
    let mass_data = circle.compute_mass(density);

    let expected_mass = density * std::f32::consts::PI * 4.0;
    assert_relative_eq!(mass_data.mass, expected_mass, epsilon = 1e-3);
    assert_eq!(mass_data.center, Vec2::zero());
    // I = m * r^2 / 2 for a centered disc
    assert_relative_eq!(mass_data.inertia, expected_mass * 2.0, epsilon = 1e-2);

    // Off-center circle picks up the parallel-axis term
    let offset = Circle::with_center(Vec2::new(3.0, 0.0), 2.0);
    let offset_data = offset.compute_mass(density);
    assert_relative_eq!(
        offset_data.inertia,
        expected_mass * (2.0 + 9.0),
        epsilon = 1e-1
    );
}

#[test]
fn test_rectangle_mass_data() {
    // A 8x2 box of density 2.1: area 16, polar moment 90.666.
    let shape = Polygon::new_box(4.0, 1.0);
    let density = 2.1;
    let mass_data = shape.compute_mass(density);

    assert_relative_eq!(mass_data.mass, density * 16.0, epsilon = 1e-3);
    assert_relative_eq!(mass_data.center.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(mass_data.center.y, 0.0, epsilon = 1e-5);

    let area_moment = (8.0 * 2.0_f32.powi(3)) / 12.0 + (8.0_f32.powi(3) * 2.0) / 12.0;
    assert_relative_eq!(mass_data.inertia, density * area_moment, epsilon = 1e-2);
}

#[test]
fn test_polygon_from_points_builds_hull() {
    // Unordered square corners
    let points = [
        Vec2::new(1.0, 1.0),
        Vec2::new(-1.0, -1.0),
        Vec2::new(1.0, -1.0),
        Vec2::new(-1.0, 1.0),
    ];
    let polygon = Polygon::new(&points);

    assert_eq!(polygon.vertex_count(), 4);
    assert_relative_eq!(polygon.centroid().x, 0.0, epsilon = 1e-5);

    // Counter-clockwise winding with outward unit normals
    for (i, normal) in polygon.normals().iter().enumerate() {
        assert_relative_eq!(normal.length(), 1.0, epsilon = 1e-5);
        let v = polygon.vertices()[i];
        assert!(normal.dot(&v) > 0.0);
    }
}

#[test]
fn test_circle_circle_manifold() {
    let a = Circle::new(1.0);
    let b = Circle::new(1.0);

    let xf_a = Transform::from_position(Vec2::new(0.0, 0.0));
    let touching = Transform::from_position(Vec2::new(1.5, 0.0));
    let apart = Transform::from_position(Vec2::new(3.0, 0.0));

    let manifold = collide_circles(&a, &xf_a, &b, &touching);
    assert_eq!(manifold.point_count(), 1);
    assert_eq!(manifold.kind, ManifoldKind::Circles);

    let world = WorldManifold::new(&manifold, &xf_a, a.radius, &touching, b.radius);
    assert_relative_eq!(world.normal.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(world.separations[0], -0.5, epsilon = 1e-5);

    let empty = collide_circles(&a, &xf_a, &b, &apart);
    assert_eq!(empty.point_count(), 0);
}

#[test]
fn test_polygon_circle_manifold() {
    let polygon = Polygon::new_box(1.0, 1.0).with_vertex_radius(0.0);
    let circle = Circle::new(0.5);

    let xf_a = Transform::identity();
    // Circle resting on top of the box, slightly overlapping
    let xf_b = Transform::from_position(Vec2::new(0.0, 1.4));

    let manifold = collide_polygon_circle(&polygon, &xf_a, &circle, &xf_b);
    assert_eq!(manifold.point_count(), 1);
    assert_eq!(manifold.kind, ManifoldKind::FaceA);

    let world = WorldManifold::new(&manifold, &xf_a, 0.0, &xf_b, circle.radius);
    assert_relative_eq!(world.normal.y, 1.0, epsilon = 1e-4);
    assert!(world.separations[0] < 0.0);

    // Far away: no points
    let far = Transform::from_position(Vec2::new(0.0, 5.0));
    assert_eq!(collide_polygon_circle(&polygon, &xf_a, &circle, &far).point_count(), 0);
}

#[test]
fn test_resting_squares_manifold() {
    // Two half-extent-2 squares exactly touching at x = 0.
    let square = Polygon::new_box(2.0, 2.0).with_vertex_radius(0.0);
    let xf_a = Transform::from_position(Vec2::new(-2.0, 0.0));
    let xf_b = Transform::from_position(Vec2::new(2.0, 0.0));

    let manifold = collide_polygons(&square, &xf_a, &square, &xf_b);

    assert_eq!(manifold.kind, ManifoldKind::FaceA);
    assert_eq!(manifold.point_count(), 2);

    let world = WorldManifold::new(&manifold, &xf_a, 0.0, &xf_b, 0.0);
    assert_relative_eq!(world.normal.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(world.normal.length(), 1.0, epsilon = 1e-5);
    for i in 0..world.point_count {
        assert_relative_eq!(world.separations[i], 0.0, epsilon = 1e-5);
    }
}

#[test]
fn test_overlapping_squares_manifold() {
    let square = Polygon::new_box(2.0, 2.0).with_vertex_radius(0.0);
    let xf_a = Transform::from_position(Vec2::new(99.0, 0.0));
    let xf_b = Transform::from_position(Vec2::new(101.0, 0.0));

    let manifold = collide_polygons(&square, &xf_a, &square, &xf_b);
    assert_eq!(manifold.point_count(), 2);

    let world = WorldManifold::new(&manifold, &xf_a, 0.0, &xf_b, 0.0);
    for i in 0..world.point_count {
        assert_relative_eq!(world.separations[i], -2.0, epsilon = 1e-4);
    }
}

#[test]
fn test_edge_circle_one_sided() {
    let circle = Circle::new(0.3);
    let xf_a = Transform::identity();
    // Circle just beyond the first endpoint
    let xf_b = Transform::from_position(Vec2::new(-0.2, 0.0));

    // A free-standing edge collides at its endpoint
    let free_edge = Edge::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
    let manifold = collide_edge_circle(&free_edge, &xf_a, &circle, &xf_b);
    assert_eq!(manifold.point_count(), 1);

    // The same edge inside a chain defers to its neighbor
    let chained_edge = Edge::with_ghosts(
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Some(Vec2::new(-1.0, 0.0)),
        None,
    );
    let manifold = collide_edge_circle(&chained_edge, &xf_a, &circle, &xf_b);
    assert_eq!(manifold.point_count(), 0);
}

#[test]
fn test_gjk_distance_between_squares() {
    let square = Polygon::new_box(0.5, 0.5).with_vertex_radius(0.0);
    let proxy_a = square.distance_proxy(0);
    let proxy_b = square.distance_proxy(0);

    let xf_a = Transform::identity();
    let xf_b = Transform::from_position(Vec2::new(3.0, 0.0));

    let mut cache = SimplexCache::new();
    let output = distance(&mut cache, &proxy_a, &xf_a, &proxy_b, &xf_b, true);

    // Face-to-face gap of 2
    assert_relative_eq!(output.distance, 2.0, epsilon = 1e-4);
    assert_relative_eq!(output.point_a.x, 0.5, epsilon = 1e-4);
    assert_relative_eq!(output.point_b.x, 2.5, epsilon = 1e-4);
}

#[test]
fn test_gjk_distance_monotone_on_approach() {
    let square = Polygon::new_box(0.5, 0.5).with_vertex_radius(0.0);
    let proxy_a = square.distance_proxy(0);
    let proxy_b = square.distance_proxy(0);

    let xf_a = Transform::identity();
    let mut cache = SimplexCache::new();
    let mut previous = f32::MAX;

    // Slide B toward A; the witness distance never increases.
    let mut x = 5.0;
    while x > 1.05 {
        let xf_b = Transform::from_position(Vec2::new(x, 0.0));
        let output = distance(&mut cache, &proxy_a, &xf_a, &proxy_b, &xf_b, true);
        assert!(output.distance <= previous + 1e-4);
        assert_relative_eq!(output.distance, x - 1.0, epsilon = 1e-3);
        previous = output.distance;
        x -= 0.05;
    }

    // Overlapping configurations report zero.
    let xf_b = Transform::from_position(Vec2::new(0.5, 0.0));
    let output = distance(&mut cache, &proxy_a, &xf_a, &proxy_b, &xf_b, true);
    assert_relative_eq!(output.distance, 0.0, epsilon = 1e-5);
}

#[test]
fn test_dynamic_tree_query() {
    let mut tree: DynamicTree<u32> = DynamicTree::new();

    let mut ids = Vec::new();
    for i in 0..10 {
        let x = i as f32 * 3.0;
        let aabb = Aabb::new(Vec2::new(x, 0.0), Vec2::new(x + 1.0, 1.0));
        ids.push(tree.create_proxy(&aabb, i));
    }

    // The tree stays shallow and balanced.
    assert!(tree.height() <= 6);
    assert!(tree.max_balance() <= 2);
    assert!(tree.area_ratio() >= 1.0);

    // Query covering roughly the first three proxies.
    let query = Aabb::new(Vec2::new(-0.5, 0.0), Vec2::new(6.5, 1.0));
    let mut found = Vec::new();
    tree.query(&query, |id| {
        found.push(*tree.user_data(id));
        true
    });
    found.sort_unstable();
    assert_eq!(found, vec![0, 1, 2]);

    // Destroy and re-query
    for id in ids {
        tree.destroy_proxy(id);
    }
    let mut count = 0;
    tree.query(&query, |_| {
        count += 1;
        true
    });
    assert_eq!(count, 0);
}

#[test]
fn test_dynamic_tree_move_hysteresis() {
    let mut tree: DynamicTree<u32> = DynamicTree::new();
    let aabb = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));
    let id = tree.create_proxy(&aabb, 7);

    // A tiny move stays within the fat AABB.
    let nudged = Aabb::new(Vec2::new(0.01, 0.0), Vec2::new(1.01, 1.0));
    assert!(!tree.move_proxy(id, &nudged, Vec2::new(0.01, 0.0)));

    // A large move forces re-insertion.
    let far = Aabb::new(Vec2::new(5.0, 0.0), Vec2::new(6.0, 1.0));
    assert!(tree.move_proxy(id, &far, Vec2::new(5.0, 0.0)));
}

#[test]
fn test_dynamic_tree_ray_cast() {
    let mut tree: DynamicTree<u32> = DynamicTree::new();
    tree.create_proxy(&Aabb::new(Vec2::new(2.0, -1.0), Vec2::new(3.0, 1.0)), 0);
    tree.create_proxy(&Aabb::new(Vec2::new(6.0, -1.0), Vec2::new(7.0, 1.0)), 1);

    let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
    let mut visited = Vec::new();
    tree.ray_cast(&input, |sub_input, id| {
        visited.push(*tree.user_data(id));
        sub_input.max_fraction
    });

    visited.sort_unstable();
    assert_eq!(visited, vec![0, 1]);
}

#[test]
fn test_broad_phase_emits_each_pair_once() {
    let mut broad_phase: BroadPhase<u32> = BroadPhase::new();

    // Two overlapping proxies and one far away.
    broad_phase.create_proxy(&Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)), 0);
    broad_phase.create_proxy(&Aabb::new(Vec2::new(0.5, 0.0), Vec2::new(1.5, 1.0)), 1);
    broad_phase.create_proxy(&Aabb::new(Vec2::new(50.0, 0.0), Vec2::new(51.0, 1.0)), 2);

    let mut pairs = Vec::new();
    broad_phase.update_pairs(|a, b| {
        let pair = (*a.min(b), *a.max(b));
        pairs.push(pair);
    });
    assert_eq!(pairs, vec![(0, 1)]);

    // Nothing moved: no pairs on the next update.
    let mut count = 0;
    broad_phase.update_pairs(|_, _| count += 1);
    assert_eq!(count, 0);
}

#[test]
fn test_polygon_ray_cast() {
    let polygon = Polygon::new_box(1.0, 1.0);
    let xf = Transform::from_position(Vec2::new(5.0, 0.0));

    let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
    let output = polygon.ray_cast(&input, &xf, 0).expect("ray should hit");

    assert_relative_eq!(output.fraction, 0.4, epsilon = 1e-5);
    assert_relative_eq!(output.normal.x, -1.0, epsilon = 1e-5);

    // Ray starting past the shape misses
    let input = RayCastInput::new(Vec2::new(7.0, 0.0), Vec2::new(10.0, 0.0));
    assert!(polygon.ray_cast(&input, &xf, 0).is_none());
}

#[test]
fn test_circle_ray_cast() {
    let circle = Circle::new(1.0);
    let xf = Transform::from_position(Vec2::new(4.0, 0.0));

    let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
    let output = circle.ray_cast(&input, &xf, 0).expect("ray should hit");

    assert_relative_eq!(output.fraction, 0.3, epsilon = 1e-5);
    assert_relative_eq!(output.normal.x, -1.0, epsilon = 1e-4);
}
