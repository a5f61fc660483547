use approx::assert_relative_eq;
use rigid2d::collision::Manifold;
use rigid2d::core::{Contact, ContactListener, DestructionListener, StepConf, World, WorldDef};
use rigid2d::math::{Aabb, RayCastBehavior, Vec2};
use rigid2d::shapes::{Circle, Edge, Polygon};
use rigid2d::{BodyDef, BodyHandle, BodyType, FixtureDef, FixtureId, JointHandle};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const DT: f32 = 1.0 / 60.0;

fn world_with_gravity(gravity: Vec2) -> World {
    World::new(WorldDef {
        gravity,
        ..WorldDef::default()
    })
}

fn add_box(world: &mut World, body_type: BodyType, position: Vec2, half: f32, density: f32) -> BodyHandle {
    let handle = world
        .create_body(&BodyDef::new(body_type).at(position))
        .unwrap();
    let shape = Arc::new(Polygon::new_box(half, half));
    world
        .create_fixture(handle, &FixtureDef::new(shape).with_density(density))
        .unwrap();
    handle
}

#[test]
fn test_gravity_free_fall() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let handle = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(0.0, 100.0)))
        .unwrap();
    world
        .create_fixture(handle, &FixtureDef::new(Arc::new(Circle::new(0.5))).with_density(1.0))
        .unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..60 {
        world.step(&conf);
    }

    let body = world.body(handle).unwrap();

    // Semi-implicit Euler accumulates velocity exactly
    assert_relative_eq!(body.linear_velocity().y, -10.0, epsilon = 1e-3);
    // Position lags slightly behind the analytic parabola
    assert!(body.position().y < 100.0 - 4.5);
    assert!(body.position().y > 100.0 - 5.5);
}

#[test]
fn test_static_body_never_moves() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));
    let ground = add_box(&mut world, BodyType::Static, Vec2::new(1.0, 2.0), 5.0, 0.0);
    // A dynamic box resting on it exercises the solver
    add_box(&mut world, BodyType::Dynamic, Vec2::new(1.0, 7.5), 0.5, 1.0);

    let conf = StepConf::new(DT);
    for _ in 0..120 {
        world.step(&conf);
    }

    let body = world.body(ground).unwrap();
    assert_eq!(body.position(), Vec2::new(1.0, 2.0));
    assert_eq!(body.angle(), 0.0);
}

#[test]
fn test_kinematic_body_advances_by_velocity() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let handle = world
        .create_body(
            &BodyDef::new(BodyType::Kinematic)
                .at(Vec2::zero())
                .with_linear_velocity(Vec2::new(2.0, 1.0)),
        )
        .unwrap();
    world
        .create_fixture(handle, &FixtureDef::new(Arc::new(Circle::new(0.5))))
        .unwrap();

    world.step(&StepConf::new(DT));

    let body = world.body(handle).unwrap();
    // Gravity must not touch kinematic bodies
    assert_relative_eq!(body.position().x, 2.0 * DT, epsilon = 1e-5);
    assert_relative_eq!(body.position().y, 1.0 * DT, epsilon = 1e-5);
    assert_relative_eq!(body.linear_velocity().y, 1.0);
}

#[test]
fn test_resting_squares_do_not_move() {
    // Two half-extent-2 squares exactly touching at x = 0; the
    // position solver must leave a zero-separation contact alone.
    let mut world = world_with_gravity(Vec2::zero());

    let shape = Arc::new(Polygon::new_box(2.0, 2.0).with_vertex_radius(0.0));
    let a = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(-2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(a, &FixtureDef::new(shape.clone()).with_density(1.0))
        .unwrap();
    let b = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(b, &FixtureDef::new(shape).with_density(1.0))
        .unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..10 {
        world.step(&conf);
    }

    let pos_a = world.body(a).unwrap().position();
    let pos_b = world.body(b).unwrap().position();
    assert_relative_eq!(pos_a.x, -2.0, epsilon = 1e-4);
    assert_relative_eq!(pos_a.y, 0.0, epsilon = 1e-4);
    assert_relative_eq!(pos_b.x, 2.0, epsilon = 1e-4);
    assert_relative_eq!(pos_b.y, 0.0, epsilon = 1e-4);

    // The manifold saw both face points
    let contacts = world.contact_handles();
    assert_eq!(contacts.len(), 1);
    assert_eq!(world.contact(contacts[0]).unwrap().manifold().point_count(), 2);
}

#[test]
fn test_overlapping_squares_separate_along_x() {
    let mut world = world_with_gravity(Vec2::zero());

    let shape = Arc::new(Polygon::new_box(2.0, 2.0).with_vertex_radius(0.0));
    let a = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(99.0, 0.0)))
        .unwrap();
    world
        .create_fixture(a, &FixtureDef::new(shape.clone()).with_density(1.0))
        .unwrap();
    let b = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(101.0, 0.0)))
        .unwrap();
    world
        .create_fixture(b, &FixtureDef::new(shape).with_density(1.0))
        .unwrap();

    let conf = StepConf {
        reg_position_iterations: 1,
        max_linear_correction: f32::MAX,
        ..StepConf::new(DT)
    };
    world.step(&conf);

    let pos_a = world.body(a).unwrap().position();
    let pos_b = world.body(b).unwrap().position();

    // Both pushed strictly apart on x, symmetric, no drift on y
    assert!(pos_a.x < 99.0 - 0.05, "a.x = {}", pos_a.x);
    assert!(pos_b.x > 101.0 + 0.05, "b.x = {}", pos_b.x);
    assert_relative_eq!(pos_a.y, 0.0, epsilon = 0.02);
    assert_relative_eq!(pos_b.y, 0.0, epsilon = 0.02);
    assert_relative_eq!(99.0 - pos_a.x, pos_b.x - 101.0, epsilon = 0.02);
}

#[test]
fn test_restitution_rebound_speed() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    world
        .create_fixture(
            ground,
            &FixtureDef::new(Arc::new(Edge::new(
                Vec2::new(-10.0, 0.0),
                Vec2::new(10.0, 0.0),
            ))),
        )
        .unwrap();

    let ball = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(0.0, 5.0)))
        .unwrap();
    world
        .create_fixture(
            ball,
            &FixtureDef::new(Arc::new(Circle::new(0.5)))
                .with_density(1.0)
                .with_restitution(1.0),
        )
        .unwrap();

    let conf = StepConf {
        velocity_threshold: 0.0,
        ..StepConf::new(DT)
    };

    let mut max_down: f32 = 0.0;
    let mut max_up: f32 = 0.0;
    for _ in 0..240 {
        world.step(&conf);
        let vy = world.body(ball).unwrap().linear_velocity().y;
        max_down = max_down.min(vy);
        max_up = max_up.max(vy);
    }

    assert!(max_down < -8.0, "ball never reached impact speed");
    // Perfectly elastic: rebound speed equals approach speed
    assert!(
        (max_up + max_down).abs() < 1.0,
        "rebound {} vs impact {}",
        max_up,
        -max_down
    );
}

#[test]
fn test_bullet_does_not_tunnel() {
    let mut world = world_with_gravity(Vec2::zero());

    // A thin static wall at x = 0
    let wall = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    world
        .create_fixture(
            wall,
            &FixtureDef::new(Arc::new(Polygon::new_box(0.1, 2.0))),
        )
        .unwrap();

    // A fast bullet box fired at the wall
    let bullet = world
        .create_body(
            &BodyDef::new(BodyType::Dynamic)
                .at(Vec2::new(-30.0, 0.0))
                .with_linear_velocity(Vec2::new(100.0, 0.0))
                .as_bullet(),
        )
        .unwrap();
    world
        .create_fixture(
            bullet,
            &FixtureDef::new(Arc::new(Polygon::new_box(0.25, 0.25))).with_density(1.0),
        )
        .unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..120 {
        world.step(&conf);
        let x = world.body(bullet).unwrap().position().x;
        assert!(x < 0.0, "bullet tunneled through the wall: x = {}", x);
    }
}

#[test]
fn test_bodies_fall_asleep_when_still() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    add_box(&mut world, BodyType::Static, Vec2::new(0.0, -10.0), 10.0, 0.0);
    let resting = add_box(&mut world, BodyType::Dynamic, Vec2::new(0.0, 0.51), 0.5, 1.0);

    let conf = StepConf::new(DT);
    let mut asleep_at = None;
    for i in 0..240 {
        world.step(&conf);
        if !world.body(resting).unwrap().is_awake() {
            asleep_at = Some(i);
            break;
        }
    }

    let asleep_at = asleep_at.expect("body never fell asleep");
    // At least the minimum still time must have elapsed first
    assert!(asleep_at as f32 * DT >= 0.5);

    // Sleeping bodies hold position
    let before = world.body(resting).unwrap().position();
    for _ in 0..30 {
        world.step(&conf);
    }
    assert_eq!(world.body(resting).unwrap().position(), before);
}

struct CountingListener {
    begins: Rc<RefCell<u32>>,
    ends: Rc<RefCell<u32>>,
}

impl ContactListener for CountingListener {
    fn begin_contact(&mut self, _contact: &Contact) {
        *self.begins.borrow_mut() += 1;
    }

    fn end_contact(&mut self, _contact: &Contact) {
        *self.ends.borrow_mut() += 1;
    }

    fn pre_solve(&mut self, _contact: &mut Contact, _old_manifold: &Manifold) {}
}

#[test]
fn test_sensor_reports_but_does_not_collide() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let begins = Rc::new(RefCell::new(0));
    let ends = Rc::new(RefCell::new(0));
    world.set_contact_listener(Box::new(CountingListener {
        begins: begins.clone(),
        ends: ends.clone(),
    }));

    // A sensor pad at the origin
    let pad = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    world
        .create_fixture(
            pad,
            &FixtureDef::new(Arc::new(Polygon::new_box(5.0, 0.5))).sensor(),
        )
        .unwrap();

    // A ball dropped straight through it
    let ball = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(0.0, 3.0)))
        .unwrap();
    world
        .create_fixture(ball, &FixtureDef::new(Arc::new(Circle::new(0.3))).with_density(1.0))
        .unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..180 {
        world.step(&conf);
    }

    // The ball passed through without a response
    assert!(world.body(ball).unwrap().position().y < -3.0);

    // Exactly one begin and one end for the pass-through
    assert_eq!(*begins.borrow(), 1);
    assert_eq!(*ends.borrow(), 1);
}

#[test]
fn test_negative_group_filter_prevents_contact() {
    let mut world = world_with_gravity(Vec2::zero());

    let filter = rigid2d::Filter {
        group_index: -3,
        ..Default::default()
    };

    let shape = Arc::new(Polygon::new_box(1.0, 1.0));
    let a = world.create_body(&BodyDef::new(BodyType::Dynamic)).unwrap();
    world
        .create_fixture(
            a,
            &FixtureDef::new(shape.clone()).with_density(1.0).with_filter(filter),
        )
        .unwrap();
    let b = world
        .create_body(&BodyDef::new(BodyType::Dynamic).at(Vec2::new(0.5, 0.0)))
        .unwrap();
    world
        .create_fixture(
            b,
            &FixtureDef::new(shape).with_density(1.0).with_filter(filter),
        )
        .unwrap();

    world.step(&StepConf::new(DT));

    // Overlapping, but the shared negative group vetoes the contact
    assert_eq!(world.contact_count(), 0);
    assert_relative_eq!(world.body(a).unwrap().position().x, 0.0);
}

#[test]
fn test_step_stats_report_contact_activity() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    add_box(&mut world, BodyType::Static, Vec2::new(0.0, -10.0), 10.0, 0.0);
    add_box(&mut world, BodyType::Dynamic, Vec2::new(0.0, 0.3), 0.5, 1.0);

    let stats = world.step(&StepConf::new(DT));

    assert!(stats.pre.added >= 1, "no contacts added");
    assert!(stats.reg.islands_found >= 1, "no islands found");
}

#[test]
fn test_world_ray_cast_closest_hit() {
    let mut world = world_with_gravity(Vec2::zero());

    let near = add_box(&mut world, BodyType::Static, Vec2::new(3.0, 0.0), 0.5, 0.0);
    let _far = add_box(&mut world, BodyType::Static, Vec2::new(8.0, 0.0), 0.5, 0.0);
    world.step(&StepConf::new(DT));

    let mut closest: Option<(BodyHandle, f32)> = None;
    world.ray_cast(
        Vec2::new(0.0, 0.0),
        Vec2::new(20.0, 0.0),
        |body, _fixture, _point, _normal, fraction| {
            closest = Some((body, fraction));
            RayCastBehavior::Clip(fraction)
        },
    );

    let (hit_body, fraction) = closest.expect("ray hit nothing");
    assert_eq!(hit_body, near);
    assert_relative_eq!(fraction, 2.5 / 20.0, epsilon = 1e-4);
}

#[test]
fn test_world_query_aabb() {
    let mut world = world_with_gravity(Vec2::zero());

    let inside = add_box(&mut world, BodyType::Static, Vec2::zero(), 0.5, 0.0);
    let _outside = add_box(&mut world, BodyType::Static, Vec2::new(50.0, 0.0), 0.5, 0.0);

    let mut found: Vec<BodyHandle> = Vec::new();
    world.query_aabb(
        &Aabb::new(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0)),
        |body, _fixture, _child| {
            found.push(body);
            true
        },
    );

    assert_eq!(found, vec![inside]);
}

struct GoodbyeRecorder {
    joints: Rc<RefCell<Vec<JointHandle>>>,
    fixtures: Rc<RefCell<Vec<FixtureId>>>,
}

impl DestructionListener for GoodbyeRecorder {
    fn say_goodbye_joint(&mut self, joint: JointHandle) {
        self.joints.borrow_mut().push(joint);
    }

    fn say_goodbye_fixture(&mut self, _body: BodyHandle, fixture: FixtureId) {
        self.fixtures.borrow_mut().push(fixture);
    }
}

#[test]
fn test_destroy_body_cascades() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let joints = Rc::new(RefCell::new(Vec::new()));
    let fixtures = Rc::new(RefCell::new(Vec::new()));
    world.set_destruction_listener(Box::new(GoodbyeRecorder {
        joints: joints.clone(),
        fixtures: fixtures.clone(),
    }));

    let ground = add_box(&mut world, BodyType::Static, Vec2::zero(), 5.0, 0.0);
    let body = add_box(&mut world, BodyType::Dynamic, Vec2::new(0.0, 3.0), 0.5, 1.0);

    let joint = rigid2d::constraints::RevoluteJoint::new(
        world.bodies(),
        ground,
        body,
        Vec2::new(0.0, 3.0),
    );
    let joint_handle = world.create_joint(Box::new(joint)).unwrap();

    world.destroy_body(body).unwrap();

    assert_eq!(world.body_count(), 1);
    assert_eq!(world.joint_count(), 0);
    assert_eq!(joints.borrow().as_slice(), &[joint_handle]);
    assert_eq!(fixtures.borrow().len(), 1);

    // The survivor holds no dangling edges
    let survivor = world.body(ground).unwrap();
    assert!(survivor.joint_edges().is_empty());
    assert!(survivor.contact_edges().is_empty());
}

#[test]
fn test_locked_world_rejects_mutation() {
    let mut world = world_with_gravity(Vec2::zero());
    // The lock flag is only raised inside a step; from outside, all
    // structural operations succeed.
    assert!(!world.is_locked());
    let handle = world.create_body(&BodyDef::new(BodyType::Dynamic)).unwrap();
    assert!(world.destroy_body(handle).is_ok());
}

#[test]
fn test_identical_worlds_stay_identical() {
    fn build() -> World {
        let mut world = world_with_gravity(Vec2::new(0.0, -10.0));
        add_box(&mut world, BodyType::Static, Vec2::new(0.0, -10.0), 10.0, 0.0);
        for i in 0..5 {
            add_box(
                &mut world,
                BodyType::Dynamic,
                Vec2::new(0.1 * i as f32, 0.6 + 1.1 * i as f32),
                0.5,
                1.0,
            );
        }
        world
    }

    let mut world1 = build();
    let mut world2 = build();

    let conf = StepConf::new(DT);
    for _ in 0..60 {
        world1.step(&conf);
        world2.step(&conf);
    }

    for (h1, h2) in world1.body_handles().into_iter().zip(world2.body_handles()) {
        let b1 = world1.body(h1).unwrap();
        let b2 = world2.body(h2).unwrap();
        // Same inputs and order: bitwise identical results
        assert_eq!(b1.position(), b2.position());
        assert_eq!(b1.angle(), b2.angle());
        assert_eq!(b1.linear_velocity(), b2.linear_velocity());
    }
}
