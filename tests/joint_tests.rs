use approx::assert_relative_eq;
use rigid2d::constraints::{
    DistanceJoint, FrictionJoint, GearJoint, MotorJoint, MouseJoint, PrismaticJoint, PulleyJoint,
    RevoluteJoint, RopeJoint, WeldJoint, WheelJoint,
};
use rigid2d::core::{StepConf, World, WorldDef};
use rigid2d::math::Vec2;
use rigid2d::shapes::{Circle, Polygon};
use rigid2d::{BodyDef, BodyHandle, BodyType, FixtureDef};
use std::f32::consts::PI;
use std::sync::Arc;

const DT: f32 = 1.0 / 60.0;

fn world_with_gravity(gravity: Vec2) -> World {
    World::new(WorldDef {
        gravity,
        ..WorldDef::default()
    })
}

fn add_circle(world: &mut World, body_type: BodyType, position: Vec2, radius: f32) -> BodyHandle {
    let handle = world
        .create_body(&BodyDef::new(body_type).at(position))
        .unwrap();
    world
        .create_fixture(
            handle,
            &FixtureDef::new(Arc::new(Circle::new(radius))).with_density(1.0),
        )
        .unwrap();
    handle
}

fn add_box(world: &mut World, body_type: BodyType, position: Vec2, hw: f32, hh: f32) -> BodyHandle {
    let handle = world
        .create_body(&BodyDef::new(body_type).at(position))
        .unwrap();
    world
        .create_fixture(
            handle,
            &FixtureDef::new(Arc::new(Polygon::new_box(hw, hh))).with_density(1.0),
        )
        .unwrap();
    handle
}

#[test]
fn test_revolute_pendulum_respects_limits() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    // Slightly off-axis so gravity produces a torque about the pivot
    let bob = add_box(&mut world, BodyType::Dynamic, Vec2::new(-9.9, 20.0), 0.5, 0.5);

    let mut joint = RevoluteJoint::new(world.bodies(), ground, bob, Vec2::new(-10.0, 12.0));
    joint.set_limits(-PI / 4.0, PI / 2.0);
    joint.enable_limit(true);
    let handle = world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    let slop = world.angular_slop();
    for _ in 0..600 {
        world.step(&conf);

        let joint = world.joint(handle).unwrap();
        let revolute = joint.as_any().downcast_ref::<RevoluteJoint>().unwrap();
        let angle = revolute.joint_angle(world.bodies());

        assert!(
            angle >= -PI / 4.0 - 2.0 * slop && angle <= PI / 2.0 + 2.0 * slop,
            "joint angle {} escaped its limits",
            angle
        );
    }

    // Gravity must have actually engaged a limit at some point
    let joint = world.joint(handle).unwrap();
    let revolute = joint.as_any().downcast_ref::<RevoluteJoint>().unwrap();
    assert!(revolute.is_limit_enabled());
}

#[test]
fn test_revolute_motor_spins_body() {
    let mut world = world_with_gravity(Vec2::zero());

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    let wheel = add_circle(&mut world, BodyType::Dynamic, Vec2::new(0.0, 2.0), 0.5);

    let mut joint = RevoluteJoint::new(world.bodies(), ground, wheel, Vec2::new(0.0, 2.0));
    joint.enable_motor(4.0, 1000.0);
    let handle = world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..120 {
        world.step(&conf);
    }

    // The motor reaches its target angular speed
    assert_relative_eq!(
        world.body(wheel).unwrap().angular_velocity(),
        4.0,
        epsilon = 0.1
    );

    let joint = world.joint(handle).unwrap();
    let revolute = joint.as_any().downcast_ref::<RevoluteJoint>().unwrap();
    assert!(revolute.is_motor_enabled());
}

#[test]
fn test_distance_joint_keeps_length() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let anchor = world
        .create_body(&BodyDef::new(BodyType::Static).at(Vec2::new(0.0, 4.0)))
        .unwrap();
    let bob = add_circle(&mut world, BodyType::Dynamic, Vec2::new(0.0, 0.0), 0.3);

    let joint = DistanceJoint::new(
        world.bodies(),
        anchor,
        bob,
        Vec2::new(0.0, 4.0),
        Vec2::new(0.0, 0.0),
    );
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..300 {
        world.step(&conf);
    }

    let distance = world
        .body(bob)
        .unwrap()
        .position()
        .distance(&Vec2::new(0.0, 4.0));
    assert_relative_eq!(distance, 4.0, epsilon = 0.05);
}

#[test]
fn test_prismatic_joint_constrains_to_axis() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    let slider = add_box(&mut world, BodyType::Dynamic, Vec2::zero(), 0.5, 0.5);

    let joint = PrismaticJoint::new(
        world.bodies(),
        ground,
        slider,
        Vec2::zero(),
        Vec2::new(0.0, 1.0),
    );
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..120 {
        world.step(&conf);
    }

    let body = world.body(slider).unwrap();
    // Free fall along the axis, fully locked off-axis
    assert!(body.position().y < -1.0);
    assert_relative_eq!(body.position().x, 0.0, epsilon = 0.01);
    assert_relative_eq!(body.angle(), 0.0, epsilon = 0.01);
}

#[test]
fn test_prismatic_limits_stop_travel() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    let slider = add_box(&mut world, BodyType::Dynamic, Vec2::zero(), 0.5, 0.5);

    let mut joint = PrismaticJoint::new(
        world.bodies(),
        ground,
        slider,
        Vec2::zero(),
        Vec2::new(0.0, 1.0),
    );
    joint.set_limits(-2.0, 0.5);
    let handle = world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..300 {
        world.step(&conf);
    }

    let joint = world.joint(handle).unwrap();
    let prismatic = joint.as_any().downcast_ref::<PrismaticJoint>().unwrap();
    let translation = prismatic.joint_translation(world.bodies());

    assert!(
        translation >= -2.0 - 0.02 && translation <= 0.5 + 0.02,
        "translation {} escaped its limits",
        translation
    );
    // Gravity drives the slider to the lower stop
    assert_relative_eq!(translation, -2.0, epsilon = 0.05);
}

#[test]
fn test_weld_joint_holds_bodies_together() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let base = add_box(&mut world, BodyType::Static, Vec2::zero(), 0.5, 0.5);
    let arm = add_box(&mut world, BodyType::Dynamic, Vec2::new(1.5, 0.0), 1.0, 0.25);

    let joint = WeldJoint::new(world.bodies(), base, arm, Vec2::new(0.5, 0.0));
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..180 {
        world.step(&conf);
    }

    let body = world.body(arm).unwrap();
    assert_relative_eq!(body.position().x, 1.5, epsilon = 0.1);
    assert_relative_eq!(body.position().y, 0.0, epsilon = 0.1);
    assert_relative_eq!(body.angle(), 0.0, epsilon = 0.05);
}

#[test]
fn test_rope_joint_caps_distance() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let anchor = world
        .create_body(&BodyDef::new(BodyType::Static).at(Vec2::new(0.0, 4.0)))
        .unwrap();
    let bob = add_circle(&mut world, BodyType::Dynamic, Vec2::new(0.0, 2.0), 0.3);

    let joint = RopeJoint::new(anchor, bob, Vec2::zero(), Vec2::zero(), 3.0);
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..300 {
        world.step(&conf);

        let distance = world
            .body(bob)
            .unwrap()
            .position()
            .distance(&Vec2::new(0.0, 4.0));
        assert!(distance <= 3.1, "rope stretched to {}", distance);
    }

    // The rope ends up taut under gravity
    let distance = world
        .body(bob)
        .unwrap()
        .position()
        .distance(&Vec2::new(0.0, 4.0));
    assert_relative_eq!(distance, 3.0, epsilon = 0.05);
}

#[test]
fn test_wheel_joint_keeps_wheel_on_axis() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let chassis = add_box(&mut world, BodyType::Static, Vec2::zero(), 2.0, 0.25);
    let wheel = add_circle(&mut world, BodyType::Dynamic, Vec2::new(0.0, -1.0), 0.4);

    let joint = WheelJoint::new(
        world.bodies(),
        chassis,
        wheel,
        Vec2::new(0.0, -1.0),
        Vec2::new(0.0, 1.0),
    )
    .with_spring(4.0, 0.7);
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..300 {
        world.step(&conf);

        let position = world.body(wheel).unwrap().position();
        assert!(position.x.abs() < 0.05, "wheel left its axis: x = {}", position.x);
    }

    // The suspension settles below the anchor but does not detach
    let y = world.body(wheel).unwrap().position().y;
    assert!(y < -1.0 && y > -4.0, "wheel at unexpected height {}", y);
}

#[test]
fn test_pulley_joint_conserves_total_length() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let left = add_box(&mut world, BodyType::Dynamic, Vec2::new(-2.0, 2.0), 0.5, 0.5);
    let right = add_box(&mut world, BodyType::Dynamic, Vec2::new(2.0, 2.0), 0.4, 0.4);

    let joint = PulleyJoint::new(
        world.bodies(),
        left,
        right,
        Vec2::new(-2.0, 5.0),
        Vec2::new(2.0, 5.0),
        Vec2::new(-2.0, 2.0),
        Vec2::new(2.0, 2.0),
        1.0,
    );
    let handle = world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..60 {
        world.step(&conf);
    }

    let joint = world.joint(handle).unwrap();
    let pulley = joint.as_any().downcast_ref::<PulleyJoint>().unwrap();
    let total = pulley.current_length_a(world.bodies()) + pulley.current_length_b(world.bodies());

    // Initially 3 + 3; the rope neither stretches nor shrinks
    assert_relative_eq!(total, 6.0, epsilon = 0.1);

    // The lighter side rises as the heavier side falls
    assert!(world.body(left).unwrap().position().y < 2.0);
    assert!(world.body(right).unwrap().position().y > 2.0);
}

#[test]
fn test_mouse_joint_drags_body_to_target() {
    let mut world = world_with_gravity(Vec2::zero());

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    let body = add_box(&mut world, BodyType::Dynamic, Vec2::zero(), 0.5, 0.5);

    let mass = world.body(body).unwrap().mass();
    let mut joint = MouseJoint::new(world.bodies(), ground, body, Vec2::zero(), 1000.0 * mass);
    joint.set_target(Vec2::new(2.0, 1.0));
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..180 {
        world.step(&conf);
    }

    let position = world.body(body).unwrap().position();
    assert_relative_eq!(position.x, 2.0, epsilon = 0.3);
    assert_relative_eq!(position.y, 1.0, epsilon = 0.3);
}

#[test]
fn test_friction_joint_damps_motion() {
    let mut world = world_with_gravity(Vec2::zero());

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    let puck = add_box(&mut world, BodyType::Dynamic, Vec2::zero(), 0.5, 0.5);
    world
        .body_mut(puck)
        .unwrap()
        .set_linear_velocity(Vec2::new(5.0, 0.0));

    let mass = world.body(puck).unwrap().mass();
    let mut joint = FrictionJoint::new(world.bodies(), ground, puck, Vec2::zero());
    // Deceleration of 10 m/s^2: the puck stops in half a second
    joint.set_max_force(10.0 * mass);
    joint.set_max_torque(10.0);
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..90 {
        world.step(&conf);
    }

    let speed = world.body(puck).unwrap().linear_velocity().length();
    assert!(speed < 0.1, "friction failed to stop the puck: {}", speed);
    // It slid some distance before stopping
    let travelled = world.body(puck).unwrap().position().x;
    assert!(travelled > 0.5 && travelled < 2.5, "travelled {}", travelled);
}

#[test]
fn test_motor_joint_drives_to_offset() {
    let mut world = world_with_gravity(Vec2::zero());

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    let platform = add_box(&mut world, BodyType::Dynamic, Vec2::zero(), 0.5, 0.5);

    let mass = world.body(platform).unwrap().mass();
    let mut joint = MotorJoint::new(world.bodies(), ground, platform);
    joint.set_linear_offset(Vec2::new(1.0, 0.0));
    joint.set_max_force(1000.0 * mass);
    joint.set_max_torque(1000.0);
    world.create_joint(Box::new(joint)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..240 {
        world.step(&conf);
    }

    let position = world.body(platform).unwrap().position();
    assert_relative_eq!(position.x, 1.0, epsilon = 0.2);
    assert_relative_eq!(position.y, 0.0, epsilon = 0.1);
}

#[test]
fn test_gear_joint_couples_rotations() {
    let mut world = world_with_gravity(Vec2::zero());

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    let gear_a = add_circle(&mut world, BodyType::Dynamic, Vec2::new(0.0, 2.0), 1.0);
    let gear_b = add_circle(&mut world, BodyType::Dynamic, Vec2::new(3.0, 2.0), 0.5);

    let mut revolute_a = RevoluteJoint::new(world.bodies(), ground, gear_a, Vec2::new(0.0, 2.0));
    revolute_a.enable_motor(2.0, 1000.0);
    let handle_a = world.create_joint(Box::new(revolute_a)).unwrap();
    let revolute_b = RevoluteJoint::new(world.bodies(), ground, gear_b, Vec2::new(3.0, 2.0));
    let handle_b = world.create_joint(Box::new(revolute_b)).unwrap();

    let gear = {
        let joint_a = world.joint(handle_a).unwrap();
        let joint_b = world.joint(handle_b).unwrap();
        GearJoint::new(world.bodies(), joint_a.as_ref(), joint_b.as_ref(), 2.0).unwrap()
    };
    world.create_joint(Box::new(gear)).unwrap();

    let conf = StepConf::new(DT);
    for _ in 0..120 {
        world.step(&conf);
    }

    let angle_a = world.body(gear_a).unwrap().angle();
    let angle_b = world.body(gear_b).unwrap().angle();

    // The motor turned the first gear
    assert!(angle_a > 0.5, "driver barely moved: {}", angle_a);
    // coordinate_a + ratio * coordinate_b stays at its initial value
    assert_relative_eq!(angle_a + 2.0 * angle_b, 0.0, epsilon = 0.1);
}

#[test]
fn test_joint_forbids_collision_between_connected_bodies() {
    let mut world = world_with_gravity(Vec2::new(0.0, -10.0));

    let ground = world.create_body(&BodyDef::new(BodyType::Static)).unwrap();
    // A ball pinned inside overlap range of another ball
    let a = add_circle(&mut world, BodyType::Dynamic, Vec2::new(0.0, 1.0), 0.6);
    let b = add_circle(&mut world, BodyType::Dynamic, Vec2::new(0.5, 1.0), 0.6);

    let ra = RevoluteJoint::new(world.bodies(), ground, a, Vec2::new(0.0, 1.0));
    world.create_joint(Box::new(ra)).unwrap();
    let rb = RevoluteJoint::new(world.bodies(), ground, b, Vec2::new(0.5, 1.0));
    world.create_joint(Box::new(rb)).unwrap();

    // Connect the two balls directly; collide_connected defaults false
    let link = DistanceJoint::new(
        world.bodies(),
        a,
        b,
        Vec2::new(0.0, 1.0),
        Vec2::new(0.5, 1.0),
    );
    world.create_joint(Box::new(link)).unwrap();

    world.step(&StepConf::new(DT));

    // No contact forms between the overlapping connected bodies
    for handle in world.contact_handles() {
        let contact = world.contact(handle).unwrap();
        let pair = (contact.body_a(), contact.body_b());
        assert!(
            !(pair == (a, b) || pair == (b, a)),
            "joint-connected bodies produced a contact"
        );
    }
}
