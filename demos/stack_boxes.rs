//! Drops a small stack of boxes onto the ground and prints the world
//! as ASCII art while it settles.

use rigid2d::math::Vec2;
use rigid2d::shapes::Polygon;
use rigid2d::{BodyDef, BodyType, FixtureDef, StepConf, World, WorldDef};
use std::sync::Arc;

const WIDTH: usize = 60;
const HEIGHT: usize = 24;

fn main() {
    let mut world = World::new(WorldDef {
        gravity: Vec2::new(0.0, -10.0),
        ..WorldDef::default()
    });

    let ground = world
        .create_body(&BodyDef::new(BodyType::Static).at(Vec2::new(0.0, -1.0)))
        .expect("world is unlocked");
    world
        .create_fixture(
            ground,
            &FixtureDef::new(Arc::new(Polygon::new_box(12.0, 1.0))),
        )
        .expect("ground fixture");

    let box_shape = Arc::new(Polygon::new_box(0.5, 0.5));
    let mut boxes = Vec::new();
    for i in 0..6 {
        let handle = world
            .create_body(
                &BodyDef::new(BodyType::Dynamic)
                    .at(Vec2::new(0.05 * i as f32, 0.6 + 1.2 * i as f32)),
            )
            .expect("world is unlocked");
        world
            .create_fixture(
                handle,
                &FixtureDef::new(box_shape.clone())
                    .with_density(1.0)
                    .with_friction(0.4),
            )
            .expect("box fixture");
        boxes.push(handle);
    }

    let conf = StepConf::new(1.0 / 60.0);
    for frame in 0..300 {
        world.step(&conf);

        if frame % 30 != 0 {
            continue;
        }

        let mut screen = vec![vec![' '; WIDTH]; HEIGHT];
        for row in screen.iter_mut() {
            row[0] = '|';
            row[WIDTH - 1] = '|';
        }
        for x in 0..WIDTH {
            screen[HEIGHT - 1][x] = '=';
        }

        for &handle in &boxes {
            let body = world.body(handle).expect("body exists");
            let p = body.position();
            let col = ((p.x + 6.0) / 12.0 * WIDTH as f32) as isize;
            let row = HEIGHT as isize - 2 - (p.y / 8.0 * HEIGHT as f32) as isize;
            if (0..WIDTH as isize).contains(&col) && (0..HEIGHT as isize).contains(&row) {
                let glyph = if body.is_awake() { '#' } else { 'o' };
                screen[row as usize][col as usize] = glyph;
            }
        }

        println!("t = {:.2}s", frame as f32 / 60.0);
        for row in &screen {
            println!("{}", row.iter().collect::<String>());
        }
        println!();
    }

    println!(
        "settled: {} bodies, {} contacts, tree height {}",
        world.body_count(),
        world.contact_count(),
        world.tree_height()
    );
}
