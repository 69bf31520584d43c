#![feature(test)]
#[macro_use]
extern crate entwrap;
extern crate test;

use entwrap::prelude::*;
use test::Bencher;

#[derive(Debug, Copy, Clone, Default)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Copy, Clone, Default)]
struct Velocity {
    x: f32,
    y: f32,
}

declare_component!(Position, Velocity);

fn setup(n: usize) -> EntityX {
    let ecs = EntityX::new();

    for i in 0..n {
        let e = ecs.entities.build().with_default::<Position>().finish();
        if i % 2 == 0 {
            e.assign(Velocity { x: 1.0, y: 1.0 });
        }
    }

    ecs
}

#[bench]
fn bench_create_destroy(b: &mut Bencher) {
    let ecs = EntityX::new();

    b.iter(|| {
        let v: Vec<_> = (0..1000)
            .map(|_| {
                ecs.entities
                    .build()
                    .with_default::<Position>()
                    .with_default::<Velocity>()
                    .finish()
            })
            .collect();

        for e in v {
            e.destroy();
        }
    });
}

#[bench]
fn bench_single_view(b: &mut Bencher) {
    let ecs = setup(10000);

    b.iter(|| {
        for (_, p) in ecs.entities.entities_with_handles::<Position>() {
            p.get_mut().unwrap().x += 1.0;
        }
    });
}

#[bench]
fn bench_joined_view(b: &mut Bencher) {
    let ecs = setup(10000);

    b.iter(|| {
        for (_, (p, v)) in ecs
            .entities
            .entities_with_handles::<(Position, Velocity)>()
        {
            let v = *v.get().unwrap();
            let mut p = p.get_mut().unwrap();
            p.x += v.x;
            p.y += v.y;
        }
    });
}
