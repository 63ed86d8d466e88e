//! Benchmarks for squishy physics simulation.

use criterion::{criterion_group, criterion_main, Criterion};
use squishy::*;

fn grounded() -> SolverConfig<f32> {
    SolverConfig::new().with_ground(GroundPlane::new(0.0))
}

fn bench_rope_simulation(c: &mut Criterion) {
    c.bench_function("rope_50_segments_60_steps", |b| {
        b.iter(|| {
            let mut rope = Body::<f32>::rope(
                Vec3::new(0.0, 10.0, 0.0), Vec3::new(10.0, 10.0, 0.0), 50, &RopeConfig::default(),
            )
            .unwrap()
            .with_config(SolverConfig::new().with_iterations(8));
            rope.pin(0);
            for _ in 0..60 {
                rope.step(&mut NoOpStepObserver);
            }
            rope.positions()
        });
    });
}

fn bench_blob_shape_matching(c: &mut Criterion) {
    c.bench_function("blob_res4_60_steps", |b| {
        b.iter(|| {
            let config = BlobConfig { resolution: 4, ..BlobConfig::default() };
            let mut blob = Body::<f32>::blob(Vec3::new(0.0, 1.0, 0.0), &config)
                .unwrap()
                .with_config(grounded());
            for _ in 0..60 {
                blob.step(&mut NoOpStepObserver);
            }
            blob.center_of_mass()
        });
    });
}

fn bench_world_pile(c: &mut Criterion) {
    c.bench_function("world_16_cubes_60_steps", |b| {
        b.iter(|| {
            let mut world = SimulationWorld::new(WorldConfig::new()).unwrap();
            for i in 0..16 {
                let x = (i % 4) as f32 * 0.9;
                let y = 1.0 + (i / 4) as f32 * 1.1;
                let cube = Body::cube(Vec3::new(x, y, 0.0), &CubeConfig::default()).unwrap();
                world.add_body(cube.with_config(grounded())).unwrap();
            }
            for _ in 0..60 {
                world.step(&mut NoOpStepObserver);
            }
            world.particle_count()
        });
    });
}

fn bench_broad_phase(c: &mut Criterion) {
    let mut world = SimulationWorld::new(WorldConfig::new()).unwrap();
    for i in 0..64 {
        let center = Vec3::new((i % 8) as f32 * 0.6, 0.5, (i / 8) as f32 * 0.6);
        let sphere = Body::sphere(center, &SphereConfig::default()).unwrap();
        world.add_body(sphere).unwrap();
    }
    c.bench_function("broad_phase_64_spheres", |b| {
        b.iter(|| world.detect_collisions().len());
    });
}

criterion_group!(
    benches,
    bench_rope_simulation,
    bench_blob_shape_matching,
    bench_world_pile,
    bench_broad_phase
);
criterion_main!(benches);
