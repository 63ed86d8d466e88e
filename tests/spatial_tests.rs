use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use squishy::vec::Vec as _;
use squishy::{
    Body, CollisionConfig, Particle, SimulationWorld, SolverConfig, SpatialHashGrid, Vec3,
    WorldConfig,
};

fn cloud(seed: u64, n: usize, extent: f32) -> Vec<Vec3<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            )
        })
        .collect()
}

fn check_query_complete(cell_size: f32, radius: f32) {
    let points = cloud(7, 400, 3.0);
    let mut grid = SpatialHashGrid::new(cell_size).unwrap();
    for (i, &p) in points.iter().enumerate() {
        grid.insert(i, p);
    }
    assert_eq!(grid.len(), points.len());

    let mut found = Vec::new();
    for (i, &p) in points.iter().enumerate() {
        found.clear();
        grid.query_neighbors(p, radius, &mut found);
        assert!(found.contains(&i), "query must see the item itself");
        for (j, &q) in points.iter().enumerate() {
            if p.distance(q) < radius {
                assert!(found.contains(&j), "missed {} -> {} at {}", i, j, p.distance(q));
            }
        }
    }
}

#[test]
fn query_is_complete_within_one_cell() {
    check_query_complete(0.5, 0.45);
}

#[test]
fn query_is_complete_beyond_one_cell() {
    check_query_complete(0.3, 0.8);
}

#[test]
fn negative_coordinates_hash_apart() {
    let grid: SpatialHashGrid<f32, usize> = SpatialHashGrid::new(1.0).unwrap();
    assert_ne!(grid.cell_of(Vec3::new(-0.1, 0.0, 0.0)), grid.cell_of(Vec3::new(0.1, 0.0, 0.0)));
}

#[test]
fn broad_phase_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(42);
    let points = cloud(11, 300, 2.0);
    let radii: Vec<f32> = points.iter().map(|_| rng.gen_range(0.05..0.15)).collect();

    let config = WorldConfig::new().with_collision(CollisionConfig::new().with_cell_size(0.2));
    let mut world = SimulationWorld::new(config).unwrap();
    // Three particles per body so same-body pairs get exercised too.
    for chunk in points.chunks(3).zip(radii.chunks(3)) {
        let mut body = Body::new().with_config(SolverConfig::new());
        for (&p, &r) in chunk.0.iter().zip(chunk.1) {
            body.add_particle(Particle::new(p, 1.0).with_radius(r));
        }
        world.add_body(body).unwrap();
    }

    let found: BTreeSet<_> = world.detect_collisions().iter().map(|c| (c.a, c.b)).collect();
    assert_eq!(found.len(), world.collision_pairs().len(), "pairs must be unique");

    let mut expected = BTreeSet::new();
    let all: Vec<_> = world
        .bodies()
        .flat_map(|(id, b)| {
            b.particles().iter().enumerate().map(move |(i, p)| {
                (squishy::ParticleRef { body: id.index(), particle: i as u32 }, p.pos, p.radius)
            })
        })
        .collect();
    for (x, &(ra, pa, rad_a)) in all.iter().enumerate() {
        for &(rb, pb, rad_b) in &all[x + 1..] {
            if ra.body != rb.body && pa.distance(pb) < rad_a + rad_b {
                expected.insert((ra.min(rb), ra.max(rb)));
            }
        }
    }
    assert!(!expected.is_empty());
    assert_eq!(found, expected);
}
