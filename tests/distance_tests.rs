use squishy::{Body, CorrectionMode, NoOpStepObserver, Particle, RopeConfig, SolverConfig, Vec3};
use squishy::vec::Vec as _;

fn weightless(mode: CorrectionMode, iterations: usize) -> SolverConfig<f32> {
    SolverConfig::new()
        .with_gravity(Vec3::zero())
        .with_damping(1.0)
        .with_iterations(iterations)
        .with_correction_mode(mode)
}

#[test]
fn stretched_pair_settles_at_rest_length() {
    let mut body = Body::new().with_config(weightless(CorrectionMode::Averaged, 50));
    body.add_particle(Particle::new(Vec3::new(0.0, 0.0, 0.0), 1.0));
    body.add_particle(Particle::new(Vec3::new(1.0, 0.0, 0.0), 1.0));
    body.add_constraint(squishy::DistanceConstraint::new(0, 1, 0.5, 1.0)).unwrap();

    body.step(&mut NoOpStepObserver);

    let d = body.particle(0).pos.distance(body.particle(1).pos);
    assert!((d - 0.5).abs() < 1e-4, "distance {}", d);
    assert!((body.particle(0).pos.x - 0.25).abs() < 1e-4);
    assert!((body.particle(1).pos.x - 0.75).abs() < 1e-4);
}

fn stretched_rope(mode: CorrectionMode) -> Body<f32> {
    let mut body = Body::rope(
        Vec3::zero(),
        Vec3::new(1.5, 0.0, 0.0),
        3,
        &RopeConfig::default(),
    )
    .unwrap()
    .with_config(weightless(mode, 50));
    // Rest lengths are 0.5; stretch everything by half again.
    for p in body.particles_mut() {
        p.pos = p.pos.scale(1.5);
        p.prev_pos = p.pos;
    }
    body
}

#[test]
fn both_correction_modes_converge() {
    for mode in [CorrectionMode::Averaged, CorrectionMode::Immediate] {
        let mut body = stretched_rope(mode);
        for _ in 0..5 {
            body.step(&mut NoOpStepObserver);
        }
        let pos = body.positions();
        for w in pos.windows(2) {
            let d = w[0].distance(w[1]);
            assert!((d - 0.5).abs() < 1e-2, "{:?}: segment {}", mode, d);
        }
    }
}

#[test]
fn soft_spring_moves_partway() {
    let mut body = Body::new().with_config(weightless(CorrectionMode::Immediate, 1));
    body.add_particle(Particle::new(Vec3::new(0.0, 0.0, 0.0), 1.0));
    body.add_particle(Particle::new(Vec3::new(1.0, 0.0, 0.0), 1.0));
    body.add_constraint(squishy::DistanceConstraint::new(0, 1, 0.5, 0.5)).unwrap();

    body.step(&mut NoOpStepObserver);

    let d = body.particle(0).pos.distance(body.particle(1).pos);
    assert!((d - 0.75).abs() < 1e-5, "distance {}", d);
}

#[test]
fn pinned_rope_hangs_below_anchor() {
    let mut body = Body::rope(
        Vec3::new(0.0, 5.0, 0.0),
        Vec3::new(2.0, 5.0, 0.0),
        8,
        &RopeConfig::default(),
    )
    .unwrap()
    .with_config(SolverConfig::new().with_iterations(20));
    body.pin(0);

    for _ in 0..300 {
        body.step(&mut NoOpStepObserver);
    }

    assert_eq!(body.particle(0).pos, Vec3::new(0.0, 5.0, 0.0));
    let tail = body.particle(8).pos;
    assert!(tail.y < 3.5, "tail should swing down, y = {}", tail.y);
    assert!(tail.distance(Vec3::new(0.0, 5.0, 0.0)) < 2.5);
}
