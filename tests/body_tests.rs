use squishy::vec::Vec as _;
use squishy::{
    Body, CubeConfig, GroundPlane, LatticeConfig, NoOpStepObserver, Particle, SolverConfig,
    SphereConfig, Vec3,
};

fn grounded() -> SolverConfig<f32> {
    SolverConfig::new().with_ground(GroundPlane::new(0.0))
}

#[test]
fn dropped_cube_keeps_its_shape() {
    let mut body = Body::cube(Vec3::new(0.0, 2.0, 0.0), &CubeConfig::default())
        .unwrap()
        .with_config(grounded());
    let rest: Vec<f32> = body
        .constraints()
        .iter()
        .filter_map(|c| match c {
            squishy::Constraint::Distance(d) => Some(d.rest_length),
            _ => None,
        })
        .collect();

    for _ in 0..300 {
        body.step(&mut NoOpStepObserver);
    }

    for (c, rest) in body.constraints().iter().zip(&rest) {
        if let squishy::Constraint::Distance(d) = c {
            let len = body.particle(d.a).pos.distance(body.particle(d.b).pos);
            assert!((len - rest).abs() < rest * 0.1, "spring {} vs rest {}", len, rest);
        }
    }
    let bounds = body.bounds().unwrap();
    assert!(bounds.min.y >= 0.1 - 1e-4);
    assert!(bounds.min.y < 0.2, "cube should be resting, min y = {}", bounds.min.y);
}

#[test]
fn velocity_reports_mass_weighted_mean() {
    let mut body = Body::<f32>::new().with_config(SolverConfig::new().with_gravity(Vec3::zero()));
    body.add_particle(Particle::new(Vec3::zero(), 1.0));
    body.add_particle(Particle::new(Vec3::new(1.0, 0.0, 0.0), 3.0));
    body.set_velocity(Vec3::new(2.0, 0.0, 0.0));
    let v = body.velocity();
    assert!((v.x - 2.0).abs() < 1e-4, "v = {:?}", v);
    assert!((body.center_of_mass().x - 0.75).abs() < 1e-6);
}

#[test]
fn pinned_particle_follows_move_pin() {
    let mut body = Body::<f32>::lattice(Vec3::zero(), &LatticeConfig::default()).unwrap();
    body.pin(0);
    body.move_pin(0, Vec3::new(0.0, 1.0, 0.0));
    body.step(&mut NoOpStepObserver);
    assert_eq!(body.particle(0).pos, Vec3::new(0.0, 1.0, 0.0));
    body.unpin(0, 1.0);
    assert!(!body.particle(0).is_fixed());
    assert_eq!(body.particle(0).inv_mass(), 1.0);
}

#[test]
fn poke_pushes_nearest_particle() {
    let mut body = Body::<f32>::sphere(Vec3::zero(), &SphereConfig::default()).unwrap();
    let target = body.particle(0).pos;
    body.poke(target + Vec3::new(0.0, 0.01, 0.0), Vec3::new(0.0, -0.1, 0.0));
    assert!((body.particle(0).velocity_raw().y + 0.1).abs() < 1e-6);
    assert_eq!(body.particle(1).velocity_raw(), Vec3::zero());
}

#[test]
fn sphere_center_is_heavier_and_tied_to_surface() {
    let cfg = SphereConfig::<f32>::default();
    let body = Body::sphere(Vec3::zero(), &cfg).unwrap();
    assert_eq!(body.particle_count(), cfg.points + 1);
    let center = body.particle(cfg.points);
    assert_eq!(center.pos, Vec3::zero());
    assert_eq!(center.mass(), 2.0);
    let volume = body
        .constraints()
        .iter()
        .filter(|c| c.involves(cfg.points))
        .count();
    assert_eq!(volume, cfg.points);
}
