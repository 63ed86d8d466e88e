//! Deformable bodies: particles plus the constraints that hold them together.

use alloc::vec::Vec as AllocVec;

use crate::config::{CorrectionMode, GroundPlane, SolverConfig};
use crate::constraint::{Constraint, DistanceConstraint};
use crate::error::PhysicsError;
use crate::float::Float;
use crate::observer::StepObserver;
use crate::particle::Particle;
use crate::shape_matching::ShapeMatchingConstraint;
use crate::spatial::SpatialHashGrid;
use crate::vec::{Vec, Vec3};
use crate::world::BodyId;

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb<F: Float> {
    pub min: Vec3<F>,
    pub max: Vec3<F>,
}

impl<F: Float> Aabb<F> {
    pub fn center(&self) -> Vec3<F> {
        (self.min + self.max).scale(F::half())
    }

    pub fn size(&self) -> Vec3<F> {
        self.max - self.min
    }

    pub fn contains(&self, p: Vec3<F>) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.z >= self.min.z
            && p.x <= self.max.x && p.y <= self.max.y && p.z <= self.max.z
    }

    pub fn overlaps(&self, other: &Aabb<F>) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
            && self.min.y <= other.max.y && self.max.y >= other.min.y
            && self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

/// Resolve one particle against a ground plane.
///
/// A particle at or below `height + radius` is put back on the surface. If
/// its Verlet velocity points into the ground, the normal part is reflected
/// and scaled by restitution and the tangential part scaled by
/// `1 - friction`; `prev_pos` is rebuilt so the next integration carries the
/// corrected velocity. Particles already on the surface and moving away are
/// left as they are.
pub fn resolve_ground<F: Float>(p: &mut Particle<F>, ground: &GroundPlane<F>) {
    if p.is_fixed() {
        return;
    }
    let surface = ground.height + p.radius;
    if p.pos.y > surface {
        return;
    }
    let mut v = p.velocity_raw();
    p.pos.y = surface;
    if v.y < F::zero() {
        let keep = F::one() - ground.friction;
        v = Vec3::new(v.x * keep, -v.y * ground.restitution, v.z * keep);
    }
    p.prev_pos = p.pos - v;
}

/// A deformable body: an ordered set of particles and constraints.
///
/// A body may carry its own [`SolverConfig`]. Inside a world only its
/// gravity, damping and ground override the world's; without one the body
/// follows the world. Stepped on its own, a body without a config uses
/// `SolverConfig::default()`.
#[derive(Clone, Debug)]
pub struct Body<F: Float> {
    particles: AllocVec<Particle<F>>,
    constraints: AllocVec<Constraint<F>>,
    config: Option<SolverConfig<F>>,
    id: Option<BodyId>,
}

impl<F: Float> Body<F> {
    pub fn new() -> Self {
        Body {
            particles: AllocVec::new(),
            constraints: AllocVec::new(),
            config: None,
            id: None,
        }
    }

    pub fn from_particles(particles: AllocVec<Particle<F>>) -> Self {
        let mut body = Self::new();
        body.particles = particles;
        body
    }

    pub fn with_config(mut self, config: SolverConfig<F>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config(&self) -> Option<&SolverConfig<F>> { self.config.as_ref() }

    /// Replace the body's own config; `None` hands gravity, damping and
    /// ground back to the world.
    pub fn set_config(&mut self, config: Option<SolverConfig<F>>) -> Result<(), PhysicsError> {
        if let Some(c) = &config {
            c.validate()?;
        }
        self.config = config;
        Ok(())
    }

    /// The body's own config, or `fallback` when it has none.
    pub fn effective_config<'a>(&'a self, fallback: &'a SolverConfig<F>) -> &'a SolverConfig<F> {
        self.config.as_ref().unwrap_or(fallback)
    }

    fn local_sub_dt(&self) -> F {
        match &self.config {
            Some(c) => c.sub_dt(),
            None => SolverConfig::new().sub_dt(),
        }
    }

    /// The id assigned when the body was registered with a world.
    pub fn id(&self) -> Option<BodyId> { self.id }

    pub(crate) fn set_id(&mut self, id: Option<BodyId>) {
        self.id = id;
        for p in self.particles.iter_mut() {
            p.set_body(id);
        }
    }

    pub fn add_particle(&mut self, mut particle: Particle<F>) -> usize {
        particle.set_body(self.id);
        let idx = self.particles.len();
        self.particles.push(particle);
        idx
    }

    fn check_index(&self, index: usize) -> Result<(), PhysicsError> {
        if index < self.particles.len() {
            Ok(())
        } else {
            Err(PhysicsError::ParticleOutOfBounds { index, count: self.particles.len() })
        }
    }

    /// Add a constraint whose particle indices all exist in this body.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint<F>>) -> Result<usize, PhysicsError> {
        let constraint = constraint.into();
        if let Some(max) = constraint.max_index() {
            self.check_index(max)?;
        }
        let idx = self.constraints.len();
        self.constraints.push(constraint);
        Ok(idx)
    }

    /// Unchecked push for builders that created the indices themselves.
    pub(crate) fn push_constraint(&mut self, constraint: impl Into<Constraint<F>>) {
        self.constraints.push(constraint.into());
    }

    /// Distance constraint resting at the particles' current separation.
    pub fn add_distance_constraint(&mut self, a: usize, b: usize, stiffness: F) -> Result<usize, PhysicsError> {
        self.check_index(a)?;
        self.check_index(b)?;
        let c = DistanceConstraint::from_particles(a, b, &self.particles, stiffness);
        self.add_constraint(c)
    }

    /// Shape-matching constraint over `indices`, resting at their current
    /// positions. A degenerate cluster is still added, flagged invalid.
    pub fn add_shape_matching(&mut self, indices: AllocVec<usize>, stiffness: F) -> Result<usize, PhysicsError> {
        for &i in &indices {
            self.check_index(i)?;
        }
        let c = ShapeMatchingConstraint::new(indices, &self.particles, stiffness);
        self.add_constraint(c)
    }

    /// Connect every pair of particles closer than `distance` with a distance
    /// constraint. Returns the number of constraints added.
    pub fn connect_within(&mut self, distance: F, stiffness: F) -> usize {
        if !(distance.is_finite() && distance > F::zero()) {
            return 0;
        }
        let Ok(mut grid) = SpatialHashGrid::<F, usize>::new(distance) else {
            return 0;
        };
        for (i, p) in self.particles.iter().enumerate() {
            grid.insert(i, p.pos);
        }
        let dist_sq = distance * distance;
        let mut near = AllocVec::new();
        let mut added = 0;
        for i in 0..self.particles.len() {
            near.clear();
            grid.query_neighbors(self.particles[i].pos, distance, &mut near);
            near.sort_unstable();
            for &j in near.iter().filter(|&&j| j > i) {
                if self.particles[i].pos.distance_sq(self.particles[j].pos) < dist_sq {
                    let c = DistanceConstraint::from_particles(i, j, &self.particles, stiffness);
                    self.constraints.push(c.into());
                    added += 1;
                }
            }
        }
        added
    }

    /// Remove every distance constraint touching `index`, cutting the
    /// particle loose. Shape-matching clusters keep it.
    pub fn detach_particle(&mut self, index: usize) -> usize {
        let before = self.constraints.len();
        self.constraints
            .retain(|c| !(matches!(c, Constraint::Distance(_)) && c.involves(index)));
        before - self.constraints.len()
    }

    pub fn particles(&self) -> &[Particle<F>] { &self.particles }
    pub fn particles_mut(&mut self) -> &mut [Particle<F>] { &mut self.particles }
    pub fn particle(&self, index: usize) -> &Particle<F> { &self.particles[index] }
    pub fn particle_mut(&mut self, index: usize) -> &mut Particle<F> { &mut self.particles[index] }
    pub fn constraints(&self) -> &[Constraint<F>] { &self.constraints }
    pub fn particle_count(&self) -> usize { self.particles.len() }
    pub fn constraint_count(&self) -> usize { self.constraints.len() }
    pub fn is_empty(&self) -> bool { self.particles.is_empty() }

    pub fn invalid_constraint_count(&self) -> usize {
        self.constraints.iter().filter(|c| !c.is_valid()).count()
    }

    pub fn pin(&mut self, index: usize) {
        self.particles[index].pin();
    }

    pub fn unpin(&mut self, index: usize, mass: F) {
        self.particles[index].unpin(mass);
    }

    pub fn move_pin(&mut self, index: usize, pos: Vec3<F>) {
        self.particles[index].move_to(pos);
    }

    /// Give every free particle `velocity`, measured per sub-step of this
    /// body's config.
    pub fn set_velocity(&mut self, velocity: Vec3<F>) {
        let dt = self.local_sub_dt();
        for p in self.particles.iter_mut() {
            p.set_velocity(velocity, dt);
        }
    }

    /// Replace the force queued on every particle for the next integration.
    pub fn apply_force(&mut self, force: Vec3<F>) {
        for p in self.particles.iter_mut() {
            p.set_force(force);
        }
    }

    /// Add to the force queued on every particle for the next integration.
    pub fn add_force(&mut self, force: Vec3<F>) {
        for p in self.particles.iter_mut() {
            p.apply_force(force);
        }
    }

    pub fn apply_acceleration(&mut self, accel: Vec3<F>) {
        for p in self.particles.iter_mut() {
            p.apply_acceleration(accel);
        }
    }

    /// Apply an impulse at the nearest particle to `point`.
    pub fn poke(&mut self, point: Vec3<F>, impulse: Vec3<F>) {
        let nearest = self
            .particles
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_fixed())
            .map(|(i, p)| (i, p.pos.distance_sq(point)))
            .fold(None, |best: Option<(usize, F)>, (i, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = nearest {
            // Verlet velocity = pos - prev_pos
            self.particles[i].prev_pos = self.particles[i].prev_pos - impulse;
        }
    }

    /// Mass-weighted centre; the plain average when the body has no mass.
    pub fn center_of_mass(&self) -> Vec3<F> {
        if self.particles.is_empty() {
            return Vec3::zero();
        }
        let mut sum = Vec3::zero();
        let mut total = F::zero();
        for p in &self.particles {
            sum = sum + p.pos.scale(p.mass());
            total = total + p.mass();
        }
        if total > F::from_f32(1e-10) {
            return sum.scale(F::one() / total);
        }
        let mut plain = Vec3::zero();
        for p in &self.particles {
            plain = plain + p.pos;
        }
        plain.scale(F::one() / F::from_usize(self.particles.len()))
    }

    /// Mass-weighted mean velocity over this body's sub-step.
    pub fn velocity(&self) -> Vec3<F> {
        let dt = self.local_sub_dt();
        let mut sum = Vec3::zero();
        let mut total = F::zero();
        for p in &self.particles {
            sum = sum + p.velocity(dt).scale(p.mass());
            total = total + p.mass();
        }
        if total > F::from_f32(1e-10) {
            sum.scale(F::one() / total)
        } else {
            Vec3::zero()
        }
    }

    /// Bounds of the particle centres, or `None` for an empty body.
    pub fn bounds(&self) -> Option<Aabb<F>> {
        let first = self.particles.first()?.pos;
        let mut bounds = Aabb { min: first, max: first };
        for p in &self.particles[1..] {
            bounds.min = bounds.min.min(p.pos);
            bounds.max = bounds.max.max(p.pos);
        }
        Some(bounds)
    }

    pub fn positions(&self) -> AllocVec<Vec3<F>> {
        self.particles.iter().map(|p| p.pos).collect()
    }

    /// Verlet-integrate every particle.
    pub fn integrate(&mut self, dt: F, gravity: Vec3<F>, damping: F) {
        for p in self.particles.iter_mut() {
            p.integrate(dt, gravity, damping);
        }
    }

    /// One relaxation pass over every valid constraint, in insertion order.
    pub fn solve_constraints(&mut self, mode: CorrectionMode) {
        for c in self.constraints.iter().filter(|c| c.is_valid()) {
            c.solve(&mut self.particles, mode);
        }
    }

    pub fn finalize_corrections(&mut self) {
        for p in self.particles.iter_mut() {
            p.finalize_corrections();
        }
    }

    /// Ground collision for every particle.
    pub fn apply_ground(&mut self, ground: &GroundPlane<F>) {
        for p in self.particles.iter_mut() {
            resolve_ground(p, ground);
        }
    }

    /// Advance this body alone by one fixed step of its config.
    pub fn step<O: StepObserver>(&mut self, observer: &mut O) {
        let config = self.config.clone().unwrap_or_default();
        let sub_dt = config.sub_dt();

        for _sub in 0..config.sub_steps.max(1) {
            self.integrate(sub_dt, config.gravity, config.damping);
            observer.on_integrate();

            for i in 0..config.iterations {
                self.solve_constraints(config.correction_mode);
                self.finalize_corrections();
                if let Some(ground) = &config.ground {
                    self.apply_ground(ground);
                }
                observer.on_constraint_iteration(i);
            }
        }

        observer.on_step_complete();
    }
}

impl<F: Float> Default for Body<F> {
    fn default() -> Self {
        Self::new()
    }
}
