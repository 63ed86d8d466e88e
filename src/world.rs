//! The simulation world: a body arena driven by one fixed-step loop with
//! inter-body particle collisions.

use alloc::vec::Vec as AllocVec;

use crate::body::Body;
use crate::config::{CorrectionMode, WorldConfig};
use crate::error::PhysicsError;
use crate::float::Float;
use crate::observer::StepObserver;
use crate::particle::Particle;
use crate::spatial::SpatialHashGrid;
use crate::vec::{Vec, Vec3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const SEPARATION_EPSILON: f32 = 1e-6;

/// Handle to a body registered with a [`SimulationWorld`].
///
/// Handles are generational: once a body is removed its handle stops
/// resolving, even after the slot is reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId {
    index: u32,
    generation: u32,
}

impl BodyId {
    pub fn index(&self) -> u32 { self.index }
    pub fn generation(&self) -> u32 { self.generation }
}

/// Stable address of a particle inside the world for the current step.
///
/// Ordered by body slot then particle index; collision pairs always hold
/// the smaller reference in `a`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleRef {
    pub body: u32,
    pub particle: u32,
}

/// A candidate contact between particles of two different bodies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionPair<F: Float> {
    pub a: ParticleRef,
    pub b: ParticleRef,
    /// Sum of the two radii.
    pub min_distance: F,
}

#[derive(Clone, Debug)]
struct Slot<F: Float> {
    generation: u32,
    body: Option<Body<F>>,
}

fn particle_at<F: Float>(slots: &[Slot<F>], r: ParticleRef) -> Option<&Particle<F>> {
    slots
        .get(r.body as usize)?
        .body
        .as_ref()?
        .particles()
        .get(r.particle as usize)
}

/// Mutable access to two particles in different body slots.
fn particle_pair_mut<F: Float>(
    slots: &mut [Slot<F>],
    a: ParticleRef,
    b: ParticleRef,
) -> Option<(&mut Particle<F>, &mut Particle<F>)> {
    let (ia, ib) = (a.body as usize, b.body as usize);
    if ia == ib || ia >= slots.len() || ib >= slots.len() {
        return None;
    }
    let (sa, sb) = if ia < ib {
        let (lo, hi) = slots.split_at_mut(ib);
        (&mut lo[ia], &mut hi[0])
    } else {
        let (lo, hi) = slots.split_at_mut(ia);
        (&mut hi[0], &mut lo[ib])
    };
    let pa = sa.body.as_mut()?.particles_mut().get_mut(a.particle as usize)?;
    let pb = sb.body.as_mut()?.particles_mut().get_mut(b.particle as usize)?;
    Some((pa, pb))
}

/// Owns every body and runs the global fixed-timestep loop:
/// integrate, rebuild the grid, find contacts, then iterate constraints,
/// collisions and ground together.
#[derive(Clone, Debug)]
pub struct SimulationWorld<F: Float> {
    config: WorldConfig<F>,
    slots: AllocVec<Slot<F>>,
    free: AllocVec<u32>,
    live: usize,
    grid: SpatialHashGrid<F, ParticleRef>,
    pairs: AllocVec<CollisionPair<F>>,
    neighbors: AllocVec<ParticleRef>,
    accumulator: F,
}

impl<F: Float> SimulationWorld<F> {
    pub fn new(config: WorldConfig<F>) -> Result<Self, PhysicsError> {
        config.validate()?;
        let grid = SpatialHashGrid::new(config.collision.cell_size)?;
        Ok(SimulationWorld {
            config,
            slots: AllocVec::new(),
            free: AllocVec::new(),
            live: 0,
            grid,
            pairs: AllocVec::new(),
            neighbors: AllocVec::new(),
            accumulator: F::zero(),
        })
    }

    pub fn config(&self) -> &WorldConfig<F> { &self.config }

    /// Replace the world's settings. An invalid config is rejected and the
    /// current one kept.
    pub fn set_config(&mut self, config: WorldConfig<F>) -> Result<(), PhysicsError> {
        config.validate()?;
        if self.grid.cell_size() != config.collision.cell_size {
            self.grid = SpatialHashGrid::new(config.collision.cell_size)?;
        }
        self.pairs.clear();
        self.config = config;
        Ok(())
    }

    /// Register a body and return its handle. Freed slots are reused with a
    /// bumped generation. A body carrying an invalid config is rejected.
    pub fn add_body(&mut self, mut body: Body<F>) -> Result<BodyId, PhysicsError> {
        if let Some(config) = body.config() {
            config.validate()?;
        }
        let (index, generation) = match self.free.pop() {
            Some(index) => (index, self.slots[index as usize].generation),
            None => {
                self.slots.push(Slot { generation: 0, body: None });
                ((self.slots.len() - 1) as u32, 0)
            }
        };
        let id = BodyId { index, generation };
        body.set_id(Some(id));
        log::debug!(
            "registered body {:?}: {} particles, {} constraints",
            id,
            body.particle_count(),
            body.constraint_count()
        );
        self.slots[index as usize].body = Some(body);
        self.live += 1;
        Ok(id)
    }

    /// Unregister a body, handing it back to the caller. Stale handles
    /// return `None`.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body<F>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let mut body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        // Contacts may point into the removed slot.
        self.pairs.clear();
        body.set_id(None);
        log::debug!("removed body {:?}", id);
        Some(body)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.body(id).is_some()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body<F>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.body.as_ref()
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body<F>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.body.as_mut()
    }

    fn live_body_mut(&mut self, id: BodyId) -> Result<&mut Body<F>, PhysicsError> {
        self.body_mut(id).ok_or(PhysicsError::UnknownBody(id))
    }

    /// Live bodies in slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body<F>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let id = BodyId { index: i as u32, generation: slot.generation };
            slot.body.as_ref().map(|b| (id, b))
        })
    }

    pub fn body_ids(&self) -> AllocVec<BodyId> {
        self.bodies().map(|(id, _)| id).collect()
    }

    pub fn body_count(&self) -> usize { self.live }

    pub fn particle_count(&self) -> usize {
        self.bodies().map(|(_, b)| b.particle_count()).sum()
    }

    /// Set a body's velocity, measured per sub-step of the world's solver.
    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec3<F>) -> Result<(), PhysicsError> {
        let dt = self.config.solver.sub_dt();
        let body = self.live_body_mut(id)?;
        for p in body.particles_mut() {
            p.set_velocity(velocity, dt);
        }
        Ok(())
    }

    /// Replace the force queued on every particle of a body.
    pub fn apply_force(&mut self, id: BodyId, force: Vec3<F>) -> Result<(), PhysicsError> {
        self.live_body_mut(id)?.apply_force(force);
        Ok(())
    }

    /// Add to the force queued on every particle of a body.
    pub fn add_force(&mut self, id: BodyId, force: Vec3<F>) -> Result<(), PhysicsError> {
        self.live_body_mut(id)?.add_force(force);
        Ok(())
    }

    /// Contacts found by the most recent detection pass.
    pub fn collision_pairs(&self) -> &[CollisionPair<F>] {
        &self.pairs
    }

    /// Time banked by `advance` that has not yet been stepped.
    pub fn accumulated_time(&self) -> F {
        self.accumulator
    }

    /// Fraction of a step banked by `advance`, for render interpolation.
    pub fn interpolation_alpha(&self) -> F {
        (self.accumulator / self.config.solver.time_step).clamp01()
    }

    /// Rebuild the grid from every live particle and collect contacts
    /// between particles of different bodies.
    pub fn detect_collisions(&mut self) -> &[CollisionPair<F>] {
        self.grid.clear();
        self.pairs.clear();

        let collision = &self.config.collision;
        if !collision.enabled {
            return &self.pairs;
        }
        let margin = collision.contact_margin;

        let mut max_radius = F::zero();
        for (si, slot) in self.slots.iter().enumerate() {
            let Some(body) = slot.body.as_ref() else { continue };
            for (pi, p) in body.particles().iter().enumerate() {
                let r = ParticleRef { body: si as u32, particle: pi as u32 };
                self.grid.insert(r, p.pos);
                max_radius = max_radius.max(p.radius);
            }
        }

        for (si, slot) in self.slots.iter().enumerate() {
            let Some(body) = slot.body.as_ref() else { continue };
            for (pi, p) in body.particles().iter().enumerate() {
                let ra = ParticleRef { body: si as u32, particle: pi as u32 };
                self.neighbors.clear();
                self.grid
                    .query_neighbors(p.pos, p.radius + max_radius + margin, &mut self.neighbors);

                for &rb in &self.neighbors {
                    if rb.body == ra.body || rb <= ra {
                        continue;
                    }
                    let Some(q) = particle_at(&self.slots, rb) else { continue };
                    let min_distance = p.radius + q.radius;
                    let limit = min_distance + margin;
                    if p.pos.distance_sq(q.pos) < limit * limit {
                        self.pairs.push(CollisionPair { a: ra, b: rb, min_distance });
                    }
                }
            }
        }

        log::trace!("broad phase: {} contacts", self.pairs.len());
        &self.pairs
    }

    /// Push overlapping pairs apart, splitting the overlap by inverse mass.
    fn resolve_collisions(&mut self, mode: CorrectionMode) {
        let stiffness = self.config.collision.stiffness;
        let eps = F::from_f32(SEPARATION_EPSILON);
        for pair in &self.pairs {
            let Some((pa, pb)) = particle_pair_mut(&mut self.slots, pair.a, pair.b) else {
                continue;
            };
            let delta = pb.pos - pa.pos;
            let dist = delta.length();
            if dist < eps || dist >= pair.min_distance {
                continue;
            }
            let w_sum = pa.inv_mass() + pb.inv_mass();
            if w_sum <= F::zero() {
                continue;
            }
            let normal = delta.scale(F::one() / dist);
            let push = normal.scale((pair.min_distance - dist) * stiffness / w_sum);
            pa.apply_correction(-push.scale(pa.inv_mass()), mode);
            pb.apply_correction(push.scale(pb.inv_mass()), mode);
        }
    }

    /// Remove part of the approach velocity of pairs still in contact.
    fn damp_contacts(&mut self) {
        let damping = self.config.collision.damping;
        let margin = self.config.collision.contact_margin;
        let eps = F::from_f32(SEPARATION_EPSILON);
        for pair in &self.pairs {
            let Some((pa, pb)) = particle_pair_mut(&mut self.slots, pair.a, pair.b) else {
                continue;
            };
            let delta = pb.pos - pa.pos;
            let dist = delta.length();
            if dist < eps || dist > pair.min_distance + margin {
                continue;
            }
            let w_sum = pa.inv_mass() + pb.inv_mass();
            if w_sum <= F::zero() {
                continue;
            }
            let normal = delta.scale(F::one() / dist);
            let approach = (pb.velocity_raw() - pa.velocity_raw()).dot(normal);
            if approach >= F::zero() {
                continue;
            }
            let impulse = normal.scale(-approach * damping / w_sum);
            // Verlet velocity = pos - prev_pos
            pa.prev_pos = pa.prev_pos + impulse.scale(pa.inv_mass());
            pb.prev_pos = pb.prev_pos - impulse.scale(pb.inv_mass());
        }
    }

    /// Gravity and damping come from the body's own config when it has one,
    /// otherwise from the world's solver.
    fn integrate_bodies(&mut self, dt: F) {
        let world = &self.config.solver;

        #[cfg(feature = "parallel")]
        self.slots
            .par_iter_mut()
            .filter_map(|slot| slot.body.as_mut())
            .for_each(|body| {
                let cfg = body.effective_config(world);
                let (gravity, damping) = (cfg.gravity, cfg.damping);
                body.integrate(dt, gravity, damping);
            });

        #[cfg(not(feature = "parallel"))]
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            let cfg = body.effective_config(world);
            let (gravity, damping) = (cfg.gravity, cfg.damping);
            body.integrate(dt, gravity, damping);
        }
    }

    fn apply_ground(&mut self) {
        let world = &self.config.solver;
        for body in self.slots.iter_mut().filter_map(|slot| slot.body.as_mut()) {
            if let Some(ground) = body.effective_config(world).ground {
                body.apply_ground(&ground);
            }
        }
    }

    fn live_bodies_mut(&mut self) -> impl Iterator<Item = &mut Body<F>> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.body.as_mut())
    }

    /// Advance the whole world by one fixed step.
    pub fn step<O: StepObserver>(&mut self, observer: &mut O) {
        let sub_dt = self.config.solver.sub_dt();
        let sub_steps = self.config.solver.sub_steps.max(1);
        let iterations = self.config.solver.iterations;
        let mode = self.config.solver.correction_mode;
        let damp = self.config.collision.damping > F::zero();

        for _sub in 0..sub_steps {
            self.integrate_bodies(sub_dt);
            observer.on_integrate();

            let contacts = self.detect_collisions().len();
            observer.on_broad_phase(contacts);

            for i in 0..iterations {
                for body in self.live_bodies_mut() {
                    body.solve_constraints(mode);
                    body.finalize_corrections();
                }
                if !self.pairs.is_empty() {
                    self.resolve_collisions(mode);
                    for body in self.live_bodies_mut() {
                        body.finalize_corrections();
                    }
                }
                self.apply_ground();
                observer.on_constraint_iteration(i);
            }

            if damp && !self.pairs.is_empty() {
                self.damp_contacts();
            }
        }

        observer.on_step_complete();
    }

    /// Bank `frame_dt` and run as many fixed steps as it covers, up to
    /// `max_steps_per_advance`. Time beyond the cap is dropped. Returns the
    /// number of steps run.
    pub fn advance<O: StepObserver>(&mut self, frame_dt: F, observer: &mut O) -> usize {
        if !(frame_dt.is_finite() && frame_dt > F::zero()) {
            return 0;
        }
        let dt = self.config.solver.time_step;
        let max_steps = self.config.max_steps_per_advance.max(1);
        self.accumulator = self.accumulator + frame_dt;

        let mut steps = 0;
        while self.accumulator >= dt && steps < max_steps {
            self.step(observer);
            self.accumulator = self.accumulator - dt;
            steps += 1;
        }
        if self.accumulator >= dt {
            let whole = (self.accumulator / dt).floor();
            log::debug!("advance fell behind, dropping {:?} steps", whole.to_i32());
            self.accumulator = self.accumulator - whole * dt;
        }
        steps
    }

    /// The body owning the particle nearest to a ray, among particles
    /// within `threshold` of it and not behind `origin`.
    pub fn pick_body(&self, origin: Vec3<F>, direction: Vec3<F>, threshold: F) -> Option<BodyId> {
        let dir = direction.normalize();
        if dir.length_sq() <= F::zero() {
            return None;
        }
        let mut best: Option<(BodyId, F)> = None;
        for (id, body) in self.bodies() {
            for p in body.particles() {
                let to_p = p.pos - origin;
                let t = to_p.dot(dir);
                if t < F::zero() {
                    continue;
                }
                let off = to_p.distance(dir.scale(t));
                if off >= threshold {
                    continue;
                }
                match best {
                    Some((_, d)) if d <= off => {}
                    _ => best = Some((id, off)),
                }
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::observer::NoOpStepObserver;

    fn world() -> SimulationWorld<f32> {
        let solver = SolverConfig::new().with_gravity(Vec3::zero()).with_damping(1.0);
        SimulationWorld::new(WorldConfig::new().with_solver(solver)).unwrap()
    }

    fn lone(pos: Vec3<f32>) -> Body<f32> {
        let mut body = Body::new().with_config(SolverConfig::new().with_gravity(Vec3::zero()));
        body.add_particle(Particle::new(pos, 1.0));
        body
    }

    #[test]
    fn removed_handles_go_stale() {
        let mut w = world();
        let a = w.add_body(lone(Vec3::zero())).unwrap();
        assert!(w.contains(a));
        assert!(w.remove_body(a).is_some());
        assert!(!w.contains(a));
        assert!(w.remove_body(a).is_none());
        assert_eq!(w.add_force(a, Vec3::zero()), Err(PhysicsError::UnknownBody(a)));

        let b = w.add_body(lone(Vec3::zero())).unwrap();
        assert_eq!(b.index(), a.index());
        assert_eq!(b.generation(), a.generation() + 1);
        assert_eq!(w.body_count(), 1);
    }

    #[test]
    fn registered_particles_know_their_body() {
        let mut w = world();
        let id = w.add_body(lone(Vec3::zero())).unwrap();
        assert_eq!(w.body(id).unwrap().particle(0).body(), Some(id));
        let body = w.remove_body(id).unwrap();
        assert_eq!(body.particle(0).body(), None);
    }

    #[test]
    fn same_body_particles_never_pair() {
        let mut w = world();
        let mut body = lone(Vec3::zero());
        body.add_particle(Particle::new(Vec3::new(0.05, 0.0, 0.0), 1.0));
        w.add_body(body).unwrap();
        assert!(w.detect_collisions().is_empty());
    }

    #[test]
    fn pairs_are_canonical_and_unique() {
        let mut w = world();
        w.add_body(lone(Vec3::new(0.0, 0.0, 0.0))).unwrap();
        w.add_body(lone(Vec3::new(0.15, 0.0, 0.0))).unwrap();
        let pairs = w.detect_collisions();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].a < pairs[0].b);
        assert!((pairs[0].min_distance - 0.2).abs() < 1e-6);
    }

    #[test]
    fn disabled_collisions_find_nothing() {
        let cfg = WorldConfig::new().with_collision(crate::config::CollisionConfig::disabled());
        let mut w = SimulationWorld::<f32>::new(cfg).unwrap();
        w.add_body(lone(Vec3::new(0.0, 0.0, 0.0))).unwrap();
        w.add_body(lone(Vec3::new(0.05, 0.0, 0.0))).unwrap();
        assert!(w.detect_collisions().is_empty());
    }

    #[test]
    fn pick_finds_nearest_along_ray() {
        let mut w = world();
        let near = w.add_body(lone(Vec3::new(0.0, 0.0, 5.0))).unwrap();
        let _far = w.add_body(lone(Vec3::new(0.3, 0.0, 10.0))).unwrap();
        let hit = w.pick_body(Vec3::zero(), Vec3::new(0.0, 0.0, 1.0), 0.5);
        assert_eq!(hit, Some(near));
        assert_eq!(w.pick_body(Vec3::zero(), Vec3::new(0.0, 0.0, -1.0), 0.5), None);
    }

    #[test]
    fn step_survives_removal_between_steps() {
        let mut w = world();
        let a = w.add_body(lone(Vec3::new(0.0, 0.0, 0.0))).unwrap();
        w.add_body(lone(Vec3::new(0.15, 0.0, 0.0))).unwrap();
        w.step(&mut NoOpStepObserver);
        w.remove_body(a);
        w.step(&mut NoOpStepObserver);
        assert_eq!(w.particle_count(), 1);
    }
}
