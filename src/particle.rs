//! Verlet particles with position-based dynamics.

use crate::config::CorrectionMode;
use crate::float::Float;
use crate::vec::{Vec, Vec3};
use crate::world::BodyId;

/// Default collision radius for new particles.
pub const DEFAULT_RADIUS: f32 = 0.1;

fn inverse_of<F: Float>(mass: F) -> F {
    if mass <= F::from_f32(1e-10) {
        F::zero()
    } else {
        F::one() / mass
    }
}

/// A Verlet particle: position-based dynamics with implicit velocity.
///
/// `inv_mass` is kept in step with `mass` and `fixed`: it is zero exactly when
/// the particle is fixed or massless. Change those through `set_mass`, `pin`
/// and `unpin` rather than writing the fields.
#[derive(Clone, Debug)]
pub struct Particle<F: Float> {
    pub pos: Vec3<F>,
    pub prev_pos: Vec3<F>,
    pub radius: F,
    mass: F,
    inv_mass: F,
    fixed: bool,
    force: Vec3<F>,
    correction: Vec3<F>,
    correction_count: u32,
    body: Option<BodyId>,
}

impl<F: Float> Particle<F> {
    pub fn new(pos: Vec3<F>, mass: F) -> Self {
        Particle {
            pos,
            prev_pos: pos,
            radius: F::from_f32(DEFAULT_RADIUS),
            mass,
            inv_mass: inverse_of(mass),
            fixed: false,
            force: Vec3::zero(),
            correction: Vec3::zero(),
            correction_count: 0,
            body: None,
        }
    }

    /// An immovable particle. Its mass is kept for mass-weighted centroids.
    pub fn fixed(pos: Vec3<F>, mass: F) -> Self {
        let mut p = Self::new(pos, mass);
        p.pin();
        p
    }

    pub fn with_radius(mut self, radius: F) -> Self {
        self.radius = radius.max(F::zero());
        self
    }

    pub fn mass(&self) -> F { self.mass }
    pub fn inv_mass(&self) -> F { self.inv_mass }
    pub fn is_fixed(&self) -> bool { self.fixed }
    pub fn body(&self) -> Option<BodyId> { self.body }

    /// Force queued for the next integration.
    pub fn pending_force(&self) -> Vec3<F> { self.force }

    pub(crate) fn set_body(&mut self, body: Option<BodyId>) {
        self.body = body;
    }

    pub fn set_mass(&mut self, mass: F) {
        self.mass = mass;
        self.inv_mass = if self.fixed { F::zero() } else { inverse_of(mass) };
    }

    /// Queue a force for the next integration (scaled by inverse mass).
    pub fn apply_force(&mut self, force: Vec3<F>) {
        if !self.fixed {
            self.force = self.force + force;
        }
    }

    /// Replace whatever force is queued for the next integration.
    pub fn set_force(&mut self, force: Vec3<F>) {
        self.force = if self.fixed { Vec3::zero() } else { force };
    }

    /// Queue a mass-independent acceleration for the next integration.
    pub fn apply_acceleration(&mut self, accel: Vec3<F>) {
        if !self.fixed && self.inv_mass > F::zero() {
            self.force = self.force + accel.scale(self.mass);
        }
    }

    /// Velocity-Verlet step. Queued forces are consumed even when fixed.
    pub fn integrate(&mut self, dt: F, external_acceleration: Vec3<F>, damping: F) {
        let force = self.force;
        self.force = Vec3::zero();
        if self.fixed {
            return;
        }
        let accel = external_acceleration + force.scale(self.inv_mass);
        let velocity = (self.pos - self.prev_pos).scale(damping);
        self.prev_pos = self.pos;
        self.pos = self.pos + velocity + accel.scale(dt * dt);
    }

    pub fn velocity(&self, dt: F) -> Vec3<F> {
        if dt.is_near_zero(F::from_f32(1e-30)) {
            return Vec3::zero();
        }
        (self.pos - self.prev_pos).scale(F::one() / dt)
    }

    pub fn velocity_raw(&self) -> Vec3<F> {
        self.pos - self.prev_pos
    }

    /// Set the implied velocity by rewriting the previous position.
    pub fn set_velocity(&mut self, velocity: Vec3<F>, dt: F) {
        if !self.fixed {
            self.prev_pos = self.pos - velocity.scale(dt);
        }
    }

    pub fn pin(&mut self) {
        self.fixed = true;
        self.inv_mass = F::zero();
        self.prev_pos = self.pos;
        self.force = Vec3::zero();
        self.clear_correction();
    }

    pub fn unpin(&mut self, mass: F) {
        self.fixed = false;
        self.set_mass(mass);
    }

    /// Move a pinned particle; free particles are left alone.
    pub fn move_to(&mut self, pos: Vec3<F>) {
        if self.fixed {
            self.prev_pos = self.pos;
            self.pos = pos;
        }
    }

    /// Route a positional correction through the configured mode.
    pub fn apply_correction(&mut self, delta: Vec3<F>, mode: CorrectionMode) {
        if self.fixed {
            return;
        }
        match mode {
            CorrectionMode::Immediate => self.pos = self.pos + delta,
            CorrectionMode::Averaged => {
                self.correction = self.correction + delta;
                self.correction_count += 1;
            }
        }
    }

    pub fn pending_corrections(&self) -> u32 {
        self.correction_count
    }

    /// Apply the mean of the accumulated corrections once, then reset.
    pub fn finalize_corrections(&mut self) {
        if self.correction_count > 0 && !self.fixed {
            let n = F::from_f32(self.correction_count as f32);
            self.pos = self.pos + self.correction.scale(F::one() / n);
        }
        self.clear_correction();
    }

    fn clear_correction(&mut self) {
        self.correction = Vec3::zero();
        self.correction_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mass_is_immovable_by_constraints() {
        let p = Particle::new(Vec3::new(0.0f32, 0.0, 0.0), 0.0);
        assert_eq!(p.inv_mass(), 0.0);
        assert!(!p.is_fixed());
    }

    #[test]
    fn pin_unpin_keeps_inverse_mass_in_step() {
        let mut p = Particle::new(Vec3::new(1.0f32, 2.0, 3.0), 2.0);
        assert_eq!(p.inv_mass(), 0.5);
        p.pin();
        assert!(p.is_fixed());
        assert_eq!(p.inv_mass(), 0.0);
        p.set_mass(4.0);
        assert_eq!(p.inv_mass(), 0.0, "fixed particles stay at zero inverse mass");
        p.unpin(4.0);
        assert_eq!(p.inv_mass(), 0.25);
    }

    #[test]
    fn force_is_one_shot() {
        let mut p = Particle::new(Vec3::new(0.0f32, 0.0, 0.0), 1.0);
        p.apply_force(Vec3::new(1.0, 0.0, 0.0));
        p.integrate(1.0, Vec3::zero(), 1.0);
        assert!((p.pos.x - 1.0).abs() < 1e-6);
        assert_eq!(p.pending_force(), Vec3::zero());
        // Velocity carries on, no further acceleration.
        p.integrate(1.0, Vec3::zero(), 1.0);
        assert!((p.pos.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn averaged_corrections_apply_mean() {
        let mut p = Particle::new(Vec3::new(0.0f32, 0.0, 0.0), 1.0);
        p.apply_correction(Vec3::new(1.0, 0.0, 0.0), CorrectionMode::Averaged);
        p.apply_correction(Vec3::new(0.0, 1.0, 0.0), CorrectionMode::Averaged);
        assert_eq!(p.pos, Vec3::zero());
        assert_eq!(p.pending_corrections(), 2);
        p.finalize_corrections();
        assert!((p.pos.x - 0.5).abs() < 1e-6);
        assert!((p.pos.y - 0.5).abs() < 1e-6);
        assert_eq!(p.pending_corrections(), 0);
    }

    #[test]
    fn fixed_particle_ignores_corrections() {
        let mut p = Particle::fixed(Vec3::new(1.0f32, 1.0, 1.0), 1.0);
        p.apply_correction(Vec3::new(5.0, 0.0, 0.0), CorrectionMode::Immediate);
        p.apply_correction(Vec3::new(5.0, 0.0, 0.0), CorrectionMode::Averaged);
        p.finalize_corrections();
        assert_eq!(p.pos, Vec3::new(1.0, 1.0, 1.0));
    }
}
