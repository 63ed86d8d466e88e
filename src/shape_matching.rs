//! Shape matching: pull a particle cluster toward the best-fit rigid
//! transform of its rest pose.
//!
//! The rest pose is captured once at construction: mass-weighted centre,
//! per-particle offsets `q_i`, and the regularised rest covariance
//! `C = Σ m_i q_i ⊗ q_i + εI` with its inverse. Each solve builds
//! `A = (Σ m_i (p_i - c) ⊗ q_i) · C⁻¹`, extracts its rotational part by
//! polar decomposition and moves every particle toward `R q_i + c`.
//!
//! Particle masses are part of the rest pose: they are copied when the
//! cluster is built, and a later `Particle::set_mass` does not change the
//! centroid or the fit until the constraint is rebuilt.

use alloc::vec::Vec as AllocVec;

use crate::config::CorrectionMode;
use crate::float::Float;
use crate::mat::Mat3;
use crate::particle::Particle;
use crate::vec::{Vec, Vec3};

/// Added to the rest covariance diagonal before inversion.
pub const COVARIANCE_REGULARIZATION: f32 = 1e-3;
/// Regularised rest covariances with `|det|` at or below this are singular.
pub const SINGULAR_DETERMINANT: f32 = 1e-3;

const POLAR_MAX_ITERATIONS: usize = 16;
const POLAR_TOLERANCE: f32 = 1e-5;
const POLAR_MIN_DETERMINANT: f32 = 1e-6;

/// Minimum cluster size for a meaningful rest covariance.
pub const MIN_PARTICLES: usize = 3;

#[derive(Clone, Debug)]
pub struct ShapeMatchingConstraint<F: Float> {
    indices: AllocVec<usize>,
    masses: AllocVec<F>,
    rest_offsets: AllocVec<Vec3<F>>,
    rest_center: Vec3<F>,
    rest_covariance: Mat3<F>,
    inv_rest_covariance: Mat3<F>,
    pub stiffness: F,
    valid: bool,
}

impl<F: Float> ShapeMatchingConstraint<F> {
    /// Capture the rest pose of `indices` from their current positions and
    /// masses.
    ///
    /// Never fails: clusters that are too small, reference missing particles,
    /// have no mass, are entirely fixed or have a singular rest covariance are
    /// built as invalid and skipped by `solve`.
    pub fn new(indices: AllocVec<usize>, particles: &[Particle<F>], stiffness: F) -> Self {
        let mut c = ShapeMatchingConstraint {
            indices,
            masses: AllocVec::new(),
            rest_offsets: AllocVec::new(),
            rest_center: Vec3::zero(),
            rest_covariance: Mat3::zero(),
            inv_rest_covariance: Mat3::identity(),
            stiffness: stiffness.clamp01(),
            valid: false,
        };
        c.valid = c.precompute_rest(particles);
        c
    }

    fn precompute_rest(&mut self, particles: &[Particle<F>]) -> bool {
        if self.indices.len() < MIN_PARTICLES {
            log::warn!(
                "shape matching needs at least {} particles, got {}",
                MIN_PARTICLES,
                self.indices.len()
            );
            return false;
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i >= particles.len()) {
            log::warn!("shape matching references particle {} of {}", bad, particles.len());
            return false;
        }

        let mut total_mass = F::zero();
        let mut center = Vec3::zero();
        let mut any_free = false;
        for &i in &self.indices {
            let p = &particles[i];
            self.masses.push(p.mass());
            total_mass = total_mass + p.mass();
            center = center + p.pos.scale(p.mass());
            any_free |= !p.is_fixed();
        }
        if total_mass < F::from_f32(1e-6) {
            log::warn!("shape matching cluster has no mass");
            return false;
        }
        self.rest_center = center.scale(F::one() / total_mass);

        let mut cov = Mat3::zero();
        for (&i, &m) in self.indices.iter().zip(&self.masses) {
            let q = particles[i].pos - self.rest_center;
            self.rest_offsets.push(q);
            cov.add_outer(q, q, m);
        }
        self.rest_covariance = cov.regularized(F::from_f32(COVARIANCE_REGULARIZATION));

        if !any_free {
            log::warn!("shape matching cluster is entirely fixed");
            return false;
        }
        match self.rest_covariance.inverse(F::from_f32(SINGULAR_DETERMINANT)) {
            Some(inv) => {
                self.inv_rest_covariance = inv;
                true
            }
            None => {
                log::warn!("shape matching rest configuration is singular");
                false
            }
        }
    }

    pub fn is_valid(&self) -> bool { self.valid }
    pub fn indices(&self) -> &[usize] { &self.indices }
    pub fn rest_center(&self) -> Vec3<F> { self.rest_center }
    pub fn rest_offsets(&self) -> &[Vec3<F>] { &self.rest_offsets }
    pub fn rest_covariance(&self) -> &Mat3<F> { &self.rest_covariance }

    /// Masses captured at construction, parallel to `indices`.
    pub fn masses(&self) -> &[F] { &self.masses }

    /// Mass-weighted centroid of the cluster's current positions.
    pub fn current_center(&self, particles: &[Particle<F>]) -> Vec3<F> {
        let mut sum = Vec3::zero();
        let mut total = F::zero();
        for (&i, &m) in self.indices.iter().zip(&self.masses) {
            sum = sum + particles[i].pos.scale(m);
            total = total + m;
        }
        sum.scale(F::one() / total)
    }

    /// Best-fit linear transform `A · C⁻¹` and its rotation, for diagnostics.
    pub fn fit(&self, particles: &[Particle<F>]) -> Option<(Vec3<F>, Mat3<F>)> {
        if !self.valid {
            return None;
        }
        let center = self.current_center(particles);
        let mut apq = Mat3::zero();
        for ((&i, &m), &q) in self.indices.iter().zip(&self.masses).zip(&self.rest_offsets) {
            apq.add_outer(particles[i].pos - center, q, m);
        }
        Some((center, extract_rotation(apq * self.inv_rest_covariance)))
    }

    pub fn solve(&self, particles: &mut [Particle<F>], mode: CorrectionMode) {
        let Some((center, rotation)) = self.fit(particles) else {
            return;
        };
        for (&i, &q) in self.indices.iter().zip(&self.rest_offsets) {
            let goal = rotation.mul_vec(q) + center;
            let correction = (goal - particles[i].pos).scale(self.stiffness);
            particles[i].apply_correction(correction, mode);
        }
    }
}

/// Rotational part of `a` by the Newton polar iteration `R ← ½(R + R⁻ᵀ)`.
///
/// Stops once successive iterates differ by less than the tolerance. If an
/// iterate becomes near-singular the last good estimate is returned; when
/// `a` itself is near-singular the identity is returned.
pub fn extract_rotation<F: Float>(a: Mat3<F>) -> Mat3<F> {
    let min_det = F::from_f32(POLAR_MIN_DETERMINANT);
    if a.determinant().abs() < min_det {
        return Mat3::identity();
    }
    let mut r = a;
    for _ in 0..POLAR_MAX_ITERATIONS {
        let Some(inv_t) = r.inverse_transpose(min_det) else {
            break;
        };
        let next = (r + inv_t).scale(F::half());
        let change = next.distance(&r);
        r = next;
        if change < F::from_f32(POLAR_TOLERANCE) {
            break;
        }
    }
    r
}
