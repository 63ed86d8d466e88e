//! Position constraints: pairwise distance and cluster shape matching.

use crate::config::CorrectionMode;
use crate::float::Float;
use crate::particle::Particle;
use crate::shape_matching::ShapeMatchingConstraint;
use crate::vec::Vec;

/// Below this, lengths and length errors are treated as zero.
pub(crate) const LENGTH_EPSILON: f32 = 1e-6;

/// A constraint that can be applied to a set of particles.
///
/// Particles are referenced by index into the owning body's particle list.
#[derive(Clone, Debug)]
pub enum Constraint<F: Float> {
    Distance(DistanceConstraint<F>),
    ShapeMatching(ShapeMatchingConstraint<F>),
}

impl<F: Float> Constraint<F> {
    pub fn solve(&self, particles: &mut [Particle<F>], mode: CorrectionMode) {
        match self {
            Constraint::Distance(c) => c.solve(particles, mode),
            Constraint::ShapeMatching(c) => c.solve(particles, mode),
        }
    }

    /// Invalid constraints are skipped by the solver.
    pub fn is_valid(&self) -> bool {
        match self {
            Constraint::Distance(c) => c.rest_length.is_finite() && c.stiffness.is_finite(),
            Constraint::ShapeMatching(c) => c.is_valid(),
        }
    }

    pub fn involves(&self, index: usize) -> bool {
        match self {
            Constraint::Distance(c) => c.a == index || c.b == index,
            Constraint::ShapeMatching(c) => c.indices().contains(&index),
        }
    }

    pub(crate) fn max_index(&self) -> Option<usize> {
        match self {
            Constraint::Distance(c) => Some(c.a.max(c.b)),
            Constraint::ShapeMatching(c) => c.indices().iter().copied().max(),
        }
    }
}

impl<F: Float> From<DistanceConstraint<F>> for Constraint<F> {
    fn from(c: DistanceConstraint<F>) -> Self {
        Constraint::Distance(c)
    }
}

impl<F: Float> From<ShapeMatchingConstraint<F>> for Constraint<F> {
    fn from(c: ShapeMatchingConstraint<F>) -> Self {
        Constraint::ShapeMatching(c)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DistanceConstraint<F: Float> {
    pub a: usize,
    pub b: usize,
    pub rest_length: F,
    pub stiffness: F,
}

impl<F: Float> DistanceConstraint<F> {
    /// Negative rest lengths clamp to zero and stiffness clamps to [0, 1].
    pub fn new(a: usize, b: usize, rest_length: F, stiffness: F) -> Self {
        DistanceConstraint {
            a,
            b,
            rest_length: rest_length.max(F::zero()),
            stiffness: stiffness.clamp01(),
        }
    }

    /// Rest length taken from the particles' current separation.
    pub fn from_particles(a: usize, b: usize, particles: &[Particle<F>], stiffness: F) -> Self {
        let rest_length = particles[a].pos.distance(particles[b].pos);
        Self::new(a, b, rest_length, stiffness)
    }

    /// One Gauss-Seidel relaxation toward `rest_length`, split by inverse mass.
    pub fn solve(&self, particles: &mut [Particle<F>], mode: CorrectionMode) {
        let eps = F::from_f32(LENGTH_EPSILON);
        let a_pos = particles[self.a].pos;
        let b_pos = particles[self.b].pos;

        let delta = b_pos - a_pos;
        let dist = delta.length();
        if dist < eps {
            return; // coincident, direction undefined
        }

        let error = dist - self.rest_length;
        if error.abs() < eps {
            return;
        }

        let a_inv = particles[self.a].inv_mass();
        let b_inv = particles[self.b].inv_mass();
        let w_total = a_inv + b_inv;
        if w_total < F::from_f32(1e-10) {
            return; // both fixed
        }

        let correction = delta.scale(error * self.stiffness / dist);
        particles[self.a].apply_correction(correction.scale(a_inv / w_total), mode);
        particles[self.b].apply_correction(-correction.scale(b_inv / w_total), mode);
    }
}
