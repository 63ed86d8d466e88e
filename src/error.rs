//! Error types for physics operations.
//!
//! Only configuration and API misuse produce errors. Degenerate geometry met
//! while stepping is skipped for that step instead.

use crate::world::BodyId;
use thiserror::Error;

/// Errors that can occur while configuring or driving the simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// Mass must be positive and finite.
    #[error("mass must be positive and finite")]
    InvalidMass,
    /// Stiffness must be in [0, 1].
    #[error("stiffness must be in [0, 1]")]
    InvalidStiffness,
    /// Time step must be positive and finite.
    #[error("time step must be positive and finite")]
    InvalidTimeStep,
    /// Damping must be in (0, 1].
    #[error("damping must be in (0, 1]")]
    InvalidDamping,
    /// Spatial hash cells must have a positive, finite size.
    #[error("cell size must be positive and finite")]
    InvalidCellSize,
    /// Particle index is out of bounds.
    #[error("particle index {index} out of bounds (count: {count})")]
    ParticleOutOfBounds { index: usize, count: usize },
    /// The body was removed from the world, or never belonged to it.
    #[error("body {0:?} is not registered with this world")]
    UnknownBody(BodyId),
    /// Shape matching and generators need a minimum number of particles.
    #[error("need at least {required} particles, got {actual}")]
    InsufficientParticles { required: usize, actual: usize },
}
