//! Configuration types for the physics solver.

use crate::error::PhysicsError;
use crate::float::Float;
use crate::particle::DEFAULT_RADIUS;
use crate::vec::Vec3;

/// How constraint and collision corrections reach particle positions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CorrectionMode {
    /// Accumulate per particle, then apply the mean once per pass.
    #[default]
    Averaged,
    /// Write each correction into the position as soon as it is computed.
    /// Cheaper, but the result depends on constraint order.
    Immediate,
}

/// A horizontal ground plane at `height` with a +Y normal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GroundPlane<F: Float> {
    pub height: F,
    /// Fraction of the normal velocity kept (reflected) on impact, [0, 1].
    pub restitution: F,
    /// Fraction of the tangential velocity removed on impact, [0, 1].
    pub friction: F,
}

impl<F: Float> GroundPlane<F> {
    pub fn new(height: F) -> Self {
        GroundPlane {
            height,
            restitution: F::from_f32(0.5),
            friction: F::zero(),
        }
    }

    pub fn with_restitution(mut self, restitution: F) -> Self {
        self.restitution = restitution.clamp01();
        self
    }

    pub fn with_friction(mut self, friction: F) -> Self {
        self.friction = friction.clamp01();
        self
    }
}

/// Configuration for the constraint solver and simulation.
///
/// # Builder Pattern
/// ```
/// use squishy::config::{GroundPlane, SolverConfig};
/// use squishy::vec::Vec3;
///
/// let config: SolverConfig<f32> = SolverConfig::new()
///     .with_iterations(8)
///     .with_gravity(Vec3::new(0.0, -9.81, 0.0))
///     .with_damping(0.99)
///     .with_sub_steps(2)
///     .with_ground(GroundPlane::new(0.0).with_friction(0.2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig<F: Float> {
    /// Length of one fixed step in seconds. Default: 0.02.
    pub time_step: F,
    /// Number of constraint solver iterations per sub-step.
    /// More iterations = more accurate but slower. Default: 10.
    pub iterations: usize,
    /// Gravity acceleration vector. Default: (0, -9.81, 0).
    pub gravity: Vec3<F>,
    /// Velocity damping factor (0, 1]. 1.0 = no damping. Default: 0.98.
    pub damping: F,
    /// Number of sub-steps per fixed step. Higher = more stable. Default: 1.
    pub sub_steps: usize,
    /// Optional ground plane. Default: none.
    pub ground: Option<GroundPlane<F>>,
    /// Default: [`CorrectionMode::Averaged`].
    pub correction_mode: CorrectionMode,
}

impl<F: Float> SolverConfig<F> {
    /// Create a new config with default values.
    pub fn new() -> Self {
        SolverConfig {
            time_step: F::from_f32(0.02),
            iterations: 10,
            gravity: Vec3::new(F::zero(), F::from_f32(-9.81), F::zero()),
            damping: F::from_f32(0.98),
            sub_steps: 1,
            ground: None,
            correction_mode: CorrectionMode::Averaged,
        }
    }

    /// Set the fixed time step.
    pub fn with_time_step(mut self, time_step: F) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the number of constraint iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the gravity vector.
    pub fn with_gravity(mut self, gravity: Vec3<F>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the damping factor.
    pub fn with_damping(mut self, damping: F) -> Self {
        self.damping = damping;
        self
    }

    /// Set the number of sub-steps.
    pub fn with_sub_steps(mut self, sub_steps: usize) -> Self {
        self.sub_steps = sub_steps.max(1);
        self
    }

    pub fn with_ground(mut self, ground: GroundPlane<F>) -> Self {
        self.ground = Some(ground);
        self
    }

    pub fn without_ground(mut self) -> Self {
        self.ground = None;
        self
    }

    pub fn with_correction_mode(mut self, mode: CorrectionMode) -> Self {
        self.correction_mode = mode;
        self
    }

    /// Duration of one sub-step.
    pub fn sub_dt(&self) -> F {
        self.time_step / F::from_usize(self.sub_steps.max(1))
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.time_step.is_finite() && self.time_step > F::zero()) {
            return Err(PhysicsError::InvalidTimeStep);
        }
        if !(self.damping.is_finite() && self.damping > F::zero() && self.damping <= F::one()) {
            return Err(PhysicsError::InvalidDamping);
        }
        if let Some(ground) = &self.ground {
            let unit = |v: F| v >= F::zero() && v <= F::one();
            if !unit(ground.restitution) || !unit(ground.friction) {
                return Err(PhysicsError::InvalidStiffness);
            }
        }
        Ok(())
    }
}

impl<F: Float> Default for SolverConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Broad- and narrow-phase settings for cross-body collisions.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionConfig<F: Float> {
    pub enabled: bool,
    /// Spatial hash cell edge. Should be at least twice the largest particle
    /// radius; smaller cells still work but sweep more cells per query.
    /// Default: 2.1 × the default particle radius.
    pub cell_size: F,
    /// Extra distance beyond touching at which a pair is still tracked for
    /// the step, so contacts formed during the iterations get resolved.
    pub contact_margin: F,
    /// Fraction of the overlap removed per iteration, [0, 1]. Default: 1.
    pub stiffness: F,
    /// Fraction of the approach velocity removed from touching pairs once
    /// per step, [0, 1]. Default: 0.
    pub damping: F,
}

impl<F: Float> CollisionConfig<F> {
    pub fn new() -> Self {
        CollisionConfig {
            enabled: true,
            cell_size: F::from_f32(2.1 * DEFAULT_RADIUS),
            contact_margin: F::zero(),
            stiffness: F::one(),
            damping: F::zero(),
        }
    }

    pub fn disabled() -> Self {
        CollisionConfig { enabled: false, ..Self::new() }
    }

    pub fn with_cell_size(mut self, cell_size: F) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_contact_margin(mut self, margin: F) -> Self {
        self.contact_margin = margin.max(F::zero());
        self
    }

    pub fn with_stiffness(mut self, stiffness: F) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: F) -> Self {
        self.damping = damping;
        self
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.cell_size.is_finite() && self.cell_size > F::zero()) {
            return Err(PhysicsError::InvalidCellSize);
        }
        let unit = |v: F| v >= F::zero() && v <= F::one();
        if !unit(self.stiffness) || !unit(self.damping) {
            return Err(PhysicsError::InvalidStiffness);
        }
        Ok(())
    }
}

impl<F: Float> Default for CollisionConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of a [`SimulationWorld`](crate::world::SimulationWorld).
///
/// The world's solver settings drive the step loop (time step, iterations,
/// sub-steps, correction mode). Gravity, damping and ground are read from
/// each body's own config so bodies can differ.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig<F: Float> {
    pub solver: SolverConfig<F>,
    pub collision: CollisionConfig<F>,
    /// Upper bound on fixed steps run by one `advance` call. Default: 8.
    pub max_steps_per_advance: usize,
}

impl<F: Float> WorldConfig<F> {
    pub fn new() -> Self {
        WorldConfig {
            solver: SolverConfig::new(),
            collision: CollisionConfig::new(),
            max_steps_per_advance: 8,
        }
    }

    pub fn with_solver(mut self, solver: SolverConfig<F>) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_collision(mut self, collision: CollisionConfig<F>) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_max_steps_per_advance(mut self, steps: usize) -> Self {
        self.max_steps_per_advance = steps.max(1);
        self
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        self.solver.validate()?;
        self.collision.validate()
    }
}

impl<F: Float> Default for WorldConfig<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_steps_never_zero() {
        let config: SolverConfig<f32> = SolverConfig::new().with_sub_steps(0);
        assert_eq!(config.sub_steps, 1);
        assert!((config.sub_dt() - 0.02).abs() < 1e-7);
    }

    #[test]
    fn rejects_bad_time_step_and_damping() {
        let bad_dt: SolverConfig<f32> = SolverConfig::new().with_time_step(0.0);
        assert_eq!(bad_dt.validate(), Err(PhysicsError::InvalidTimeStep));
        let bad_damping: SolverConfig<f32> = SolverConfig::new().with_damping(1.5);
        assert_eq!(bad_damping.validate(), Err(PhysicsError::InvalidDamping));
    }

    #[test]
    fn rejects_zero_cell_size() {
        let config: WorldConfig<f64> =
            WorldConfig::new().with_collision(CollisionConfig::new().with_cell_size(0.0));
        assert_eq!(config.validate(), Err(PhysicsError::InvalidCellSize));
    }
}
