//! Step observer trait for monitoring physics simulation progress.

/// Trait for observing physics simulation steps.
///
/// Hooks into the fixed-step loop of bodies and worlds. All methods have
/// default no-op implementations.
pub trait StepObserver {
    /// Called after all particles have been integrated (Verlet step).
    fn on_integrate(&mut self) {}

    /// Called once the broad phase has produced this sub-step's contact pairs.
    fn on_broad_phase(&mut self, _candidate_pairs: usize) {}

    /// Called after each constraint iteration.
    fn on_constraint_iteration(&mut self, _iteration: usize) {}

    /// Called when a simulation step is fully complete.
    fn on_step_complete(&mut self) {}
}

/// Observer for callers that don't need step events.
pub struct NoOpStepObserver;

impl StepObserver for NoOpStepObserver {}

/// Forwards step events to the `log` facade at trace level.
#[derive(Debug, Default)]
pub struct LogStepObserver {
    steps: u64,
}

impl LogStepObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl StepObserver for LogStepObserver {
    fn on_integrate(&mut self) {
        log::trace!("step {}: integrated", self.steps);
    }

    fn on_broad_phase(&mut self, candidate_pairs: usize) {
        log::trace!("step {}: {} contact pairs", self.steps, candidate_pairs);
    }

    fn on_constraint_iteration(&mut self, iteration: usize) {
        log::trace!("step {}: iteration {}", self.steps, iteration);
    }

    fn on_step_complete(&mut self) {
        log::trace!("step {} complete", self.steps);
        self.steps += 1;
    }
}
