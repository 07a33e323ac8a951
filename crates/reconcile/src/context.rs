//! Progress reporting
//!
//! This trait allows the reconcile crate to be used without
//! depending on a specific terminal UI.

use crate::types::StepResult;

/// Progress callback for plan execution
///
/// Implement this trait to receive progress updates during execution.
/// Indices are zero-based positions in the plan.
pub trait ProgressCallback {
    /// Called once before the first step is applied
    fn on_plan_start(&mut self, total: usize);

    /// Called when starting to apply a step
    fn on_step_start(&mut self, index: usize, description: &str);

    /// Called when a step's forward action completes (successfully or not)
    fn on_step_complete(&mut self, index: usize, result: &StepResult);

    /// Called after a compensating action ran for an applied step
    fn on_compensate(&mut self, index: usize, description: &str, result: &StepResult);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _total: usize) {}
    fn on_step_start(&mut self, _index: usize, _description: &str) {}
    fn on_step_complete(&mut self, _index: usize, _result: &StepResult) {}
    fn on_compensate(&mut self, _index: usize, _description: &str, _result: &StepResult) {}
}
