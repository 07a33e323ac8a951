//! Core types for plan execution

use std::fmt;

/// Result of running one action, as reported to progress callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// The action completed
    Applied,
    /// The action failed
    Failed { error: String },
}

impl StepResult {
    /// Check if the result represents success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// One line of a dry-run preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewLine {
    /// Zero-based position in the plan
    pub index: usize,
    /// Step description
    pub description: String,
    /// What the forward action would do
    pub action: String,
    /// What would undo it, if anything
    pub compensation: Option<String>,
}

impl fmt::Display for PreviewLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} ({})", self.index + 1, self.description, self.action)?;
        if let Some(undo) = &self.compensation {
            write!(f, " [undo: {undo}]")?;
        }
        Ok(())
    }
}

/// Summary of a fully applied plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Descriptions of the applied steps, in order
    pub steps: Vec<String>,
}

impl Applied {
    /// Number of applied steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan was empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A compensating action that itself failed
#[derive(Debug)]
pub struct CompensationFailure<E> {
    /// Description of the step whose compensation failed
    pub step: String,
    /// The compensation's error
    pub error: E,
}

/// A plan that stopped at a failing step
///
/// By the time a `Failure` is returned, every applied step with a
/// compensating action has had that action run (in reverse order).
#[derive(Debug)]
pub struct Failure<E> {
    /// Zero-based index of the step that failed
    pub index: usize,
    /// Description of the step that failed
    pub step: String,
    /// The forward action's error
    pub error: E,
    /// Applied steps whose compensation succeeded, in the order they ran
    pub compensated: Vec<String>,
    /// Applied steps whose compensation failed
    pub compensation_failures: Vec<CompensationFailure<E>>,
    /// Applied steps that have no compensation and were left in place
    pub irreversible: Vec<String>,
}

impl<E> Failure<E> {
    /// No step was applied before the failing one
    pub fn nothing_applied(&self) -> bool {
        self.index == 0
    }

    /// Every applied step was undone: no compensation failed and no
    /// forward-only step was left in place
    pub fn is_rollback_complete(&self) -> bool {
        self.compensation_failures.is_empty() && self.irreversible.is_empty()
    }

    /// Map the error type, keeping the rollback bookkeeping
    pub fn map_err<F, T>(self, mut f: F) -> Failure<T>
    where
        F: FnMut(E) -> T,
    {
        Failure {
            index: self.index,
            step: self.step,
            error: f(self.error),
            compensated: self.compensated,
            compensation_failures: self
                .compensation_failures
                .into_iter()
                .map(|c| CompensationFailure {
                    step: c.step,
                    error: f(c.error),
                })
                .collect(),
            irreversible: self.irreversible,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} '{}' failed: {}", self.index + 1, self.step, self.error)
    }
}
