//! Execution plans - the ordered step list for one operation

use crate::step::Step;
use crate::types::PreviewLine;
use std::fmt;

/// An ordered list of steps
#[derive(Debug)]
pub struct Plan<A> {
    steps: Vec<Step<A>>,
}

impl<A> Default for Plan<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Plan<A> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step
    pub fn push(&mut self, step: Step<A>) {
        self.steps.push(step);
    }

    /// Append every step of another plan, keeping its order
    ///
    /// Used to chain one operation's steps into another (e.g. a site that
    /// installs an application as part of being added).
    pub fn extend(&mut self, other: Plan<A>) {
        self.steps.extend(other.steps);
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the steps in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Step<A>> {
        self.steps.iter()
    }

    /// Step descriptions in execution order
    pub fn descriptions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.description.as_str()).collect()
    }
}

impl<A: fmt::Display> Plan<A> {
    /// Describe what executing the plan would do, without doing it
    pub fn preview(&self) -> Vec<PreviewLine> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| PreviewLine {
                index,
                description: step.description.clone(),
                action: step.forward.to_string(),
                compensation: step.compensate.as_ref().map(ToString::to_string),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Say(&'static str);

    impl fmt::Display for Say {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "say {}", self.0)
        }
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut first = Plan::new();
        first.push(Step::new("one", Say("1")));
        let mut second = Plan::new();
        second.push(Step::new("two", Say("2")));
        second.push(Step::new("three", Say("3")));

        first.extend(second);

        assert_eq!(first.descriptions(), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_preview_lists_compensations() {
        let mut plan = Plan::new();
        plan.push(Step::new("write", Say("write")).with_compensation(Say("remove")));
        plan.push(Step::new("reload", Say("reload")));

        let preview = plan.preview();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].compensation.as_deref(), Some("say remove"));
        assert_eq!(preview[1].compensation, None);
        assert_eq!(
            preview[0].to_string(),
            "1. write (say write) [undo: say remove]"
        );
    }

    #[test]
    fn test_preview_is_repeatable() {
        let mut plan = Plan::new();
        plan.push(Step::new("write", Say("write")));
        assert_eq!(plan.preview(), plan.preview());
    }
}
