//! Execution engine - applies steps in order, compensates in reverse on failure

use crate::context::ProgressCallback;
use crate::plan::Plan;
use crate::step::{Action, Step};
use crate::types::{Applied, CompensationFailure, Failure, StepResult};

/// Execute a plan against a context
///
/// Steps run strictly in order. After each successful forward action the
/// step is remembered as applied. If a forward action fails, the
/// compensating action of every applied step runs in reverse order; a
/// failing compensation is recorded and the remaining compensations still
/// run. The original error is returned inside the [`Failure`].
///
/// # Type Parameters
/// * `A` - Action type
/// * `C` - Context the actions run against
/// * `P` - Progress callback type
///
/// # Returns
/// The applied step descriptions, or the failure with its rollback record
pub fn execute<A, C, P>(
    plan: &Plan<A>,
    ctx: &mut C,
    progress: &mut P,
) -> Result<Applied, Failure<A::Error>>
where
    A: Action<C>,
    P: ProgressCallback,
{
    progress.on_plan_start(plan.len());

    let mut applied = Vec::with_capacity(plan.len());

    for (index, step) in plan.iter().enumerate() {
        progress.on_step_start(index, &step.description);

        match step.forward.apply(ctx) {
            Ok(()) => {
                progress.on_step_complete(index, &StepResult::Applied);
                applied.push((index, step));
            }
            Err(error) => {
                progress.on_step_complete(
                    index,
                    &StepResult::Failed {
                        error: error.to_string(),
                    },
                );

                let mut failure = Failure {
                    index,
                    step: step.description.clone(),
                    error,
                    compensated: Vec::new(),
                    compensation_failures: Vec::new(),
                    irreversible: Vec::new(),
                };
                compensate(&applied, ctx, progress, &mut failure);
                return Err(failure);
            }
        }
    }

    Ok(Applied {
        steps: applied
            .into_iter()
            .map(|(_, step)| step.description.clone())
            .collect(),
    })
}

/// Run compensations for applied steps, newest first
fn compensate<A, C, P>(
    applied: &[(usize, &Step<A>)],
    ctx: &mut C,
    progress: &mut P,
    failure: &mut Failure<A::Error>,
) where
    A: Action<C>,
    P: ProgressCallback,
{
    for (index, step) in applied.iter().rev() {
        if !step.is_reversible() {
            failure.irreversible.push(step.description.clone());
            continue;
        }
        // Check steps have nothing to undo
        let Some(undo) = step.compensate.as_ref().filter(|_| !step.read_only) else {
            continue;
        };

        match undo.apply(ctx) {
            Ok(()) => {
                progress.on_compensate(*index, &step.description, &StepResult::Applied);
                failure.compensated.push(step.description.clone());
            }
            Err(error) => {
                progress.on_compensate(
                    *index,
                    &step.description,
                    &StepResult::Failed {
                        error: error.to_string(),
                    },
                );
                failure.compensation_failures.push(CompensationFailure {
                    step: step.description.clone(),
                    error,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use std::fmt;

    /// Records every effect; fails forward actions whose tag is listed
    #[derive(Default)]
    struct Journal {
        effects: Vec<String>,
        fail: Vec<&'static str>,
    }

    #[derive(Debug)]
    enum TestAction {
        Do(&'static str),
        Undo(&'static str),
    }

    impl fmt::Display for TestAction {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Do(tag) => write!(f, "do {tag}"),
                Self::Undo(tag) => write!(f, "undo {tag}"),
            }
        }
    }

    impl Action<Journal> for TestAction {
        type Error = String;

        fn apply(&self, ctx: &mut Journal) -> Result<(), String> {
            let effect = self.to_string();
            let failing = match self {
                Self::Do(tag) => ctx.fail.iter().any(|f| f == tag),
                Self::Undo(_) => ctx.fail.iter().any(|f| *f == effect),
            };
            if failing {
                return Err(format!("{effect} exploded"));
            }
            ctx.effects.push(effect);
            Ok(())
        }
    }

    fn plan(tags: &[&'static str]) -> Plan<TestAction> {
        let mut plan = Plan::new();
        for tag in tags {
            plan.push(
                Step::new(*tag, TestAction::Do(tag)).with_compensation(TestAction::Undo(tag)),
            );
        }
        plan
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressCallback for Recorder {
        fn on_plan_start(&mut self, total: usize) {
            self.events.push(format!("start {total}"));
        }
        fn on_step_start(&mut self, index: usize, _description: &str) {
            self.events.push(format!("step {index}"));
        }
        fn on_step_complete(&mut self, index: usize, result: &StepResult) {
            self.events.push(format!("done {index} {}", result.is_success()));
        }
        fn on_compensate(&mut self, index: usize, _description: &str, result: &StepResult) {
            self.events.push(format!("undo {index} {}", result.is_success()));
        }
    }

    #[test]
    fn test_execute_empty_plan() {
        let plan: Plan<TestAction> = Plan::new();
        let mut journal = Journal::default();
        let applied = execute(&plan, &mut journal, &mut NoProgress).unwrap();
        assert!(applied.is_empty());
        assert!(journal.effects.is_empty());
    }

    #[test]
    fn test_execute_applies_in_order() {
        let mut journal = Journal::default();
        let applied = execute(&plan(&["a", "b", "c"]), &mut journal, &mut NoProgress).unwrap();

        assert_eq!(applied.steps, vec!["a", "b", "c"]);
        assert_eq!(journal.effects, vec!["do a", "do b", "do c"]);
    }

    #[test]
    fn test_failure_compensates_in_reverse() {
        let mut journal = Journal {
            fail: vec!["c"],
            ..Default::default()
        };
        let failure = execute(&plan(&["a", "b", "c", "d"]), &mut journal, &mut NoProgress)
            .unwrap_err();

        assert_eq!(failure.index, 2);
        assert_eq!(failure.step, "c");
        assert_eq!(failure.error, "do c exploded");
        assert_eq!(failure.compensated, vec!["b", "a"]);
        assert!(failure.is_rollback_complete());
        assert_eq!(journal.effects, vec!["do a", "do b", "undo b", "undo a"]);
    }

    #[test]
    fn test_failure_at_every_position_leaves_nothing_applied() {
        let tags = ["a", "b", "c", "d"];
        for k in 0..tags.len() {
            let mut journal = Journal {
                fail: vec![tags[k]],
                ..Default::default()
            };
            let failure = execute(&plan(&tags), &mut journal, &mut NoProgress).unwrap_err();
            assert_eq!(failure.index, k);
            assert_eq!(failure.nothing_applied(), k == 0);

            let done = journal.effects.iter().filter(|e| e.starts_with("do")).count();
            let undone = journal.effects.iter().filter(|e| e.starts_with("undo")).count();
            assert_eq!(done, k);
            assert_eq!(undone, k);
        }
    }

    #[test]
    fn test_compensation_failure_is_recorded_and_rest_continue() {
        let mut journal = Journal {
            fail: vec!["c", "undo b"],
            ..Default::default()
        };
        let failure = execute(&plan(&["a", "b", "c"]), &mut journal, &mut NoProgress)
            .unwrap_err();

        assert!(!failure.is_rollback_complete());
        assert_eq!(failure.compensation_failures.len(), 1);
        assert_eq!(failure.compensation_failures[0].step, "b");
        assert_eq!(failure.compensated, vec!["a"]);
        // The original error survives the failed compensation
        assert_eq!(failure.error, "do c exploded");
    }

    #[test]
    fn test_forward_only_steps_are_reported_irreversible() {
        let mut plan = Plan::new();
        plan.push(Step::new("remove", TestAction::Do("remove")));
        plan.push(Step::new("reload", TestAction::Do("reload")));

        let mut journal = Journal {
            fail: vec!["reload"],
            ..Default::default()
        };
        let failure = execute(&plan, &mut journal, &mut NoProgress).unwrap_err();

        assert_eq!(failure.irreversible, vec!["remove"]);
        assert!(failure.compensated.is_empty());
        assert!(!failure.is_rollback_complete());
    }

    #[test]
    fn test_check_steps_are_not_compensated() {
        let mut plan = Plan::new();
        plan.push(Step::check("probe", TestAction::Do("probe")));
        plan.push(
            Step::new("create", TestAction::Do("create"))
                .with_compensation(TestAction::Undo("create")),
        );
        plan.push(Step::new("grant", TestAction::Do("grant")));

        let mut journal = Journal {
            fail: vec!["grant"],
            ..Default::default()
        };
        let failure = execute(&plan, &mut journal, &mut NoProgress).unwrap_err();

        assert!(failure.irreversible.is_empty());
        assert_eq!(failure.compensated, vec!["create"]);
        assert_eq!(journal.effects, vec!["do probe", "do create", "undo create"]);
    }

    #[test]
    fn test_progress_events() {
        let mut journal = Journal {
            fail: vec!["b"],
            ..Default::default()
        };
        let mut recorder = Recorder::default();
        let _ = execute(&plan(&["a", "b"]), &mut journal, &mut recorder);

        assert_eq!(
            recorder.events,
            vec!["start 2", "step 0", "done 0 true", "step 1", "done 1 false", "undo 0 true"]
        );
    }
}
