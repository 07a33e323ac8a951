//! Terminal progress for running plans
//!
//! One spinner per step while it runs, replaced by a permanent status line
//! when it finishes so the record survives in scrollback and in logs piped
//! from non-terminal output.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ProgressCallback, StepResult};
use std::time::Duration;

/// Shows each step of a plan as it runs
#[derive(Default)]
pub struct StepSpinner {
    total: usize,
    current: Option<(ProgressBar, String)>,
}

impl StepSpinner {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, index: usize) -> String {
        format!("[{}/{}]", index + 1, self.total)
    }
}

impl ProgressCallback for StepSpinner {
    fn on_plan_start(&mut self, total: usize) {
        self.total = total;
    }

    fn on_step_start(&mut self, index: usize, description: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix:.blue.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_prefix(self.counter(index));
        spinner.set_message(description.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.current = Some((spinner, description.to_string()));
    }

    fn on_step_complete(&mut self, index: usize, result: &StepResult) {
        let Some((spinner, description)) = self.current.take() else {
            return;
        };
        spinner.finish_and_clear();

        let counter = self.counter(index).blue().bold();
        match result {
            StepResult::Applied => println!("{} {counter} {description}", "✓".green()),
            StepResult::Failed { error } => {
                println!("{} {counter} {description}", "✗".red());
                println!("      {}", error.red());
            }
        }
    }

    fn on_compensate(&mut self, _index: usize, description: &str, result: &StepResult) {
        match result {
            StepResult::Applied => {
                println!("  {} undid: {}", "↺".yellow(), description.dimmed());
            }
            StepResult::Failed { error } => {
                println!("  {} could not undo: {description}", "✗".red().bold());
                println!("      {}", error.red());
            }
        }
    }
}
