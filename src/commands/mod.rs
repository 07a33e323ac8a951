//! Command handlers
//!
//! Each handler turns parsed arguments into an [`Operation`], runs it
//! through the engine and renders the outcome.

pub mod db;
pub mod site;
pub mod user;
pub mod wordpress;

use anyhow::Result;
use colored::Colorize;
use reconcile::NoProgress;
use secrecy::ExposeSecret;

use crate::Context;
use crate::download::HttpFetcher;
use crate::engine::{Engine, Operation, Options, Outcome, Preview, Report};
use crate::progress::StepSpinner;
use crate::runner::ProcessExecutor;
use crate::secret::DatabaseCredentials;
use crate::state::{StateDocument, StateStore};
use crate::ui;

/// Run one operation and render a dry-run preview if that's what it was.
///
/// Returns the report of an applied operation, `None` for a dry run.
pub fn execute(ctx: &Context, operation: &Operation, options: Options) -> Result<Option<Report>> {
    let executor = ProcessExecutor;
    let engine = Engine::new(&ctx.settings, &executor, &HttpFetcher)?;

    if !ctx.quiet && !options.dry_run {
        ui::header(&operation.to_string());
    }

    let outcome = if ctx.quiet {
        engine.run(operation, options, &mut NoProgress)?
    } else {
        engine.run(operation, options, &mut StepSpinner::new())?
    };

    match outcome {
        Outcome::Preview(preview) => {
            print_preview(operation, &preview);
            Ok(None)
        }
        Outcome::Applied(report) => {
            log::debug!("{operation}: applied {}", report.steps.join(", "));
            Ok(Some(report))
        }
    }
}

/// Read the state document for list and info views
pub fn load_state(ctx: &Context) -> Result<StateDocument> {
    Ok(StateStore::new(ctx.settings.state_file()).read()?)
}

/// Ask before an irreversible operation unless `--yes` or `--dry-run` was given
pub fn confirmed(prompt: &str, yes: bool, dry_run: bool) -> Result<bool> {
    if yes || dry_run {
        return Ok(true);
    }
    if ui::confirm(prompt)? {
        Ok(true)
    } else {
        ui::info("Cancelled");
        Ok(false)
    }
}

fn print_preview(operation: &Operation, preview: &Preview) {
    ui::header(&format!("Dry run: {operation}"));

    if preview.steps.is_empty() {
        ui::dim("Nothing to do");
    }
    for line in &preview.steps {
        println!(
            "  {} {}",
            format!("{:>2}.", line.index + 1).blue().bold(),
            line.description
        );
        ui::dim(&format!("   {}", line.action));
        if let Some(undo) = &line.compensation {
            ui::dim(&format!("   undo: {undo}"));
        }
    }

    for document in &preview.documents {
        ui::section(&document.path.display().to_string());
        match (&document.text, &document.previous) {
            (None, _) => ui::dim("(contains secrets, not shown)"),
            (Some(text), Some(previous)) => ui::print_diff(previous, text),
            (Some(text), None) => {
                for line in text.lines() {
                    println!("    {}", line.green());
                }
            }
        }
    }

    println!();
    ui::info("Dry run: no changes made");
}

/// Show freshly generated credentials. This is the only time they are shown.
pub fn print_credentials(credentials: &DatabaseCredentials) {
    ui::section("Database credentials");
    ui::kv("Database", &credentials.database);
    ui::kv("User", &credentials.user);
    ui::kv("Host", &credentials.host);
    ui::kv("Password", credentials.password.expose_secret());
    println!();
    ui::warn("The password is not stored anywhere. Save it now.");
}
