use anyhow::Result;
use colored::Colorize;

use super::{confirmed, execute, load_state, print_credentials};
use crate::Context;
use crate::cli::ModeArgs;
use crate::engine::{Operation, Options};
use crate::ui;

/// Create a database and its user
pub fn create(ctx: &Context, name: &str, mode: ModeArgs) -> Result<()> {
    let operation = Operation::CreateDatabase {
        name: name.to_string(),
    };
    let options = Options {
        dry_run: mode.dry_run,
        force: false,
    };

    let Some(report) = execute(ctx, &operation, options)? else {
        return Ok(());
    };

    println!();
    ui::success(&format!("Database {name} created"));
    if let Some(credentials) = &report.credentials {
        print_credentials(credentials);
    }
    Ok(())
}

/// Drop a database and its user
pub fn delete(ctx: &Context, name: &str, yes: bool, mode: ModeArgs) -> Result<()> {
    let prompt = format!("Drop database {name} and all of its data?");
    if !confirmed(&prompt, yes, mode.dry_run)? {
        return Ok(());
    }

    let operation = Operation::DeleteDatabase {
        name: name.to_string(),
    };
    let options = Options {
        dry_run: mode.dry_run,
        force: false,
    };

    if execute(ctx, &operation, options)?.is_some() {
        println!();
        ui::success(&format!("Database {name} dropped"));
    }
    Ok(())
}

/// List managed databases
pub fn list(ctx: &Context) -> Result<()> {
    let state = load_state(ctx)?;

    if state.databases.is_empty() {
        ui::info("No databases managed yet");
        return Ok(());
    }

    ui::header(&format!("Databases ({})", state.databases.len()));
    for database in state.databases.values() {
        let used_by: Vec<&str> = state
            .sites_using_database(&database.name)
            .iter()
            .map(|site| site.primary_domain.as_str())
            .collect();

        print!(
            "  {} {}",
            database.name.bold(),
            format!("{}@{}", database.user, database.host).dimmed()
        );
        if used_by.is_empty() {
            println!();
        } else {
            println!(" {}", format!("(used by {})", used_by.join(", ")).cyan());
        }
    }
    Ok(())
}
