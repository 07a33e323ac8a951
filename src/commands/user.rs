use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use super::{confirmed, execute, load_state};
use crate::Context;
use crate::cli::ModeArgs;
use crate::engine::{Operation, Options};
use crate::ui;

/// Create a Linux user
pub fn create(ctx: &Context, username: &str, home: Option<PathBuf>, mode: ModeArgs) -> Result<()> {
    let operation = Operation::CreateUser {
        username: username.to_string(),
        home,
    };
    let options = Options {
        dry_run: mode.dry_run,
        force: false,
    };

    if execute(ctx, &operation, options)?.is_some() {
        println!();
        ui::success(&format!("User {username} created"));
        if let Some(user) = load_state(ctx)?.user(username) {
            ui::kv("Home", &user.home.display().to_string());
        }
    }
    Ok(())
}

/// Delete a Linux user
pub fn delete(
    ctx: &Context,
    username: &str,
    remove_home: bool,
    yes: bool,
    mode: ModeArgs,
) -> Result<()> {
    if remove_home {
        let prompt = format!("Delete {username} and everything in their home directory?");
        if !confirmed(&prompt, yes, mode.dry_run)? {
            return Ok(());
        }
    }

    let operation = Operation::DeleteUser {
        username: username.to_string(),
        remove_home,
    };
    let options = Options {
        dry_run: mode.dry_run,
        force: false,
    };

    if execute(ctx, &operation, options)?.is_some() {
        println!();
        ui::success(&format!("User {username} deleted"));
    }
    Ok(())
}

/// List managed users
pub fn list(ctx: &Context) -> Result<()> {
    let state = load_state(ctx)?;

    if state.users.is_empty() {
        ui::info("No users managed yet");
        return Ok(());
    }

    ui::header(&format!("Users ({})", state.users.len()));
    for user in state.users.values() {
        println!(
            "  {} {}",
            user.username.bold(),
            user.home.display().to_string().dimmed()
        );
    }
    Ok(())
}
