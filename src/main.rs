mod cli;
mod commands;
mod config;
mod download;
mod engine;
mod error;
mod progress;
mod render;
mod runner;
mod secret;
mod state;
mod ui;
mod validate;

use anyhow::{Context as AnyhowContext, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, DbCommand, SiteCommand, UserCommand, WordpressCommand};
use colored::Colorize;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use config::Settings;
use error::{Error, Rollback};

/// Global context for the application
pub struct Context {
    pub settings: Settings,
    pub quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        std::process::exit(report_error(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "franken", &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::from_env()?.with_overrides(
        cli.state_dir.as_deref(),
        cli.web_root.as_deref(),
        cli.sites_dir.as_deref(),
    );
    init_logging(cli.verbose, cli.quiet, settings.log_file.as_deref())?;
    log::debug!("Settings: {settings:?}");

    let ctx = Context {
        settings,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Site(cmd) => match cmd {
            SiteCommand::Add {
                domains,
                aliases,
                app,
                php,
                user,
                force,
                mode,
            } => commands::site::add(
                &ctx,
                commands::site::AddArgs {
                    domains,
                    aliases,
                    app,
                    php,
                    user,
                    force,
                    mode,
                },
            ),
            SiteCommand::Delete {
                domain,
                purge,
                yes,
                mode,
            } => commands::site::delete(&ctx, &domain, purge, yes, mode),
            SiteCommand::List => commands::site::list(&ctx),
            SiteCommand::Info { domain } => commands::site::info(&ctx, &domain),
        },
        Command::Db(cmd) => match cmd {
            DbCommand::Create { name, mode } => commands::db::create(&ctx, &name, mode),
            DbCommand::Delete { name, yes, mode } => commands::db::delete(&ctx, &name, yes, mode),
            DbCommand::List => commands::db::list(&ctx),
        },
        Command::Wordpress(cmd) => match cmd {
            WordpressCommand::Install {
                domain,
                force,
                mode,
            } => commands::wordpress::install(&ctx, &domain, force, mode),
        },
        Command::User(cmd) => match cmd {
            UserCommand::Create {
                username,
                home,
                mode,
            } => commands::user::create(&ctx, &username, home, mode),
            UserCommand::Delete {
                username,
                remove_home,
                yes,
                mode,
            } => commands::user::delete(&ctx, &username, remove_home, yes, mode),
            UserCommand::List => commands::user::list(&ctx),
        },
        Command::Completions { .. } => Ok(()),
    }
}

/// Configure env_logger: stderr without timestamps, or an append-only log
/// file with timestamps when one is configured.
fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let log_level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            // The file is the audit trail: always at least info.
            builder
                .filter_level(log_level.max(log::LevelFilter::Info))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .format_timestamp_secs();
        }
        None => {
            builder
                .filter_level(if quiet {
                    log::LevelFilter::Error
                } else {
                    log_level
                })
                .format_timestamp(None);
        }
    }

    builder.init();
    Ok(())
}

/// Print a failure and return the process exit code for it
fn report_error(err: &anyhow::Error) -> i32 {
    let Some(err) = err.downcast_ref::<Error>() else {
        ui::error(&format!("{err:#}"));
        return 1;
    };

    ui::error(&format!("{}: {err}", err.category().description()));

    if let Error::Step {
        compensated,
        compensation_failures,
        irreversible,
        ..
    } = err
    {
        if !compensated.is_empty() {
            eprintln!("  Rolled back:");
            for step in compensated {
                eprintln!("    {} {step}", "↺".yellow());
            }
        }
        if !irreversible.is_empty() {
            eprintln!("  Left in place (cannot be undone):");
            for step in irreversible {
                eprintln!("    {} {step}", "•".yellow());
            }
        }
        if !compensation_failures.is_empty() {
            eprintln!("  Rollback failed for:");
            for (step, reason) in compensation_failures {
                eprintln!("    {} {step}: {reason}", "✗".red());
            }
        }
    }

    if err.rollback() == Rollback::Incomplete {
        let rule = "═".repeat(64);
        eprintln!();
        eprintln!("{}", rule.red().bold());
        eprintln!(
            "{}",
            "ROLLBACK INCOMPLETE: the host no longer matches the state file"
                .red()
                .bold()
        );
        eprintln!("Clean up the steps listed above by hand before retrying.");
        eprintln!("{}", rule.red().bold());
    }

    err.exit_code()
}
