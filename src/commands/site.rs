use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;

use super::{confirmed, execute, load_state, print_credentials};
use crate::Context;
use crate::cli::{AppArg, ModeArgs};
use crate::engine::{AddSite, Operation, Options};
use crate::error::Error;
use crate::state::SiteRecord;
use crate::ui;

pub struct AddArgs {
    pub domains: Vec<String>,
    pub aliases: Option<Vec<String>>,
    pub app: AppArg,
    pub php: Option<String>,
    pub user: bool,
    pub force: bool,
    pub mode: ModeArgs,
}

/// Add (or with --force, replace) a site
pub fn add(ctx: &Context, args: AddArgs) -> Result<()> {
    let (primary, rest) = args
        .domains
        .split_first()
        .context("At least one domain is required")?;
    let aliases = args.aliases.unwrap_or_else(|| rest.to_vec());

    let operation = Operation::AddSite(AddSite {
        primary: primary.clone(),
        aliases,
        app: args.app.into(),
        php_version: args.php,
        create_user: args.user,
    });
    let options = Options {
        dry_run: args.mode.dry_run,
        force: args.force,
    };

    let Some(report) = execute(ctx, &operation, options)? else {
        return Ok(());
    };

    let primary = primary.to_ascii_lowercase();
    println!();
    ui::success(&format!("Site {primary} is configured"));
    if let Some(site) = load_state(ctx)?.site(&primary) {
        print_site(site);
    }
    if let Some(credentials) = &report.credentials {
        print_credentials(credentials);
        ui::dim("Open the site in a browser to finish the WordPress setup");
    }

    Ok(())
}

/// Take a site offline, optionally purging its files and database
pub fn delete(ctx: &Context, domain: &str, purge: bool, yes: bool, mode: ModeArgs) -> Result<()> {
    if purge {
        let prompt = format!("Permanently delete the web root and database of {domain}?");
        if !confirmed(&prompt, yes, mode.dry_run)? {
            return Ok(());
        }
    }

    let operation = Operation::DeleteSite {
        domain: domain.to_string(),
        purge,
    };
    let options = Options {
        dry_run: mode.dry_run,
        force: false,
    };

    if execute(ctx, &operation, options)?.is_some() {
        println!();
        ui::success(&format!("Site {domain} removed"));
        if !purge {
            ui::dim("Web root and database were kept; use --purge to remove them");
        }
    }
    Ok(())
}

/// List managed sites
pub fn list(ctx: &Context) -> Result<()> {
    let state = load_state(ctx)?;

    if state.sites.is_empty() {
        ui::info("No sites managed yet");
        ui::dim("Add one with: franken site add <domain>");
        return Ok(());
    }

    ui::header(&format!("Sites ({})", state.sites.len()));
    for site in state.sites.values() {
        let mut line = format!(
            "  {} {} {}",
            site.primary_domain.bold(),
            site.app.to_string().cyan(),
            format!("php {}", site.php_version).dimmed()
        );
        if !site.aliases.is_empty() {
            line.push_str(&format!(" {}", format!("+ {}", site.aliases.join(", ")).dimmed()));
        }
        println!("{line}");
    }

    Ok(())
}

/// Show one site
pub fn info(ctx: &Context, domain: &str) -> Result<()> {
    let domain = domain.to_ascii_lowercase();
    let state = load_state(ctx)?;
    let site = state
        .site(&domain)
        .ok_or_else(|| Error::not_found("site", &domain))?;

    ui::header(&site.primary_domain);
    print_site(site);
    Ok(())
}

fn print_site(site: &SiteRecord) {
    if !site.aliases.is_empty() {
        ui::kv("Aliases", &site.aliases.join(", "));
    }
    ui::kv("App", &site.app.to_string());
    ui::kv("PHP", &site.php_version);
    ui::kv("Web root", &site.web_root.display().to_string());
    ui::kv("Config", &site.config_path.display().to_string());
    if let Some(owner) = &site.owner {
        ui::kv("Owner", owner);
    }
    if let Some(database) = &site.database {
        ui::kv("Database", database);
    }
    ui::kv("Created", &ui::format_timestamp(&site.created_at));
}
