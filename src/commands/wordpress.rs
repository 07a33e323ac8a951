use anyhow::Result;

use super::{execute, print_credentials};
use crate::Context;
use crate::cli::ModeArgs;
use crate::engine::{Operation, Options};
use crate::ui;

/// Provision a database, WordPress core and wp-config.php for an existing site
pub fn install(ctx: &Context, domain: &str, force: bool, mode: ModeArgs) -> Result<()> {
    let operation = Operation::InstallWordPress {
        domain: domain.to_string(),
    };
    let options = Options {
        dry_run: mode.dry_run,
        force,
    };

    let Some(report) = execute(ctx, &operation, options)? else {
        return Ok(());
    };

    println!();
    ui::success(&format!("WordPress configured for {domain}"));
    if let Some(credentials) = &report.credentials {
        print_credentials(credentials);
    }
    ui::dim("Open the site in a browser to finish the WordPress setup");
    Ok(())
}
