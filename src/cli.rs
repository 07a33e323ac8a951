use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::{ENV_SITES_DIR, ENV_STATE_DIR, ENV_WEB_ROOT};
use crate::state::AppKind;

#[derive(Parser)]
#[command(name = "franken")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision FrankenPHP sites, databases, users and WordPress installs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding state.json
    #[arg(long, global = true, env = ENV_STATE_DIR, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Parent directory of site web roots
    #[arg(long, global = true, env = ENV_WEB_ROOT, value_name = "DIR")]
    pub web_root: Option<PathBuf>,

    /// Directory of per-site web server config files
    #[arg(long, global = true, env = ENV_SITES_DIR, value_name = "DIR")]
    pub sites_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage sites
    #[command(subcommand)]
    Site(SiteCommand),

    /// Manage databases
    #[command(subcommand)]
    Db(DbCommand),

    /// Manage WordPress installs
    #[command(subcommand)]
    Wordpress(WordpressCommand),

    /// Manage Linux users
    #[command(subcommand)]
    User(UserCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Execution mode flags shared by mutating commands
#[derive(Args, Debug, Clone, Copy)]
pub struct ModeArgs {
    /// Show the steps and rendered config without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

// ============================================================================
// Site Commands
// ============================================================================

#[derive(Subcommand)]
pub enum SiteCommand {
    /// Add a site: web root, config, reload, optional owner and WordPress
    Add {
        /// Primary domain, then optional aliases (e.g. example.com www.example.com)
        #[arg(required = true, num_args = 1..)]
        domains: Vec<String>,

        /// Additional domains (replaces positional aliases)
        #[arg(short, long, num_args = 1..)]
        aliases: Option<Vec<String>>,

        /// Application to install
        #[arg(short = 'A', long, value_enum, default_value_t = AppArg::Plain)]
        app: AppArg,

        /// PHP version label (default from FRANKENPHP_PHP_VERSION)
        #[arg(short, long)]
        php: Option<String>,

        /// Create a Linux user owning the web root
        #[arg(short, long)]
        user: bool,

        /// Replace an existing site or config file
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Take a site offline and forget it
    Delete {
        /// Primary domain
        domain: String,

        /// Also remove the web root and drop the WordPress database
        #[arg(long)]
        purge: bool,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// List managed sites
    List,

    /// Show details for a site
    Info {
        /// Primary domain
        domain: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AppArg {
    Plain,
    Wordpress,
}

impl From<AppArg> for AppKind {
    fn from(app: AppArg) -> Self {
        match app {
            AppArg::Plain => AppKind::Plain,
            AppArg::Wordpress => AppKind::Wordpress,
        }
    }
}

// ============================================================================
// Database Commands
// ============================================================================

#[derive(Subcommand)]
pub enum DbCommand {
    /// Create a database and a user with a generated password
    Create {
        /// Database name
        name: String,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Drop a database and its user
    Delete {
        /// Database name
        name: String,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// List managed databases
    List,
}

// ============================================================================
// WordPress Commands
// ============================================================================

#[derive(Subcommand)]
pub enum WordpressCommand {
    /// Create a database and wp-config.php for an existing site
    Install {
        /// Site primary domain
        domain: String,

        /// Replace an existing wp-config.php
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        mode: ModeArgs,
    },
}

// ============================================================================
// User Commands
// ============================================================================

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a Linux user
    Create {
        /// Login name
        username: String,

        /// Home directory (default /home/<username>)
        #[arg(long, value_name = "DIR")]
        home: Option<PathBuf>,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Delete a Linux user
    Delete {
        /// Login name
        username: String,

        /// Also remove the home directory (cannot be undone)
        #[arg(long)]
        remove_home: bool,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// List managed users
    List,
}
