//! Reconciliation engine
//!
//! One logical operation at a time:
//! 1. Read the state snapshot
//! 2. Validate the request and build its step plan (no side effects)
//! 3. Preview (dry run) or execute the plan, compensating on failure
//! 4. Persist the updated state only after every step succeeded

mod action;
mod archive;
mod ops;


use chrono::Utc;
use reconcile::{Action, Plan, PreviewLine, ProgressCallback};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::Settings;
use crate::download::Fetcher;
use crate::error::{Error, Result};
use crate::render::Renderer;
use crate::runner::SystemExecutor;
use crate::secret::DatabaseCredentials;
use crate::state::{AppKind, StateDocument, StateStore};

use action::Workspace;

/// Request to add (or with `force`, replace) a site
#[derive(Debug, Clone)]
pub struct AddSite {
    pub primary: String,
    pub aliases: Vec<String>,
    pub app: AppKind,
    /// Defaults to the configured PHP version
    pub php_version: Option<String>,
    /// Create a dedicated Linux owner for the web root
    pub create_user: bool,
}

/// One logical command
#[derive(Debug, Clone)]
pub enum Operation {
    AddSite(AddSite),
    DeleteSite {
        domain: String,
        /// Also remove the web root and the companion database
        purge: bool,
    },
    CreateDatabase {
        name: String,
    },
    DeleteDatabase {
        name: String,
    },
    InstallWordPress {
        domain: String,
    },
    CreateUser {
        username: String,
        home: Option<PathBuf>,
    },
    DeleteUser {
        username: String,
        remove_home: bool,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddSite(request) => write!(f, "site add {}", request.primary),
            Operation::DeleteSite { domain, .. } => write!(f, "site delete {domain}"),
            Operation::CreateDatabase { name } => write!(f, "db create {name}"),
            Operation::DeleteDatabase { name } => write!(f, "db delete {name}"),
            Operation::InstallWordPress { domain } => write!(f, "wordpress install {domain}"),
            Operation::CreateUser { username, .. } => write!(f, "user create {username}"),
            Operation::DeleteUser { username, .. } => write!(f, "user delete {username}"),
        }
    }
}

/// Execution mode flags
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Preview steps and rendered config, touch nothing
    pub dry_run: bool,
    /// Allow replacing an existing site or config file
    pub force: bool,
}

/// A file an operation writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    /// Rendered text; `None` when it carries generated secrets
    pub text: Option<String>,
    /// Current text of a file being replaced
    pub previous: Option<String>,
}

/// What a dry run would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub steps: Vec<PreviewLine>,
    pub documents: Vec<Document>,
}

/// What a completed operation did
#[derive(Debug)]
pub struct Report {
    pub steps: Vec<String>,
    /// Generated database credentials; shown to the caller once, never stored
    pub credentials: Option<DatabaseCredentials>,
}

#[derive(Debug)]
pub enum Outcome {
    Preview(Preview),
    Applied(Report),
}

/// Runs operations against one host
///
/// Every collaborator is handed in explicitly, so tests can build an
/// engine over a temporary directory and a fake executor.
pub struct Engine<'e> {
    settings: &'e Settings,
    executor: &'e dyn SystemExecutor,
    fetcher: &'e dyn Fetcher,
    store: StateStore,
    renderer: Renderer,
}

impl<'e> Engine<'e> {
    pub fn new(
        settings: &'e Settings,
        executor: &'e dyn SystemExecutor,
        fetcher: &'e dyn Fetcher,
    ) -> Result<Self> {
        Ok(Self {
            settings,
            executor,
            fetcher,
            store: StateStore::new(settings.state_file()),
            renderer: Renderer::new()?,
        })
    }

    /// Current state document, for read-only views
    pub fn state(&self) -> Result<StateDocument> {
        self.store.read()
    }

    /// Run one operation
    pub fn run<P: ProgressCallback>(
        &self,
        operation: &Operation,
        options: Options,
        progress: &mut P,
    ) -> Result<Outcome> {
        let snapshot = self.store.read()?;
        let prepared = self.prepare(&snapshot, operation, options)?;

        if options.dry_run {
            log::info!("Dry run of {operation}: {} steps", prepared.plan.len());
            return Ok(Outcome::Preview(Preview {
                steps: prepared.plan.preview(),
                documents: prepared.documents,
            }));
        }

        log::info!("Running {operation}: {} steps", prepared.plan.len());
        let applied = self.apply(&prepared.plan, snapshot, progress)?;
        log::info!("Completed {operation}");

        Ok(Outcome::Applied(Report {
            steps: applied.steps,
            credentials: prepared.credentials,
        }))
    }

    fn prepare(
        &self,
        snapshot: &StateDocument,
        operation: &Operation,
        options: Options,
    ) -> Result<ops::Prepared> {
        let builder = ops::Builder {
            settings: self.settings,
            renderer: &self.renderer,
            state: snapshot,
            force: options.force,
            now: Utc::now(),
        };
        builder.build(operation).inspect_err(|e| {
            log::debug!("Rejected {operation} before any side effect: {e}");
        })
    }

    /// Execute a plan against a draft of `snapshot`, then persist the draft
    fn apply<A, P>(
        &self,
        plan: &Plan<A>,
        snapshot: StateDocument,
        progress: &mut P,
    ) -> Result<reconcile::Applied>
    where
        A: Action<Workspace<'e>, Error = Error>,
        P: ProgressCallback,
    {
        let mut workspace = Workspace {
            executor: self.executor,
            fetcher: self.fetcher,
            timeout: self.settings.command_timeout,
            state: snapshot,
            unpacked: BTreeMap::new(),
        };

        let applied = reconcile::execute(plan, &mut workspace, progress).map_err(|failure| {
            log::error!("{failure}");
            for undone in &failure.compensated {
                log::info!("Rolled back: {undone}");
            }
            for leftover in &failure.irreversible {
                log::warn!("Left in place (no undo): {leftover}");
            }
            for broken in &failure.compensation_failures {
                log::error!("Rollback of '{}' failed: {}", broken.step, broken.error);
            }
            if !failure.is_rollback_complete() {
                log::error!("Rollback incomplete: the host no longer matches the state file");
            }
            Error::from_failure(failure)
        })?;

        self.store.write(&workspace.state)?;
        log::debug!("Saved state to {}", self.store.path().display());
        Ok(applied)
    }
}
