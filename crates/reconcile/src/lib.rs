//! # Reconcile
//!
//! Ordered step plans with compensating actions.
//!
//! An operation that touches several independently-failing systems (files,
//! services, databases, accounts) has no transaction spanning all of them.
//! This crate models such an operation as a [`Plan`]: an ordered list of
//! [`Step`]s, each pairing a forward action with an optional compensating
//! action. The [`execute`] function applies steps strictly in order and, on
//! the first failure, runs the compensations of every applied step in
//! reverse order before surfacing the original error.
//!
//! ## Core Concepts
//!
//! - **Action**: A side effect against some context (`apply`) whose
//!   `Display` is its description
//! - **Step**: A forward action and the action that undoes it
//! - **Plan**: The ordered step list for one logical operation
//! - **Failure**: The original error plus what was (and wasn't) rolled back
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{Action, Plan, Step, NoProgress, execute};
//! use std::fmt;
//!
//! #[derive(Debug)]
//! enum FileAction {
//!     Write { path: String, content: String },
//!     Remove { path: String },
//! }
//!
//! impl fmt::Display for FileAction {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         match self {
//!             Self::Write { path, .. } => write!(f, "write {path}"),
//!             Self::Remove { path } => write!(f, "remove {path}"),
//!         }
//!     }
//! }
//!
//! impl Action<()> for FileAction {
//!     type Error = std::io::Error;
//!
//!     fn apply(&self, _ctx: &mut ()) -> Result<(), std::io::Error> {
//!         match self {
//!             Self::Write { path, content } => std::fs::write(path, content),
//!             Self::Remove { path } => std::fs::remove_file(path),
//!         }
//!     }
//! }
//!
//! let mut plan = Plan::new();
//! plan.push(
//!     Step::new("Write site config", FileAction::Write {
//!         path: "/tmp/site.conf".into(),
//!         content: "example.com {}".into(),
//!     })
//!     .with_compensation(FileAction::Remove { path: "/tmp/site.conf".into() }),
//! );
//!
//! let applied = execute(&plan, &mut (), &mut NoProgress)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`Action`]: The side effects themselves, supplied by the caller
//! - [`ProgressCallback`]: Receives progress updates
//!
//! The crate has no opinion on what a side effect is, so it can be used
//! without hard dependencies on process spawning, UI frameworks, etc.

pub mod context;
pub mod executor;
pub mod plan;
pub mod step;
pub mod types;

// Re-export main types at crate root
pub use context::{NoProgress, ProgressCallback};
pub use executor::execute;
pub use plan::Plan;
pub use step::{Action, Step};
pub use types::{Applied, CompensationFailure, Failure, PreviewLine, StepResult};
