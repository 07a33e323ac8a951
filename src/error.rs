//! Error types for provisioning operations.
//!
//! Every terminal failure maps to a stable [`ErrorCategory`] and, for
//! failures that happened mid-operation, a [`Rollback`] status telling the
//! caller whether the real world still matches the recorded state.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input, caught before any side effect
    Validation,
    /// Entity already exists (or is still in use)
    Conflict,
    /// Entity is not managed by this tool
    NotFound,
    /// An external command or filesystem side effect failed
    Execution,
    /// The state document could not be read or written
    StateIo,
    /// Programming or environment error
    Internal,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid input",
            Self::Conflict => "Conflicting state",
            Self::NotFound => "Not found",
            Self::Execution => "Command failed",
            Self::StateIo => "State file error",
            Self::Internal => "Unexpected error",
        }
    }

    /// Process exit code for this category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation => 2,
            Self::Conflict => 3,
            Self::NotFound => 4,
            Self::Execution => 5,
            Self::StateIo => 6,
            Self::Internal => 1,
        }
    }
}

/// What happened to the side effects of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    /// Nothing was attempted (validation/conflict failures)
    NotStarted,
    /// Side effects were attempted and every compensation succeeded
    Complete,
    /// A compensation failed, or an applied step had none: the host has
    /// drifted from the state file
    Incomplete,
}

/// An external command that exited non-zero, timed out, or could not start.
///
/// `command` is always the redacted rendering of the argv.
#[derive(Debug)]
pub struct ExecutionError {
    /// Redacted argv
    pub command: String,
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
    /// Trimmed stderr (or the spawn error)
    pub stderr: String,
    /// Whether the command was killed after exceeding its timeout
    pub timed_out: bool,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command `{}` ", self.command)?;
        if self.timed_out {
            return write!(f, "timed out");
        }
        match self.exit_code {
            Some(code) => write!(f, "exited with status {code}")?,
            None => write!(f, "could not complete")?,
        }
        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionError {}

/// Errors that can occur during provisioning operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad domain, identifier, template parameter or duplicate in the request
    #[error("invalid input: {0}")]
    Validation(String),

    /// Entity already exists, or is still referenced by another entity
    #[error("conflict: {0}")]
    StateConflict(String),

    /// Operating on a site, database or user this tool does not manage
    #[error("{kind} not found: {key}")]
    NotFound {
        /// "site", "database" or "user"
        kind: &'static str,
        /// The key that was looked up
        key: String,
    },

    /// External command failure
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// State document unreadable or unwritable
    #[error("state file {}: {message}", .path.display())]
    StateIo {
        /// Path of the state document
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Fetching or unpacking a download failed
    #[error("download of {url} failed: {message}")]
    Download {
        /// Source URL
        url: String,
        /// What went wrong
        message: String,
    },

    /// Filesystem side effect failed
    #[error("{context}: {source}")]
    Io {
        /// What was being done
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Built-in template could not be compiled
    #[error("template error: {0}")]
    Template(String),

    /// Settings could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// A step of a multi-step operation failed after earlier steps ran
    #[error("operation failed at step '{step}': {source}")]
    Step {
        /// Description of the failing step
        step: String,
        /// The step's error
        #[source]
        source: Box<Error>,
        /// Steps whose effects were undone
        compensated: Vec<String>,
        /// Steps whose compensation failed (description and error)
        compensation_failures: Vec<(String, String)>,
        /// Applied steps that cannot be undone and were left in place
        irreversible: Vec<String>,
    },
}

impl Error {
    /// Wrap an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Get the error category.
    ///
    /// A step failure is classified by the error of the step that failed.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            Error::StateConflict(_) => ErrorCategory::Conflict,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Execution(_) | Error::Io { .. } | Error::Download { .. } => {
                ErrorCategory::Execution
            }
            Error::StateIo { .. } => ErrorCategory::StateIo,
            Error::Template(_) | Error::Config(_) => ErrorCategory::Internal,
            Error::Step { source, .. } => source.category(),
        }
    }

    /// What happened to side effects of the failed operation.
    pub fn rollback(&self) -> Rollback {
        match self {
            Error::Step {
                compensation_failures,
                irreversible,
                ..
            } => {
                if compensation_failures.is_empty() && irreversible.is_empty() {
                    Rollback::Complete
                } else {
                    Rollback::Incomplete
                }
            }
            _ => Rollback::NotStarted,
        }
    }

    /// Process exit code: category code, or 7 when rollback was incomplete.
    pub fn exit_code(&self) -> i32 {
        if self.rollback() == Rollback::Incomplete {
            7
        } else {
            self.category().exit_code()
        }
    }

    /// Convert an executor failure into a step error.
    ///
    /// When the very first step failed nothing was applied, so the step's
    /// own error is returned unwrapped.
    pub fn from_failure(failure: reconcile::Failure<Error>) -> Self {
        if failure.nothing_applied() {
            return failure.error;
        }
        Error::Step {
            step: failure.step,
            source: Box::new(failure.error),
            compensated: failure.compensated,
            compensation_failures: failure
                .compensation_failures
                .into_iter()
                .map(|c| (c.step, c.error.to_string()))
                .collect(),
            irreversible: failure.irreversible,
        }
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn exec_error() -> Error {
        Error::Execution(ExecutionError {
            command: "systemctl reload caddy".to_string(),
            exit_code: Some(1),
            stderr: "Job failed".to_string(),
            timed_out: false,
        })
    }

    #[test]
    fn test_execution_error_message() {
        assert_eq!(
            exec_error().to_string(),
            "command `systemctl reload caddy` exited with status 1: Job failed"
        );

        let timeout = ExecutionError {
            command: "sleep 10".to_string(),
            exit_code: None,
            stderr: String::new(),
            timed_out: true,
        };
        assert_eq!(timeout.to_string(), "command `sleep 10` timed out");
    }

    #[test]
    fn test_step_error_takes_source_category() {
        let err = Error::Step {
            step: "Reload web server".to_string(),
            source: Box::new(exec_error()),
            compensated: vec!["Write site config".to_string()],
            compensation_failures: Vec::new(),
            irreversible: Vec::new(),
        };
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert_eq!(err.rollback(), Rollback::Complete);
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_incomplete_rollback_exit_code() {
        let err = Error::Step {
            step: "Create database user".to_string(),
            source: Box::new(exec_error()),
            compensated: Vec::new(),
            compensation_failures: vec![("Create database".to_string(), "boom".to_string())],
            irreversible: Vec::new(),
        };
        assert_eq!(err.rollback(), Rollback::Incomplete);
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_step_left_in_place_is_incomplete_rollback() {
        let err = Error::Step {
            step: "Reload web server".to_string(),
            source: Box::new(exec_error()),
            compensated: Vec::new(),
            compensation_failures: Vec::new(),
            irreversible: vec!["Remove site config".to_string()],
        };
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert_eq!(err.rollback(), Rollback::Incomplete);
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_download_error_is_execution() {
        let err = Error::Download {
            url: "https://wordpress.org/latest.tar.gz".to_string(),
            message: "status 503".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert_eq!(
            err.to_string(),
            "download of https://wordpress.org/latest.tar.gz failed: status 503"
        );
    }

    #[test]
    fn test_validation_is_not_started() {
        let err = Error::Validation("bad domain".to_string());
        assert_eq!(err.rollback(), Rollback::NotStarted);
        assert_eq!(err.category().exit_code(), 2);
        assert_eq!(
            Error::not_found("database", "shop_db").to_string(),
            "database not found: shop_db"
        );
    }
}
