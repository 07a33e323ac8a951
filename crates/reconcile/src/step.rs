//! Actions and steps
//!
//! An [`Action`] is a single side effect. A [`Step`] pairs the action that
//! moves the world forward with the action that undoes it.

use std::fmt;

/// A side effect that a step performs against a context `C`
///
/// Implementors are usually a closed enum of everything an operation can
/// do (write a file, run a command, record an entity), so plans stay
/// data-driven and can be previewed without running anything.
///
/// The `Display` impl is the action's description. It is shown in
/// previews and logs, so it must not reveal secrets.
///
/// # Example
///
/// ```ignore
/// use reconcile::Action;
/// use std::fmt;
///
/// #[derive(Debug)]
/// struct Touch(std::path::PathBuf);
///
/// impl fmt::Display for Touch {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "touch {}", self.0.display())
///     }
/// }
///
/// impl Action<()> for Touch {
///     type Error = std::io::Error;
///
///     fn apply(&self, _ctx: &mut ()) -> Result<(), std::io::Error> {
///         std::fs::write(&self.0, b"")
///     }
/// }
/// ```
pub trait Action<C>: fmt::Debug + fmt::Display {
    /// Error produced when the action fails
    type Error: fmt::Display;

    /// Perform the side effect
    fn apply(&self, ctx: &mut C) -> Result<(), Self::Error>;
}

/// One forward action plus its compensating action
#[derive(Debug)]
pub struct Step<A> {
    /// What this step accomplishes, e.g. "Write site config"
    pub description: String,
    /// The action that moves the operation forward
    pub forward: A,
    /// The action that undoes `forward`, if the step can be undone
    pub compensate: Option<A>,
    /// The forward action only inspects the world and has nothing to undo
    pub read_only: bool,
}

impl<A> Step<A> {
    /// Create a forward-only step
    pub fn new(description: impl Into<String>, forward: A) -> Self {
        Self {
            description: description.into(),
            forward,
            compensate: None,
            read_only: false,
        }
    }

    /// Create a step that only checks a precondition
    ///
    /// Check steps are skipped during compensation and never reported as
    /// irreversible.
    pub fn check(description: impl Into<String>, forward: A) -> Self {
        Self {
            read_only: true,
            ..Self::new(description, forward)
        }
    }

    /// Attach the action that undoes this step
    pub fn with_compensation(mut self, compensate: A) -> Self {
        self.compensate = Some(compensate);
        self
    }

    /// Whether a failure after this step can undo it
    pub fn is_reversible(&self) -> bool {
        self.read_only || self.compensate.is_some()
    }
}
