//! Error types for property writes, state transitions and rollbacks.

use crate::builder::BuildError;
use crate::core::{EntityId, StateId, ValueKind};
use thiserror::Error;

/// Reasons a state transition is refused.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("Not allowed to change from '{from}' to '{to}'")]
    NotPermitted { from: String, to: String },

    #[error("Invalid next state value")]
    InvalidTarget,
}

/// Errors raised by the engine and by caller-supplied hooks.
#[derive(Debug, Error)]
pub enum Error {
    /// Write attempted on a read-only property.
    #[error("'{property}' is configured as a read only property")]
    ReadOnly { property: String },

    /// Second read of a read-once property.
    #[error("'{property}' is read once and was already read")]
    SingleRead { property: String },

    /// Invalid configuration. Every violation found is listed.
    #[error("Invalid setup: {}", describe_violations(.0))]
    Setup(Vec<BuildError>),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Undoing a ledger record failed. `cause` is the error that
    /// triggered the rollback, if any.
    #[error("Rollback failed: {undo}{}", describe_cause(.cause))]
    Rollback {
        cause: Option<Box<Error>>,
        undo: Box<Error>,
    },

    #[error("'{property}' holds {expected} values, got {found}")]
    TypeMismatch {
        property: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Unknown property '{property}' on '{entity}'")]
    UnknownProperty { entity: String, property: String },

    #[error("Unknown state id {0}")]
    UnknownState(StateId),

    #[error("Record for entity {recorded} cannot be undone on entity {target}")]
    ForeignTransaction { recorded: EntityId, target: EntityId },

    #[error("Invalid configuration document: {0}")]
    Config(#[from] serde_json::Error),

    /// Business rule violation raised by a hook.
    #[error("{0}")]
    Domain(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a domain error from a hook.
    pub fn domain(message: impl Into<String>) -> Self {
        Error::Domain(message.into())
    }

    /// Setup violations carried by this error; empty for other kinds.
    pub fn setup_violations(&self) -> &[BuildError] {
        match self {
            Error::Setup(violations) => violations,
            _ => &[],
        }
    }
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        Error::Setup(vec![err])
    }
}

fn describe_violations(violations: &[BuildError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_cause(cause: &Option<Box<Error>>) -> String {
    match cause {
        Some(cause) => format!(" (original error: {cause})"),
        None => String::new(),
    }
}
