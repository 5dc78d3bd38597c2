//! Setup errors for properties, entities and state machines.

use crate::core::ValueKind;
use crate::error::{Error, Result};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Configuration problems detected while building.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("Invalid value kind '{0}'")]
    UnknownValueKind(String),

    #[error("Owner of '{property}' can only be set once")]
    OwnerAlreadySet { property: String },

    #[error("Property '{0}' is declared more than once")]
    DuplicateProperty(String),

    #[error("Property name '{0}' is reserved")]
    ReservedPropertyName(String),

    #[error("Initial value of '{property}' is not a {expected} value")]
    InitialValueMismatch {
        property: String,
        expected: ValueKind,
    },

    #[error("State '{state}' permits '{target}', which is not a state of this machine")]
    UnknownTransitionTarget { state: String, target: String },

    #[error("Unknown initial state '{0}'")]
    UnknownInitialState(String),

    #[error("State machine has no state named '{0}'")]
    MissingState(String),

    #[error("No states defined. Add at least one state")]
    NoStates,
}

/// Outcome of one setup check. Failures accumulate instead of stopping at
/// the first one.
pub(crate) type Check = Validation<(), NonEmptyVec<BuildError>>;

pub(crate) fn check(result: std::result::Result<(), BuildError>) -> Check {
    match result {
        Ok(()) => Validation::success(()),
        Err(err) => Validation::fail(err),
    }
}

/// Fold accumulated checks into a single result listing every violation.
pub(crate) fn collect(checks: Vec<Check>) -> Result<()> {
    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(violations) => Err(Error::Setup(violations.iter().cloned().collect())),
    }
}
