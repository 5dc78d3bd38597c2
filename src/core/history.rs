//! State transition history tracking.
//!
//! Every change of an entity's current state is recorded with a timestamp:
//! committed transitions, local reverts after a failed post-change hook, and
//! restorations performed by a ledger rollback.

use super::state::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why the current state changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// A validated transition was committed.
    Committed,
    /// The target state's post-change hook failed and the state was put back.
    Reverted,
    /// A ledger rollback restored an earlier state.
    RolledBack,
}

/// Record of a single change of current state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being left
    pub from: StateId,
    /// The state being entered
    pub to: StateId,
    /// When the change happened
    pub timestamp: DateTime<Utc>,
    pub kind: TransitionKind,
}

/// Ordered history of state changes.
///
/// History is immutable - the `record` method returns a new history
/// with the transition added.
///
/// # Example
///
/// ```rust
/// use cascade::core::{StateHistory, StateTransition, TransitionKind};
/// # use cascade::builder::{StateBuilder, StateMachineBuilder};
/// use chrono::Utc;
///
/// # let machine = StateMachineBuilder::new()
/// #     .state(StateBuilder::new("Start").permit("End"))
/// #     .state(StateBuilder::new("End"))
/// #     .build()
/// #     .unwrap();
/// let start = machine.find("Start").unwrap();
/// let end = machine.find("End").unwrap();
///
/// let history = StateHistory::new().record(StateTransition {
///     from: start,
///     to: end,
///     timestamp: Utc::now(),
///     kind: TransitionKind::Committed,
/// });
///
/// assert_eq!(history.get_path(), vec![start, end]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Append in place. The entity owns its history outright, so it skips
    /// the copy [`record`](Self::record) makes.
    pub(crate) fn push(&mut self, transition: StateTransition) {
        self.transitions.push(transition);
    }

    /// States traversed: the first `from`, then every `to` in order.
    pub fn get_path(&self) -> Vec<StateId> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|transition| transition.to));
        path
    }

    /// Time between the first and last recorded change.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Only the committed transitions.
    pub fn committed(&self) -> impl Iterator<Item = &StateTransition> {
        self.transitions
            .iter()
            .filter(|transition| transition.kind == TransitionKind::Committed)
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }
}
