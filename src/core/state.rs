//! State nodes and the registry that shares them between entities.
//!
//! A [`State`] is frozen once built: its name (which is also its value) and
//! the set of permitted next values never change. States live inside a
//! [`StateMachine`] and are addressed by [`StateId`], so two nodes that
//! happen to share a name are still told apart.

use super::hooks::Hooks;
use crate::error::TransitionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;
use uuid::Uuid;

/// Handle of a state node inside its [`StateMachine`].
///
/// Ids carry the machine they were issued by; another machine refuses them
/// even when it has a node at the same position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId {
    machine: Uuid,
    index: usize,
}

impl StateId {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// A finite-state machine node.
///
/// Built through [`StateBuilder`](crate::builder::StateBuilder). A state
/// with no permitted next values is a sink.
pub struct State {
    name: String,
    permitted: BTreeSet<String>,
    hooks: Option<Arc<dyn Hooks>>,
}

impl State {
    pub(crate) fn new(
        name: String,
        permitted: BTreeSet<String>,
        hooks: Option<Arc<dyn Hooks>>,
    ) -> Self {
        Self {
            name,
            permitted,
            hooks,
        }
    }

    /// The state's name, which is also its value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Permitted next values, in sorted order.
    pub fn permitted(&self) -> impl Iterator<Item = &str> + '_ {
        self.permitted.iter().map(String::as_str)
    }

    pub fn permits(&self, value: &str) -> bool {
        self.permitted.contains(value)
    }

    pub fn is_sink(&self) -> bool {
        self.permitted.is_empty()
    }

    pub fn hooks(&self) -> Option<&Arc<dyn Hooks>> {
        self.hooks.as_ref()
    }

    /// Check the edge from this state to `candidate`.
    ///
    /// Staying on the same value is always legal. Otherwise the candidate's
    /// value must be in the permitted set.
    pub fn validate_next_state(&self, candidate: &State) -> Result<(), TransitionError> {
        if candidate.name == self.name || self.permits(&candidate.name) {
            Ok(())
        } else {
            Err(TransitionError::NotPermitted {
                from: self.name.clone(),
                to: candidate.name.clone(),
            })
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("permitted", &self.permitted)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Immutable registry of the states of one FSM shape.
///
/// Built by [`StateMachineBuilder`](crate::builder::StateMachineBuilder) and
/// shared behind an `Arc` by every entity of that shape.
#[derive(Debug)]
pub struct StateMachine {
    id: Uuid,
    states: Vec<State>,
}

impl StateMachine {
    pub(crate) fn new(states: Vec<State>) -> Self {
        Self {
            id: Uuid::new_v4(),
            states,
        }
    }

    fn id_at(&self, index: usize) -> StateId {
        StateId {
            machine: self.id,
            index,
        }
    }

    /// The node behind `id`; `None` for ids issued by another machine.
    pub fn state(&self, id: StateId) -> Option<&State> {
        if id.machine != self.id {
            return None;
        }
        self.states.get(id.index)
    }

    /// First state with the given name.
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|state| state.name == name)
            .map(|index| self.id_at(index))
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.state(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.states.len()).map(|index| self.id_at(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states
            .iter()
            .enumerate()
            .map(|(index, state)| (self.id_at(index), state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Panics on an id from another machine; use [`StateMachine::state`] to
/// check first.
impl Index<StateId> for StateMachine {
    type Output = State;

    fn index(&self, id: StateId) -> &State {
        match self.state(id) {
            Some(state) => state,
            None => panic!("state id {id} does not belong to this machine"),
        }
    }
}
