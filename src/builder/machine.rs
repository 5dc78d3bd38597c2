//! Builder for constructing state machines.

use crate::builder::error::{check, collect, BuildError};
use crate::builder::state::StateBuilder;
use crate::core::{State, StateMachine};
use crate::error::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Builder for constructing state machines with a fluent API.
pub struct StateMachineBuilder {
    states: Vec<State>,
}

impl StateMachineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Add a state from its builder.
    pub fn state(mut self, builder: StateBuilder) -> Self {
        self.states.push(builder.build());
        self
    }

    /// Add a pre-built state.
    pub fn add_state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    /// Add multiple states at once.
    pub fn states(mut self, builders: impl IntoIterator<Item = StateBuilder>) -> Self {
        self.states
            .extend(builders.into_iter().map(StateBuilder::build));
        self
    }

    /// Build the shared registry.
    ///
    /// Fails with every violation found: no states at all, or a permitted
    /// value that names no state of this machine.
    pub fn build(self) -> Result<Arc<StateMachine>> {
        let names: BTreeSet<&str> = self.states.iter().map(State::name).collect();

        let mut checks = vec![check(if self.states.is_empty() {
            Err(BuildError::NoStates)
        } else {
            Ok(())
        })];

        for state in &self.states {
            for target in state.permitted() {
                if !names.contains(target) {
                    checks.push(check(Err(BuildError::UnknownTransitionTarget {
                        state: state.name().to_string(),
                        target: target.to_string(),
                    })));
                }
            }
        }

        collect(checks)?;
        Ok(Arc::new(StateMachine::new(self.states)))
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
