//! Builder for constructing state nodes.

use crate::core::{Hooks, State};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Single-use builder for a [`State`].
///
/// `build` consumes the builder, so a built state can never be modified
/// and a builder can never be built twice.
pub struct StateBuilder {
    name: String,
    permitted: BTreeSet<String>,
    hooks: Option<Arc<dyn Hooks>>,
}

impl StateBuilder {
    /// Start a state; `name` is also the state's value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permitted: BTreeSet::new(),
            hooks: None,
        }
    }

    /// Permit a transition to the state with this value.
    pub fn permit(mut self, value: impl Into<String>) -> Self {
        self.permitted.insert(value.into());
        self
    }

    /// Permit several next values at once.
    pub fn permit_all<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.permitted.extend(values.into_iter().map(Into::into));
        self
    }

    /// Attach the hook bundle run when entering this state.
    pub fn hooks<H: Hooks + 'static>(self, hooks: H) -> Self {
        self.shared_hooks(Arc::new(hooks))
    }

    /// Attach a hook bundle shared with other states.
    pub fn shared_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Freeze the state.
    pub fn build(self) -> State {
        State::new(self.name, self.permitted, self.hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FnHooks;

    #[test]
    fn build_freezes_name_and_permitted_values() {
        let liquid = StateBuilder::new("Liquid")
            .permit("Gas")
            .permit("Solid")
            .build();

        assert_eq!(liquid.name(), "Liquid");
        assert_eq!(liquid.permitted().collect::<Vec<_>>(), vec!["Gas", "Solid"]);
        assert!(liquid.hooks().is_none());
    }

    #[test]
    fn permit_all_adds_each_value_once() {
        let hub = StateBuilder::new("Hub")
            .permit_all(["A", "B", "A"])
            .build();

        assert_eq!(hub.permitted().count(), 2);
        assert!(hub.permits("A"));
        assert!(!hub.permits("C"));
    }

    #[test]
    fn builder_without_permits_yields_sink() {
        assert!(StateBuilder::new("Done").build().is_sink());
    }

    #[test]
    fn hooks_are_attached() {
        let state = StateBuilder::new("Gas").hooks(FnHooks::new()).build();
        assert!(state.hooks().is_some());
    }
}
