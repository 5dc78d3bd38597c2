//! Entities: property bundles governed by a state machine.
//!
//! An [`Entity`] owns its properties and points at one node of a shared
//! [`StateMachine`]. Writing a property may derive a new state; the entity
//! validates that edge, commits it and lets the target state's hooks cascade
//! into further writes, all recorded in one [`PropertyTransactionList`].

use super::history::{StateHistory, StateTransition, TransitionKind};
use super::hooks::{Hooks, Subject};
use super::property::Property;
use super::state::{State, StateId, StateMachine};
use super::transaction::PropertyTransactionList;
use super::value::Value;
use crate::builder::error::{check, collect};
use crate::builder::BuildError;
use crate::config::{EntityConfig, PropertyConfig};
use crate::error::{Error, Result, TransitionError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use stillwater::validation::Validation;
use tracing::{debug, warn};
use uuid::Uuid;

/// Ledger name of the current-state pseudo property. Reserved: no
/// configured property may use it.
pub const STATE_PROPERTY: &str = "state";

/// Opaque handle of an entity.
///
/// Properties and ledger records refer to their entity through this id
/// rather than holding a reference to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named container of properties plus one current state.
pub struct Entity {
    id: EntityId,
    name: String,
    machine: Arc<StateMachine>,
    current: StateId,
    properties: BTreeMap<String, Property>,
    history: StateHistory,
}

impl Entity {
    /// Build an entity with one property per configuration record.
    ///
    /// Every configuration problem is reported at once in
    /// [`Error::Setup`]: unknown value kinds, mismatched initial values,
    /// duplicate or reserved property names, and an initial state that is
    /// not part of `machine`.
    pub fn new(
        name: impl Into<String>,
        machine: Arc<StateMachine>,
        initial: StateId,
        configs: &[PropertyConfig],
    ) -> Result<Self> {
        let id = EntityId::new();
        let mut properties = BTreeMap::new();
        let mut checks = Vec::new();

        if !machine.contains(initial) {
            checks.push(Validation::fail(BuildError::UnknownInitialState(
                initial.to_string(),
            )));
        }

        for config in configs {
            if config.name == STATE_PROPERTY {
                checks.push(Validation::fail(BuildError::ReservedPropertyName(
                    config.name.clone(),
                )));
                continue;
            }
            if properties.contains_key(&config.name) {
                checks.push(Validation::fail(BuildError::DuplicateProperty(
                    config.name.clone(),
                )));
                continue;
            }
            match Property::from_config(config) {
                Ok(mut property) => {
                    checks.push(check(property.attach_owner(id)));
                    properties.insert(config.name.clone(), property);
                }
                Err(err) => checks.push(Validation::fail(err)),
            }
        }

        collect(checks)?;

        let name = name.into();
        debug!(entity = %name, %id, properties = properties.len(), "entity created");

        Ok(Self {
            id,
            name,
            machine,
            current: initial,
            properties,
            history: StateHistory::new(),
        })
    }

    /// Build an entity from a configuration document, resolving the
    /// initial state by name.
    pub fn from_config(config: &EntityConfig, machine: Arc<StateMachine>) -> Result<Self> {
        let initial = machine
            .find(&config.initial_state)
            .ok_or_else(|| BuildError::UnknownInitialState(config.initial_state.clone()))?;
        Self::new(config.name.clone(), machine, initial, &config.properties)
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn machine(&self) -> &Arc<StateMachine> {
        &self.machine
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn state(&self) -> &State {
        &self.machine[self.current]
    }

    /// Value of the current state.
    pub fn get_state(&self) -> &str {
        self.state().name()
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        self.properties
            .get(name)
            .ok_or_else(|| self.unknown_property(name))
    }

    /// Properties in name order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Read a property's value, honoring its access policy.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.property(name)?.get_value()
    }

    /// Write a property inside its own transaction.
    ///
    /// If anything in the cascade fails, every change the write made is
    /// rolled back before the error is returned.
    pub fn write(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.transaction(|entity, ledger| entity.set_value(name, value, ledger))
    }

    /// Run `f` with a fresh ledger. Any error escaping `f` triggers a full
    /// rollback of that ledger before it is returned.
    ///
    /// If the rollback itself fails the result is [`Error::Rollback`]
    /// carrying both errors.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Entity, &mut PropertyTransactionList) -> Result<T>,
    {
        let mut ledger = PropertyTransactionList::new();
        match f(self, &mut ledger) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(
                    entity = %self.name,
                    error = %err,
                    records = ledger.len(),
                    "rolling back transaction"
                );
                match ledger.unwind(self) {
                    Ok(()) => Err(err),
                    Err(undo) => Err(Error::Rollback {
                        cause: Some(Box::new(err)),
                        undo: Box::new(undo),
                    }),
                }
            }
        }
    }

    /// Write a property as one step of a cascade.
    ///
    /// The candidate is checked against the access policy and kind, then
    /// against the property's validate hook; a rejection leaves everything
    /// untouched. The previous value is recorded in `ledger`, the value is
    /// replaced, and the cascade runs: a derived state change, then the
    /// property's post-change hook. If the cascade fails the property gets
    /// its previous value back and the error is returned. Changes made by
    /// nested writes stay in place; roll `ledger` back to undo them.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        ledger: &mut PropertyTransactionList,
    ) -> Result<()> {
        let value = value.into();
        let property = self.property(name)?;
        property.check_write(&value)?;
        let hooks = property.hooks().cloned();

        if let Some(hooks) = &hooks {
            hooks.validate_change(self, Subject::Property(name), &value)?;
        }

        let previous = self.property_mut(name)?.replace(value);
        ledger.add_property_transaction(self.id, name, previous.clone());
        debug!(entity = %self.name, property = name, "property written");

        if let Some(hooks) = hooks {
            if let Err(err) = self.cascade(name, hooks.as_ref(), ledger) {
                warn!(entity = %self.name, property = name, error = %err, "reverting property");
                self.property_mut(name)?.replace(previous);
                return Err(err);
            }
        }
        Ok(())
    }

    fn cascade(
        &mut self,
        name: &str,
        hooks: &dyn Hooks,
        ledger: &mut PropertyTransactionList,
    ) -> Result<()> {
        let derived = hooks.derive_next_state(self, self.property(name)?)?;
        if let Some(target) = derived.filter(|target| *target != self.current) {
            self.set_state(target, ledger)?;
        }
        hooks.after_change(self, Subject::Property(name), ledger)
    }

    /// Move to `target`.
    ///
    /// A target with the current value is a no-op: no hooks, no record.
    /// Otherwise the edge must be permitted by the current state and the
    /// target's validate hook must accept it. After the commit the target's
    /// post-change hook runs; if it fails the previous state is restored
    /// and the error returned.
    pub(crate) fn set_state(
        &mut self,
        target: StateId,
        ledger: &mut PropertyTransactionList,
    ) -> Result<()> {
        let machine = Arc::clone(&self.machine);
        let next = machine.state(target).ok_or(Error::UnknownState(target))?;
        if next.name().is_empty() {
            return Err(TransitionError::InvalidTarget.into());
        }

        let current = &machine[self.current];
        if current.name() == next.name() {
            return Ok(());
        }
        current.validate_next_state(next)?;

        if let Some(hooks) = next.hooks() {
            hooks.validate_change(self, Subject::State(current), &Value::from(next.name()))?;
        }

        let old = self.current;
        self.current = target;
        ledger.add_state_transaction(self.id, old);
        self.record_transition(old, target, TransitionKind::Committed);
        debug!(entity = %self.name, from = %current, to = %next, "state transition committed");

        if let Some(hooks) = next.hooks() {
            if let Err(err) = hooks.after_change(self, Subject::State(current), ledger) {
                warn!(entity = %self.name, from = %current, to = %next, error = %err, "reverting state transition");
                let reached = self.current;
                self.current = old;
                self.record_transition(reached, old, TransitionKind::Reverted);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Undo path for a property record: checks and validation, no cascade.
    pub(crate) fn restore_value(&mut self, name: &str, value: Value) -> Result<()> {
        let property = self.property(name)?;
        property.check_write(&value)?;
        if let Some(hooks) = property.hooks().cloned() {
            hooks.validate_change(self, Subject::Property(name), &value)?;
        }
        self.property_mut(name)?.replace(value);
        debug!(entity = %self.name, property = name, "property restored");
        Ok(())
    }

    /// Undo path for a transition record. Already being in `previous`
    /// (a post-change failure reverted it) leaves the history alone.
    pub(crate) fn restore_state(&mut self, previous: StateId) -> Result<()> {
        if !self.machine.contains(previous) {
            return Err(Error::UnknownState(previous));
        }
        let from = self.current;
        if from == previous {
            return Ok(());
        }
        self.current = previous;
        self.record_transition(from, previous, TransitionKind::RolledBack);
        debug!(entity = %self.name, state = %self.get_state(), "state restored");
        Ok(())
    }

    fn record_transition(&mut self, from: StateId, to: StateId, kind: TransitionKind) {
        self.history.push(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            kind,
        });
    }

    fn property_mut(&mut self, name: &str) -> Result<&mut Property> {
        let Self {
            properties,
            name: entity,
            ..
        } = self;
        properties
            .get_mut(name)
            .ok_or_else(|| Error::UnknownProperty {
                entity: entity.clone(),
                property: name.to_string(),
            })
    }

    fn unknown_property(&self, name: &str) -> Error {
        Error::UnknownProperty {
            entity: self.name.clone(),
            property: name.to_string(),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.get_state())
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Diagnostic dump: name, current state and one line per property.
/// Read-once values are masked, not consumed.
impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - In {}", self.name, self.get_state())?;
        for property in self.properties.values() {
            write!(f, "\n  * {} - {}", property.name(), property.display_value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateBuilder, StateMachineBuilder};
    use crate::core::{FnHooks, ValueKind};

    fn machine() -> Arc<StateMachine> {
        StateMachineBuilder::new()
            .state(StateBuilder::new("Off").permit("On"))
            .state(StateBuilder::new("On").permit_all(["Off", "Broken"]))
            .state(StateBuilder::new("Broken"))
            .build()
            .unwrap()
    }

    /// Positive power means on, zero off, negative broken.
    fn power_hooks(machine: &StateMachine) -> FnHooks {
        let off = machine.find("Off").unwrap();
        let on = machine.find("On").unwrap();
        let broken = machine.find("Broken").unwrap();
        FnHooks::new().derive(move |_, property| {
            let level = property.get_value()?.as_i64().unwrap_or_default();
            Ok(Some(match level {
                l if l > 0 => on,
                0 => off,
                _ => broken,
            }))
        })
    }

    fn configs(machine: &StateMachine) -> Vec<PropertyConfig> {
        vec![
            PropertyConfig::new("power", "integer").hooks(power_hooks(machine)),
            PropertyConfig::new("counter", "integer"),
            PropertyConfig::new("mirror", "integer"),
            PropertyConfig::new("serial", "string").initial("X1").read_only(),
            PropertyConfig::new("token", "string").initial("abc").read_once(),
        ]
    }

    fn switch_with(machine: Arc<StateMachine>, configs: &[PropertyConfig]) -> Entity {
        let off = machine.find("Off").unwrap();
        Entity::new("Switch", machine, off, configs).unwrap()
    }

    fn switch() -> Entity {
        let machine = machine();
        let configs = configs(&machine);
        switch_with(machine, &configs)
    }

    #[test]
    fn set_value_records_previous_value() {
        let mut entity = switch();
        let mut ledger = PropertyTransactionList::new();

        entity.set_value("counter", 5, &mut ledger).unwrap();

        assert_eq!(entity.get("counter").unwrap(), Value::Integer(5));
        assert_eq!(ledger.len(), 1);
        let record = ledger.last_transaction().unwrap();
        assert_eq!(record.property_name(), "counter");
        assert_eq!(record.previous_value(), Some(&Value::Integer(0)));
        assert_eq!(record.entity(), entity.id());
    }

    #[test]
    fn write_derives_and_records_state() {
        let mut entity = switch();

        let names = entity
            .transaction(|entity, ledger| {
                entity.set_value("power", 3, ledger)?;
                Ok(ledger
                    .iter()
                    .map(|record| record.property_name().to_string())
                    .collect::<Vec<_>>())
            })
            .unwrap();

        assert_eq!(names, vec!["power", STATE_PROPERTY]);
        assert_eq!(entity.get_state(), "On");
        assert_eq!(entity.history().committed().count(), 1);
    }

    #[test]
    fn forbidden_transition_reverts_value() {
        let mut entity = switch();

        let err = entity.write("power", -1).unwrap_err();

        assert!(matches!(
            err,
            Error::Transition(TransitionError::NotPermitted { ref from, ref to })
                if from == "Off" && to == "Broken"
        ));
        assert_eq!(entity.get("power").unwrap(), Value::Integer(0));
        assert_eq!(entity.get_state(), "Off");
        assert!(entity.history().transitions().is_empty());
    }

    #[test]
    fn same_state_is_a_no_op() {
        let mut entity = switch();

        let records = entity
            .transaction(|entity, ledger| {
                let current = entity.current_state();
                entity.set_state(current, ledger)?;
                Ok(ledger.len())
            })
            .unwrap();

        assert_eq!(records, 0);
        assert!(entity.history().transitions().is_empty());
    }

    #[test]
    fn empty_state_value_is_an_invalid_target() {
        let machine = StateMachineBuilder::new()
            .state(StateBuilder::new("Off").permit(""))
            .state(StateBuilder::new(""))
            .build()
            .unwrap();
        let blank = machine.find("").unwrap();
        let mut entity = switch_with(machine, &[]);

        let err = entity
            .transaction(|entity, ledger| entity.set_state(blank, ledger))
            .unwrap_err();

        assert!(matches!(err, Error::Transition(TransitionError::InvalidTarget)));
        assert_eq!(entity.get_state(), "Off");
    }

    #[test]
    fn failed_post_change_reverts_state() {
        let fuse = FnHooks::new().after_change(|_, _, _| Err(Error::domain("fuse blown")));
        let machine = StateMachineBuilder::new()
            .state(StateBuilder::new("Off").permit("On"))
            .state(StateBuilder::new("On").permit("Off").hooks(fuse))
            .state(StateBuilder::new("Broken"))
            .build()
            .unwrap();
        let configs = configs(&machine);
        let mut entity = switch_with(machine, &configs);

        let err = entity.write("power", 3).unwrap_err();

        assert!(matches!(err, Error::Domain(ref message) if message == "fuse blown"));
        assert_eq!(entity.get_state(), "Off");
        assert_eq!(entity.get("power").unwrap(), Value::Integer(0));
        let kinds: Vec<_> = entity
            .history()
            .transitions()
            .iter()
            .map(|transition| transition.kind)
            .collect();
        assert_eq!(kinds, vec![TransitionKind::Committed, TransitionKind::Reverted]);
    }

    #[test]
    fn state_validate_hook_sees_current_state() {
        let guard = FnHooks::new().validate(|_, subject, candidate| {
            match (subject.as_state(), candidate.as_str()) {
                (Some(current), Some("On")) if current.name() == "Off" => {
                    Err(Error::domain("locked"))
                }
                _ => Ok(()),
            }
        });
        let machine = StateMachineBuilder::new()
            .state(StateBuilder::new("Off").permit("On"))
            .state(StateBuilder::new("On").permit("Off").hooks(guard))
            .state(StateBuilder::new("Broken"))
            .build()
            .unwrap();
        let configs = configs(&machine);
        let mut entity = switch_with(machine, &configs);

        assert!(entity.write("power", 1).is_err());
        assert_eq!(entity.get_state(), "Off");
        assert!(entity.history().transitions().is_empty());
    }

    #[test]
    fn transaction_undoes_nested_writes() {
        let machine = machine();
        let mut configs = configs(&machine);
        configs[1] = PropertyConfig::new("counter", "integer").hooks(FnHooks::new().after_change(
            |entity, _, ledger| {
                entity.set_value("mirror", 7, ledger)?;
                Err(Error::domain("boom"))
            },
        ));
        let mut entity = switch_with(machine, &configs);

        let err = entity.write("counter", 5).unwrap_err();

        assert!(matches!(err, Error::Domain(_)));
        assert_eq!(entity.get("counter").unwrap(), Value::Integer(0));
        assert_eq!(entity.get("mirror").unwrap(), Value::Integer(0));
    }

    #[test]
    fn failed_rollback_keeps_cause_and_undo_error() {
        let machine = machine();
        let off = machine.find("Off").unwrap();
        let floor = FnHooks::new().validate(|_, _, candidate| match candidate.as_i64() {
            Some(n) if n < 5 => Err(Error::domain("min 5")),
            _ => Ok(()),
        });
        let mut entity = Entity::new(
            "Gauge",
            machine,
            off,
            &[PropertyConfig::new("level", "integer").initial(1).hooks(floor)],
        )
        .unwrap();

        let err = entity
            .transaction(|entity, ledger| {
                entity.set_value("level", 9, ledger)?;
                Err::<(), _>(Error::domain("boom"))
            })
            .unwrap_err();

        match err {
            Error::Rollback { cause, undo } => {
                assert!(matches!(cause.as_deref(), Some(Error::Domain(m)) if m == "boom"));
                assert!(matches!(*undo, Error::Domain(ref m) if m == "min 5"));
            }
            other => panic!("Expected Rollback, got {other:?}"),
        }
        assert_eq!(entity.get("level").unwrap(), Value::Integer(9));
    }

    #[test]
    fn state_ids_from_another_machine_are_refused() {
        let home = machine();
        let other = machine();
        let foreign_on = other.find("On").unwrap();

        let err = Entity::new("Switch", Arc::clone(&home), other.find("Off").unwrap(), &[])
            .unwrap_err();
        assert!(matches!(
            err.setup_violations(),
            [BuildError::UnknownInitialState(_)]
        ));

        let stray = FnHooks::new().derive(move |_, _| Ok(Some(foreign_on)));
        let mut entity = switch_with(
            home,
            &[PropertyConfig::new("power", "integer").hooks(stray)],
        );

        let err = entity.write("power", 1).unwrap_err();

        assert!(matches!(err, Error::UnknownState(id) if id == foreign_on));
        assert_eq!(entity.get_state(), "Off");
        assert_eq!(entity.get("power").unwrap(), Value::Integer(0));
    }

    #[test]
    fn access_policy_is_enforced() {
        let mut entity = switch();

        assert!(matches!(
            entity.write("serial", "X2"),
            Err(Error::ReadOnly { ref property }) if property == "serial"
        ));
        assert_eq!(entity.get("serial").unwrap(), Value::from("X1"));

        assert!(matches!(
            entity.write("counter", "many"),
            Err(Error::TypeMismatch { expected: ValueKind::Integer, found: ValueKind::String, .. })
        ));

        assert_eq!(entity.get("token").unwrap(), Value::from("abc"));
        assert!(matches!(entity.get("token"), Err(Error::SingleRead { .. })));

        assert!(matches!(
            entity.write("pressure", 1),
            Err(Error::UnknownProperty { ref entity, ref property })
                if entity == "Switch" && property == "pressure"
        ));
    }

    #[test]
    fn setup_reports_every_violation() {
        let machine = machine();
        let off = machine.find("Off").unwrap();

        let err = Entity::new(
            "Broken",
            machine,
            off,
            &[
                PropertyConfig::new(STATE_PROPERTY, "string"),
                PropertyConfig::new("a", "integer"),
                PropertyConfig::new("a", "integer"),
                PropertyConfig::new("b", "color"),
            ],
        )
        .unwrap_err();

        assert_eq!(
            err.setup_violations(),
            &[
                BuildError::ReservedPropertyName(STATE_PROPERTY.to_string()),
                BuildError::DuplicateProperty("a".to_string()),
                BuildError::UnknownValueKind("color".to_string()),
            ]
        );
    }

    #[test]
    fn from_config_resolves_initial_state() {
        let machine = machine();
        let config = EntityConfig {
            name: "Switch".to_string(),
            initial_state: "On".to_string(),
            properties: vec![PropertyConfig::new("counter", "integer")],
        };

        let entity = Entity::from_config(&config, Arc::clone(&machine)).unwrap();
        assert_eq!(entity.get_state(), "On");

        let config = EntityConfig {
            initial_state: "Melted".to_string(),
            ..config
        };
        assert!(matches!(
            Entity::from_config(&config, machine),
            Err(Error::Setup(ref violations))
                if violations == &[BuildError::UnknownInitialState("Melted".to_string())]
        ));
    }

    #[test]
    fn display_masks_read_once_values() {
        let entity = switch();

        assert_eq!(
            entity.to_string(),
            "Switch - In Off\n  * counter - 0\n  * mirror - 0\n  * power - 0\n  * serial - X1\n  * token - <read once>"
        );
        assert_eq!(entity.get("token").unwrap(), Value::from("abc"));
    }
}
