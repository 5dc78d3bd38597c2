//! Hook capabilities consulted by properties and states.
//!
//! A [`Hooks`] bundle is attached to a property or a state through its
//! configuration. The engine calls it through the trait at three points of
//! a write: before the mutation (`validate_change`), right after it
//! (`derive_next_state`, properties only) and once the change is committed
//! (`after_change`).

use super::entity::Entity;
use super::property::Property;
use super::state::{State, StateId};
use super::transaction::PropertyTransactionList;
use super::value::Value;
use crate::error::Result;
use std::sync::Arc;

/// What a hook is being called about.
#[derive(Clone, Copy, Debug)]
pub enum Subject<'a> {
    /// A property of the entity, by name.
    Property(&'a str),
    /// A state node. For `validate_change` this is the current state;
    /// for `after_change` it is the state that was left.
    State(&'a State),
}

impl<'a> Subject<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Subject::Property(name) => name,
            Subject::State(state) => state.name(),
        }
    }

    pub fn is_property(&self, name: &str) -> bool {
        matches!(self, Subject::Property(p) if *p == name)
    }

    pub fn as_state(&self) -> Option<&'a State> {
        match *self {
            Subject::State(state) => Some(state),
            Subject::Property(_) => None,
        }
    }
}

/// Domain behavior attached to a property or a state.
///
/// Every method has a no-op default, so implementors only override what
/// they need.
///
/// `derive_next_state` and `validate_change` must not mutate anything;
/// they only receive shared references. `after_change` may write sibling
/// properties through [`Entity::set_value`] with the given ledger, so that
/// a failure further up can undo them.
pub trait Hooks: Send + Sync {
    /// State the entity should be in after `property` changed, if any.
    fn derive_next_state(&self, _entity: &Entity, _property: &Property) -> Result<Option<StateId>> {
        Ok(None)
    }

    /// Reject `candidate` by returning an error.
    fn validate_change(&self, _entity: &Entity, _subject: Subject<'_>, _candidate: &Value) -> Result<()> {
        Ok(())
    }

    /// Derived updates after the change of `subject` was committed.
    fn after_change(
        &self,
        _entity: &mut Entity,
        _subject: Subject<'_>,
        _ledger: &mut PropertyTransactionList,
    ) -> Result<()> {
        Ok(())
    }
}

type DeriveFn = Box<dyn Fn(&Entity, &Property) -> Result<Option<StateId>> + Send + Sync>;
type ValidateFn = Box<dyn Fn(&Entity, Subject<'_>, &Value) -> Result<()> + Send + Sync>;
type AfterChangeFn =
    Box<dyn Fn(&mut Entity, Subject<'_>, &mut PropertyTransactionList) -> Result<()> + Send + Sync>;

/// [`Hooks`] assembled from closures.
///
/// # Example
///
/// ```rust
/// use cascade::core::{FnHooks, Hooks};
/// use cascade::Error;
///
/// let hooks = FnHooks::new().validate(|_entity, subject, candidate| {
///     match candidate.as_f64() {
///         Some(t) if t < -273.0 => Err(Error::domain(format!("{} below absolute zero", subject.name()))),
///         _ => Ok(()),
///     }
/// });
/// let shared = hooks.shared();
/// # let _ = shared;
/// ```
#[derive(Default)]
pub struct FnHooks {
    derive: Option<DeriveFn>,
    validate: Option<ValidateFn>,
    after_change: Option<AfterChangeFn>,
}

impl FnHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entity, &Property) -> Result<Option<StateId>> + Send + Sync + 'static,
    {
        self.derive = Some(Box::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Entity, Subject<'_>, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.validate = Some(Box::new(f));
        self
    }

    pub fn after_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Entity, Subject<'_>, &mut PropertyTransactionList) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.after_change = Some(Box::new(f));
        self
    }

    /// Wrap into the shared form stored by properties and states.
    pub fn shared(self) -> Arc<dyn Hooks> {
        Arc::new(self)
    }
}

impl Hooks for FnHooks {
    fn derive_next_state(&self, entity: &Entity, property: &Property) -> Result<Option<StateId>> {
        match &self.derive {
            Some(f) => f(entity, property),
            None => Ok(None),
        }
    }

    fn validate_change(&self, entity: &Entity, subject: Subject<'_>, candidate: &Value) -> Result<()> {
        match &self.validate {
            Some(f) => f(entity, subject, candidate),
            None => Ok(()),
        }
    }

    fn after_change(
        &self,
        entity: &mut Entity,
        subject: Subject<'_>,
        ledger: &mut PropertyTransactionList,
    ) -> Result<()> {
        match &self.after_change {
            Some(f) => f(entity, subject, ledger),
            None => Ok(()),
        }
    }
}
