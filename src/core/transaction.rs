//! The undo ledger.
//!
//! A [`PropertyTransactionList`] records the value every mutation replaced,
//! in the order the mutations happened. It spans one externally initiated
//! write and everything that write cascades into, and it is unwound strictly
//! last-in, first-out: a property touched twice gets its intermediate value
//! back first and its original value last.

use super::entity::{Entity, EntityId, STATE_PROPERTY};
use super::property::Property;
use super::state::StateId;
use super::value::Value;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, trace};

/// What a mutation replaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Previous {
    /// Value of a property before a write.
    Value(Value),
    /// Current state before a transition.
    State(StateId),
}

/// Immutable record of one mutation, created right before it is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyTransaction {
    entity: EntityId,
    property_name: String,
    previous: Previous,
}

impl PropertyTransaction {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Property written, or `"state"` for a transition.
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn previous(&self) -> &Previous {
        &self.previous
    }

    /// Previous property value; `None` for transition records.
    pub fn previous_value(&self) -> Option<&Value> {
        match &self.previous {
            Previous::Value(value) => Some(value),
            Previous::State(_) => None,
        }
    }

    pub fn is_state_change(&self) -> bool {
        matches!(self.previous, Previous::State(_))
    }

    /// Put the recorded value back on `entity`.
    ///
    /// Values go through the write path's access, type and validation checks
    /// but do not cascade: whatever the original write cascaded into has its
    /// own record.
    fn undo(&self, entity: &mut Entity) -> Result<()> {
        if entity.id() != self.entity {
            return Err(Error::ForeignTransaction {
                recorded: self.entity,
                target: entity.id(),
            });
        }
        match &self.previous {
            Previous::Value(value) => entity.restore_value(&self.property_name, value.clone()),
            Previous::State(state) => entity.restore_state(*state),
        }
    }
}

/// Ordered undo log for one cascade.
#[derive(Clone, Debug, Default)]
pub struct PropertyTransactionList {
    transactions: Vec<PropertyTransaction>,
}

impl PropertyTransactionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the value a property write is about to replace.
    pub fn add_property_transaction(
        &mut self,
        entity: EntityId,
        property_name: impl Into<String>,
        previous_value: Value,
    ) {
        let property_name = property_name.into();
        trace!(%entity, property = %property_name, "ledger: property write");
        self.transactions.push(PropertyTransaction {
            entity,
            property_name,
            previous: Previous::Value(previous_value),
        });
    }

    /// Record the state a transition is about to leave.
    pub fn add_state_transaction(&mut self, entity: EntityId, previous_state: StateId) {
        trace!(%entity, %previous_state, "ledger: state transition");
        self.transactions.push(PropertyTransaction {
            entity,
            property_name: STATE_PROPERTY.to_string(),
            previous: Previous::State(previous_state),
        });
    }

    /// Most recent record of any kind.
    pub fn last_transaction(&self) -> Option<&PropertyTransaction> {
        self.transactions.last()
    }

    /// Most recent property write, skipping transition records.
    ///
    /// Lets a state's post-change hook find which property triggered the
    /// transition it is reacting to.
    pub fn last_property_transaction(&self) -> Option<&PropertyTransaction> {
        self.transactions
            .iter()
            .rev()
            .find(|transaction| !transaction.is_state_change())
    }

    /// Property named by [`last_property_transaction`](Self::last_property_transaction).
    pub fn last_property_changed<'e>(&self, entity: &'e Entity) -> Option<&'e Property> {
        let transaction = self.last_property_transaction()?;
        if transaction.entity != entity.id() {
            return None;
        }
        entity.property(&transaction.property_name).ok()
    }

    /// Pop and undo the most recent record.
    ///
    /// `cause` is the error being handled, if any. When the undo itself
    /// fails, [`Error::Rollback`] carries both. When the undo succeeds the
    /// cause is handed back as the error; with no cause the call succeeds.
    pub fn rollback_last(&mut self, entity: &mut Entity, cause: Option<Error>) -> Result<()> {
        if let Some(transaction) = self.transactions.pop() {
            if let Err(undo) = transaction.undo(entity) {
                error!(
                    entity = %entity.name(),
                    property = %transaction.property_name,
                    error = %undo,
                    "undo of last ledger record failed"
                );
                return Err(Error::Rollback {
                    cause: cause.map(Box::new),
                    undo: Box::new(undo),
                });
            }
        }
        match cause {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }

    /// Undo every record, most recent first, leaving the ledger empty.
    ///
    /// Stops at the first record that cannot be undone; that record and the
    /// older ones stay in the ledger.
    pub fn full_rollback(&mut self, entity: &mut Entity) -> Result<()> {
        self.unwind(entity).map_err(|undo| Error::Rollback {
            cause: None,
            undo: Box::new(undo),
        })
    }

    pub(crate) fn unwind(&mut self, entity: &mut Entity) -> Result<()> {
        while let Some(transaction) = self.transactions.pop() {
            if let Err(err) = transaction.undo(entity) {
                error!(
                    entity = %entity.name(),
                    property = %transaction.property_name,
                    error = %err,
                    remaining = self.transactions.len(),
                    "ledger rollback stopped"
                );
                self.transactions.push(transaction);
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyTransaction> {
        self.transactions.iter()
    }
}
