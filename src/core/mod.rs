//! Core engine types.
//!
//! This module contains the property/state/transaction engine:
//! - Typed values and access-controlled properties
//! - Frozen state nodes shared through a registry
//! - Hook capabilities for validation, state derivation and cascades
//! - The undo ledger and the entity that orchestrates writes
//! - Immutable history of state changes

mod entity;
mod history;
mod hooks;
mod property;
mod state;
mod transaction;
mod value;

pub use entity::{Entity, EntityId, STATE_PROPERTY};
pub use history::{StateHistory, StateTransition, TransitionKind};
pub use hooks::{FnHooks, Hooks, Subject};
pub use property::Property;
pub use state::{State, StateId, StateMachine};
pub use transaction::{Previous, PropertyTransaction, PropertyTransactionList};
pub use value::{Value, ValueKind};
