//! Cascade: entities, typed properties and finite state machines.
//!
//! An entity is a named bundle of properties plus a current state drawn from
//! a shared state machine. Writing a property can derive a new state, and
//! entering a state can write further properties. Every change of such a
//! cascade is recorded in a ledger so the whole chain can be undone in
//! reverse order when any step fails.
//!
//! # Core Concepts
//!
//! - **Property**: a typed value with an access policy (read-only, read-once)
//! - **State**: a node of a state machine naming the values it may move to
//! - **Hooks**: optional derive / validate / post-change rules
//! - **Ledger**: the [`PropertyTransactionList`] recording previous values
//!
//! # Example
//!
//! ```rust
//! use cascade::config::PropertyConfig;
//! use cascade::{state_machine, Entity, Error, FnHooks};
//!
//! let machine = state_machine! {
//!     Idle => [Busy],
//!     Busy => [Idle],
//! }
//! .unwrap();
//! let idle = machine.find("Idle").unwrap();
//! let busy = machine.find("Busy").unwrap();
//!
//! // Any positive load means the worker is busy.
//! let load = FnHooks::new().derive(move |_, property| {
//!     let load = property.get_value()?.as_i64().unwrap_or_default();
//!     Ok(Some(if load > 0 { busy } else { idle }))
//! });
//!
//! let mut worker = Entity::new(
//!     "Worker",
//!     machine,
//!     idle,
//!     &[PropertyConfig::new("load", "integer").initial(0).hooks(load)],
//! )
//! .unwrap();
//!
//! worker.write("load", 3).unwrap();
//! assert_eq!(worker.get_state(), "Busy");
//!
//! worker.write("load", 0).unwrap();
//! assert_eq!(worker.get_state(), "Idle");
//! assert_eq!(worker.history().get_path().len(), 3);
//!
//! let err = worker.write("load", "many").unwrap_err();
//! assert!(matches!(err, Error::TypeMismatch { .. }));
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod water;

pub use builder::{BuildError, StateBuilder, StateMachineBuilder};
pub use config::{EntityConfig, PropertyConfig};
pub use core::{
    Entity, EntityId, FnHooks, Hooks, Property, PropertyTransaction, PropertyTransactionList,
    State, StateHistory, StateId, StateMachine, Subject, Value, ValueKind,
};
pub use error::{Error, Result, TransitionError};
