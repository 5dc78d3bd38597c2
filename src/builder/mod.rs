//! Builder API for state nodes and state machines.
//!
//! This module provides fluent builders and a macro for declaring FSM shapes
//! with minimal boilerplate. Builders are consumed when built, and setup
//! checks report every violation at once.

pub mod error;
pub mod machine;
pub mod macros;
pub mod state;

pub use error::BuildError;
pub use machine::StateMachineBuilder;
pub use state::StateBuilder;
