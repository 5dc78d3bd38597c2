//! Typed, access-controlled property cells.

use super::entity::EntityId;
use super::hooks::Hooks;
use super::value::{Value, ValueKind};
use crate::builder::BuildError;
use crate::config::PropertyConfig;
use crate::error::{Error, Result};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

/// A named value cell owned by an [`Entity`](super::Entity).
///
/// The stored value only changes through the owning entity's write path
/// ([`Entity::set_value`](super::Entity::set_value)), which runs the
/// attached [`Hooks`] and records the change in a ledger.
///
/// Access policy:
/// - read-only properties reject every write;
/// - read-once properties allow exactly one successful [`get_value`](Self::get_value).
pub struct Property {
    name: String,
    kind: ValueKind,
    value: Value,
    read_only: bool,
    read_once: bool,
    was_read: Cell<bool>,
    owner: Option<EntityId>,
    hooks: Option<Arc<dyn Hooks>>,
}

impl Property {
    /// Create a property from its configuration record.
    ///
    /// Fails on an unrecognized value-kind tag or an initial value that does
    /// not fit the kind. A missing initial value yields the kind's default.
    pub fn from_config(config: &PropertyConfig) -> std::result::Result<Self, BuildError> {
        let kind: ValueKind = config.kind.parse()?;
        let value = match &config.initial_value {
            Some(json) => Value::from_json(kind, json).ok_or_else(|| {
                BuildError::InitialValueMismatch {
                    property: config.name.clone(),
                    expected: kind,
                }
            })?,
            None => kind.default_value(),
        };

        Ok(Self {
            name: config.name.clone(),
            kind,
            value,
            read_only: config.read_only,
            read_once: config.read_once,
            was_read: Cell::new(false),
            owner: None,
            hooks: config.hooks.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_read_once(&self) -> bool {
        self.read_once
    }

    /// Whether a read-once property has already been consumed.
    pub fn was_read(&self) -> bool {
        self.was_read.get()
    }

    /// Handle of the owning entity, once attached.
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn hooks(&self) -> Option<&Arc<dyn Hooks>> {
        self.hooks.as_ref()
    }

    /// Read the value.
    ///
    /// Returns an owned copy, so callers can never reach the stored value
    /// without going through a write. A read-once property fails with
    /// [`Error::SingleRead`] after its first successful read.
    pub fn get_value(&self) -> Result<Value> {
        if self.read_once {
            if self.was_read.get() {
                return Err(Error::SingleRead {
                    property: self.name.clone(),
                });
            }
            self.was_read.set(true);
        }
        Ok(self.value.clone())
    }

    /// Bind the property to its entity. Allowed once.
    pub fn attach_owner(&mut self, owner: EntityId) -> std::result::Result<(), BuildError> {
        if self.owner.is_some() {
            return Err(BuildError::OwnerAlreadySet {
                property: self.name.clone(),
            });
        }
        self.owner = Some(owner);
        Ok(())
    }

    /// Access policy and type checks shared by forward writes and undo.
    pub(crate) fn check_write(&self, candidate: &Value) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly {
                property: self.name.clone(),
            });
        }
        if candidate.kind() != self.kind {
            return Err(Error::TypeMismatch {
                property: self.name.clone(),
                expected: self.kind,
                found: candidate.kind(),
            });
        }
        Ok(())
    }

    /// Swap in a new value, returning the previous one.
    pub(crate) fn replace(&mut self, value: Value) -> Value {
        std::mem::replace(&mut self.value, value)
    }

    /// Value for diagnostic dumps. Never consumes a read-once value.
    pub(crate) fn display_value(&self) -> String {
        if self.read_once {
            "<read once>".to_string()
        } else {
            self.value.to_string()
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("read_only", &self.read_only)
            .field("read_once", &self.read_once)
            .field("owner", &self.owner)
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.name, self.display_value())
    }
}
