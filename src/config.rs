//! Configuration records for properties and entities.
//!
//! Both records deserialize from JSON. Initial values are plain JSON and are
//! interpreted through the property's value-kind tag when the entity is
//! built. Hooks cannot be expressed in a document; attach them in code.

use crate::core::Hooks;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration of one property.
///
/// # Example
///
/// ```rust
/// use cascade::config::PropertyConfig;
///
/// let config: PropertyConfig = serde_json::from_str(
///     r#"{ "name": "volume", "kind": "number", "initial_value": 10 }"#,
/// ).unwrap();
///
/// assert_eq!(config.name, "volume");
/// assert!(!config.read_only);
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub name: String,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub read_once: bool,

    /// Value-kind tag: `string`, `integer`, `boolean`, `float`, `composite`
    /// (or `bigint`, `number`, `object`). Checked when the property is built.
    #[serde(alias = "type")]
    pub kind: String,

    #[serde(default)]
    pub initial_value: Option<serde_json::Value>,

    #[serde(skip)]
    pub hooks: Option<Arc<dyn Hooks>>,
}

impl PropertyConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn read_once(mut self) -> Self {
        self.read_once = true;
        self
    }

    pub fn initial(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    pub fn hooks<H: Hooks + 'static>(self, hooks: H) -> Self {
        self.shared_hooks(Arc::new(hooks))
    }

    pub fn shared_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

impl fmt::Debug for PropertyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyConfig")
            .field("name", &self.name)
            .field("read_only", &self.read_only)
            .field("read_once", &self.read_once)
            .field("kind", &self.kind)
            .field("initial_value", &self.initial_value)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Configuration of an entity: its name, the name of its initial state
/// and its properties.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    pub initial_state: String,
    #[serde(default)]
    pub properties: Vec<PropertyConfig>,
}

impl EntityConfig {
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Attach hooks to a configured property.
    pub fn attach_hooks(&mut self, property: &str, hooks: Arc<dyn Hooks>) -> Result<()> {
        let entity = &self.name;
        let config = self
            .properties
            .iter_mut()
            .find(|config| config.name == property)
            .ok_or_else(|| Error::UnknownProperty {
                entity: entity.clone(),
                property: property.to_string(),
            })?;
        config.hooks = Some(hooks);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FnHooks;
    use serde_json::json;

    const WATER: &str = r#"{
        "name": "Water",
        "initial_state": "Liquid",
        "properties": [
            { "name": "temperatureC", "kind": "number", "initial_value": 25 },
            { "name": "volume", "type": "number", "initial_value": 10, "read_once": false }
        ]
    }"#;

    #[test]
    fn entity_config_parses_from_json() {
        let config = EntityConfig::from_json(WATER).unwrap();

        assert_eq!(config.name, "Water");
        assert_eq!(config.initial_state, "Liquid");
        assert_eq!(config.properties.len(), 2);
        assert_eq!(config.properties[1].kind, "number");
        assert_eq!(config.properties[0].initial_value, Some(json!(25)));
        assert!(config.properties.iter().all(|p| p.hooks.is_none()));
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let result = EntityConfig::from_json(r#"{ "name": "Water" }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn attach_hooks_targets_named_property() {
        let mut config = EntityConfig::from_json(WATER).unwrap();

        config
            .attach_hooks("temperatureC", FnHooks::new().shared())
            .unwrap();

        assert!(config.properties[0].hooks.is_some());
        assert!(config.properties[1].hooks.is_none());
        assert!(matches!(
            config.attach_hooks("pressure", FnHooks::new().shared()),
            Err(Error::UnknownProperty { .. })
        ));
    }

    #[test]
    fn builder_methods_set_flags() {
        let config = PropertyConfig::new("serial", "integer")
            .initial(42)
            .read_only()
            .read_once();

        assert!(config.read_only);
        assert!(config.read_once);
        assert_eq!(config.initial_value, Some(json!(42)));
    }
}
