//! Entities: a key plus named, typed properties.

use crate::error::DecodeError;
use crate::model::{Key, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A keyed record with a mapping of named, typed property values.
///
/// The key is optional only while an entity is being built; every entity
/// stored in or returned from a backend carries one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    key: Option<Key>,
    properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with the given key and no properties.
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key: Some(key),
            properties: BTreeMap::new(),
        }
    }

    /// Creates an entity without a key.
    #[must_use]
    pub fn unkeyed() -> Self {
        Self::default()
    }

    /// Adds a property, builder style.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Sets the key.
    pub fn set_key(&mut self, key: Key) {
        self.key = Some(key);
    }

    /// Returns a mutable reference to the key.
    pub fn key_mut(&mut self) -> Option<&mut Key> {
        self.key.as_mut()
    }

    /// Sets a property, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Returns a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Returns all properties, ordered by name.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Returns a string property.
    pub fn string(&self, name: &str) -> Result<&str, DecodeError> {
        let value = self.require(name)?;
        value
            .as_str()
            .ok_or_else(|| DecodeError::property_type(name, "string", value.type_name()))
    }

    /// Returns an integer property.
    pub fn integer(&self, name: &str) -> Result<i64, DecodeError> {
        let value = self.require(name)?;
        value
            .as_integer()
            .ok_or_else(|| DecodeError::property_type(name, "integer", value.type_name()))
    }

    fn require(&self, name: &str) -> Result<&Value, DecodeError> {
        self.properties
            .get(name)
            .ok_or_else(|| DecodeError::MissingProperty {
                name: name.to_string(),
            })
    }
}
