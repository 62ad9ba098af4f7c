//! Registry of bindable resource types
//!
//! Each entry knows where bindings of its type live in a configuration
//! (`config_key`), which field identifies the underlying resource, and how to
//! build a binding entry for a new resource.

mod builtins;

pub use builtins::{BUILTIN_COUNT, builtin_entries};

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{ResourceBinding, ResourceType};

/// Builds the canonical binding object for a resource.
pub type CreateConfigFn = fn(&ResourceBinding, &str) -> Map<String, Value>;

/// How one resource type is represented in a configuration.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub resource_type: ResourceType,
    /// Top-level array holding bindings of this type (e.g. `kv_namespaces`)
    pub config_key: &'static str,
    /// Field inside a binding that identifies the resource
    pub identifier_field: &'static str,
    /// Binding name used when the caller does not suggest one
    pub generic_name: &'static str,
    pub create_config: CreateConfigFn,
}

/// Lookup table from resource type to its [`RegistryEntry`].
#[derive(Debug, Clone)]
pub struct BindingRegistry {
    entries: BTreeMap<ResourceType, RegistryEntry>,
}

impl BindingRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create a registry with every built-in resource type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for entry in builtin_entries() {
            registry.register(entry);
        }
        registry
    }

    pub fn register(&mut self, entry: RegistryEntry) {
        self.entries.insert(entry.resource_type, entry);
    }

    pub fn get(&self, resource_type: ResourceType) -> Option<&RegistryEntry> {
        self.entries.get(&resource_type)
    }

    /// Like [`get`](Self::get), but an unregistered type is an error.
    pub fn entry(&self, resource_type: ResourceType) -> Result<&RegistryEntry> {
        self.get(resource_type).ok_or_else(|| Error::UnsupportedResourceType {
            resource_type: resource_type.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Build the binding object for `resource` under `binding_name`.
    ///
    /// `additional_config` is merged after the canonical keys.
    pub fn create_binding_config(&self, resource: &ResourceBinding, binding_name: &str) -> Result<Map<String, Value>> {
        let entry = self.entry(resource.resource_type)?;
        let mut config = (entry.create_config)(resource, binding_name);
        for (key, value) in &resource.additional_config {
            config.insert(key.clone(), value.clone());
        }
        Ok(config)
    }

    /// The existing binding entry for `resource`, if the configuration already has one.
    pub fn find_existing<'c>(
        &self,
        config: &'c Map<String, Value>,
        resource: &ResourceBinding,
    ) -> Result<Option<&'c Map<String, Value>>> {
        let entry = self.entry(resource.resource_type)?;
        let existing = config
            .get(entry.config_key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .find(|binding| binding.get(entry.identifier_field).and_then(Value::as_str) == Some(resource.id.as_str()));
        Ok(existing)
    }

    /// Whether `config` already binds the resource identified by `resource.id`.
    pub fn resource_already_exists(&self, config: &Map<String, Value>, resource: &ResourceBinding) -> Result<bool> {
        Ok(self.find_existing(config, resource)?.is_some())
    }

    /// Every binding name used by a known resource array, uppercased.
    pub fn get_all_existing_binding_names(&self, config: &Map<String, Value>) -> BTreeSet<String> {
        self.iter()
            .filter_map(|entry| config.get(entry.config_key).and_then(Value::as_array))
            .flatten()
            .filter_map(|binding| binding.get("binding").and_then(Value::as_str))
            .map(str::to_uppercase)
            .collect()
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
