//! Resource and binding types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Kinds of resource that can be bound into a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    D1,
    R2,
    Kv,
    Vectorize,
    Hyperdrive,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::D1,
        ResourceType::R2,
        ResourceType::Kv,
        ResourceType::Vectorize,
        ResourceType::Hyperdrive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::D1 => "d1",
            ResourceType::R2 => "r2",
            ResourceType::Kv => "kv",
            ResourceType::Vectorize => "vectorize",
            ResourceType::Hyperdrive => "hyperdrive",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedResourceType {
                resource_type: s.to_string(),
            })
    }
}

/// A resource the caller wants to bind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBinding {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Identifier of the resource (database id, bucket name, namespace id, ...)
    pub id: String,
    /// Human-readable resource name
    pub name: String,
    /// Suggested binding name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    /// Extra keys merged into the generated binding entry
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_config: Map<String, Value>,
}

impl ResourceBinding {
    pub fn new(resource_type: ResourceType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
            name: name.into(),
            binding: None,
            additional_config: Map::new(),
        }
    }

    /// Suggest a binding name (builder pattern).
    pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
        self.binding = Some(binding.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional_config.insert(key.into(), value);
        self
    }
}
