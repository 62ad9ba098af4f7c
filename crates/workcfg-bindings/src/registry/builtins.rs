//! Built-in resource types

use serde_json::{Map, Value, json};

use super::RegistryEntry;
use crate::types::{ResourceBinding, ResourceType};

/// Number of built-in resource types.
pub const BUILTIN_COUNT: usize = 5;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn d1_config(resource: &ResourceBinding, binding: &str) -> Map<String, Value> {
    object(json!({
        "binding": binding,
        "database_name": resource.name,
        "database_id": resource.id,
    }))
}

fn r2_config(resource: &ResourceBinding, binding: &str) -> Map<String, Value> {
    object(json!({"binding": binding, "bucket_name": resource.id}))
}

fn kv_config(resource: &ResourceBinding, binding: &str) -> Map<String, Value> {
    object(json!({"binding": binding, "id": resource.id}))
}

fn vectorize_config(resource: &ResourceBinding, binding: &str) -> Map<String, Value> {
    object(json!({"binding": binding, "index_name": resource.id}))
}

fn hyperdrive_config(resource: &ResourceBinding, binding: &str) -> Map<String, Value> {
    object(json!({"binding": binding, "id": resource.id}))
}

/// Returns the registry entries for every [`ResourceType`].
pub fn builtin_entries() -> Vec<RegistryEntry> {
    vec![
        RegistryEntry {
            resource_type: ResourceType::D1,
            config_key: "d1_databases",
            identifier_field: "database_id",
            generic_name: "DB",
            create_config: d1_config,
        },
        RegistryEntry {
            resource_type: ResourceType::R2,
            config_key: "r2_buckets",
            identifier_field: "bucket_name",
            generic_name: "BUCKET",
            create_config: r2_config,
        },
        RegistryEntry {
            resource_type: ResourceType::Kv,
            config_key: "kv_namespaces",
            identifier_field: "id",
            generic_name: "KV",
            create_config: kv_config,
        },
        RegistryEntry {
            resource_type: ResourceType::Vectorize,
            config_key: "vectorize",
            identifier_field: "index_name",
            generic_name: "VECTORIZE",
            create_config: vectorize_config,
        },
        RegistryEntry {
            resource_type: ResourceType::Hyperdrive,
            config_key: "hyperdrive",
            identifier_field: "id",
            generic_name: "HYPERDRIVE",
            create_config: hyperdrive_config,
        },
    ]
}
