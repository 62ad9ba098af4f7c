//! Normalized configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A route the worker is deployed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Route {
    Simple(String),
    Pattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zone_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zone_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_domain: Option<bool>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default)]
    pub crons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageModel {
    Bundled,
    Unbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    Off,
    Smart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub mode: PlacementMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Module types a bundling rule can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleType {
    ESModule,
    CommonJS,
    CompiledWasm,
    Text,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub globs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallthrough: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableObjects {
    #[serde(default)]
    pub bindings: Vec<DurableObjectBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableObjectBinding {
    pub name: String,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvNamespace {
    pub binding: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct R2Bucket {
    pub binding: String,
    pub bucket_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_bucket_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D1Database {
    pub binding: String,
    pub database_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_database_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_internal_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizeIndex {
    pub binding: String,
    pub index_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperdrive {
    pub binding: String,
    pub id: String,
    #[serde(
        rename = "localConnectionString",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub local_connection_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub binding: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailConsumer {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// A binding that is just a name, such as `browser` or `ai`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedBinding {
    pub binding: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Queues {
    #[serde(default)]
    pub producers: Vec<QueueProducer>,
    #[serde(default)]
    pub consumers: Vec<QueueConsumer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueProducer {
    pub binding: String,
    pub queue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_delay: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConsumer {
    pub queue: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub consumer_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_queue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_timeout_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEngineDataset {
    pub binding: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchNamespace {
    pub binding: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound: Option<DispatchOutbound>,
}

/// Worker that receives outbound requests from a dispatch namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutbound {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtlsCertificate {
    pub binding: String,
    pub certificate_id: String,
}

/// Outbound email binding. Named by `name`, not `binding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_destination_addresses: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineBinding {
    pub binding: String,
    pub pipeline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedClass {
    pub from: String,
    pub to: String,
}

/// One step in the history of a worker's durable object classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_sqlite_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub renamed_classes: Vec<RenamedClass>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deleted_classes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logfwdr {
    #[serde(default)]
    pub bindings: Vec<LogfwdrBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogfwdrBinding {
    pub name: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observability {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sampling_rate: Option<f64>,
}

/// Static assets served alongside the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    pub directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_handling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_handling: Option<String>,
}

/// One fully resolved environment: the top level or a named `env.<name>` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    // Inheritable only in legacy environments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    // Inheritable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_date: Option<String>,
    #[serde(default)]
    pub compatibility_flags: Vec<String>,
    pub jsx_factory: String,
    pub jsx_fragment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers_dev: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_bundle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logpush: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_source_maps: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find_additional_modules: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_file_names: Option<bool>,
    #[serde(default)]
    pub triggers: Triggers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_model: Option<UsageModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_compat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_party_worker: Option<bool>,
    #[serde(default)]
    pub migrations: Vec<Migration>,
    #[serde(default)]
    pub logfwdr: Logfwdr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<Observability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,

    // Not inheritable
    #[serde(default)]
    pub vars: Map<String, Value>,
    #[serde(default)]
    pub define: BTreeMap<String, String>,
    #[serde(default)]
    pub durable_objects: DurableObjects,
    #[serde(default)]
    pub kv_namespaces: Vec<KvNamespace>,
    #[serde(default)]
    pub r2_buckets: Vec<R2Bucket>,
    #[serde(default)]
    pub d1_databases: Vec<D1Database>,
    #[serde(default)]
    pub vectorize: Vec<VectorizeIndex>,
    #[serde(default)]
    pub hyperdrive: Vec<Hyperdrive>,
    #[serde(default)]
    pub services: Vec<ServiceBinding>,
    #[serde(default)]
    pub tail_consumers: Vec<TailConsumer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<NamedBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<NamedBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_metadata: Option<NamedBinding>,
    #[serde(default)]
    pub queues: Queues,
    #[serde(default)]
    pub analytics_engine_datasets: Vec<AnalyticsEngineDataset>,
    #[serde(default)]
    pub dispatch_namespaces: Vec<DispatchNamespace>,
    #[serde(default)]
    pub mtls_certificates: Vec<MtlsCertificate>,
    #[serde(default)]
    pub send_email: Vec<SendEmailBinding>,
    #[serde(default)]
    pub pipelines: Vec<PipelineBinding>,
    /// Passed through untouched apart from shape checks.
    #[serde(rename = "unsafe", default)]
    pub unsafe_settings: Map<String, Value>,
}

impl Environment {
    /// Every key an environment section may contain.
    pub const FIELDS: &'static [&'static str] = &[
        "name",
        "account_id",
        "compatibility_date",
        "compatibility_flags",
        "jsx_factory",
        "jsx_fragment",
        "main",
        "tsconfig",
        "base_dir",
        "route",
        "routes",
        "workers_dev",
        "minify",
        "no_bundle",
        "logpush",
        "upload_source_maps",
        "find_additional_modules",
        "preserve_file_names",
        "triggers",
        "usage_model",
        "placement",
        "rules",
        "zone_id",
        "vars",
        "define",
        "durable_objects",
        "kv_namespaces",
        "r2_buckets",
        "d1_databases",
        "vectorize",
        "hyperdrive",
        "services",
        "tail_consumers",
        "browser",
        "ai",
        "version_metadata",
        "node_compat",
        "first_party_worker",
        "migrations",
        "logfwdr",
        "observability",
        "assets",
        "queues",
        "analytics_engine_datasets",
        "dispatch_namespaces",
        "mtls_certificates",
        "send_email",
        "pipelines",
        "unsafe",
    ];

    /// The serialized value of one field, if it is set.
    pub fn field(&self, name: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

/// Local development server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevConfig {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspector_port: Option<u16>,
    pub local_protocol: Protocol,
    pub upstream_protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: None,
            inspector_port: None,
            local_protocol: Protocol::Http,
            upstream_protocol: Protocol::Http,
            host: None,
        }
    }
}

/// The normalized configuration: top-level settings plus the active environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub legacy_env: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_metrics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_vars: Option<bool>,
    #[serde(flatten)]
    pub env: Environment,
    pub dev: DevConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<BTreeMap<String, String>>,
}

impl Config {
    /// Keys that only exist at the top level of a configuration file.
    pub const TOP_LEVEL_FIELDS: &'static [&'static str] =
        &["legacy_env", "send_metrics", "keep_vars", "dev", "alias"];
}

/// Inputs to normalization that come from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeArgs {
    /// Environment to activate
    pub env: Option<String>,
    /// Overrides `legacy_env` from the file
    pub legacy_env: Option<bool>,
    /// Default for `dev.local_protocol`
    pub local_protocol: Option<Protocol>,
    /// Default for `dev.upstream_protocol`
    pub upstream_protocol: Option<Protocol>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routes_deserialize_from_both_shapes() {
        let simple: Route = serde_json::from_value(json!("example.com/*")).unwrap();
        assert_eq!(simple, Route::Simple("example.com/*".into()));

        let pattern: Route =
            serde_json::from_value(json!({"pattern": "example.com/*", "zone_name": "example.com"})).unwrap();
        assert!(matches!(pattern, Route::Pattern { zone_name: Some(_), .. }));
    }

    #[test]
    fn field_returns_serialized_value() {
        let env = Environment {
            kv_namespaces: vec![KvNamespace {
                binding: "KV".into(),
                id: "abc".into(),
                preview_id: None,
            }],
            ..Environment::default()
        };
        assert_eq!(env.field("kv_namespaces"), Some(json!([{"binding": "KV", "id": "abc"}])));
        assert_eq!(env.field("main"), None);
    }

    #[test]
    fn fields_cover_every_serialized_key() {
        let env = Environment::default();
        let Value::Object(map) = serde_json::to_value(&env).unwrap() else {
            panic!("environment serializes to an object");
        };
        for key in map.keys() {
            assert!(Environment::FIELDS.contains(&key.as_str()), "{key} missing from FIELDS");
        }
    }
}
