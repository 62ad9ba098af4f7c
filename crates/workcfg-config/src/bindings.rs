//! Validators for binding fields
//!
//! Bindings expose a resource to the worker under a name. Each kind has its
//! own element validator; arrays and `{bindings: [...]}` containers wrap them
//! and warn when a named environment drops a binding the top level declares.

use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::types::Environment;
use crate::validation::{
    JsonType, get_binding_names, get_defined, is_optional_property, is_required_property, json,
    validate_additional_properties, validate_optional_property, validate_optional_typed_array,
    validate_required_property, validate_typed_array, validate_unique_name_property,
};

/// Validator for a single element of a binding collection.
pub type BindingValidator = fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool;

/// `field` at the top level, `env.<name>.field` inside a named environment.
pub(crate) fn field_path(env_name: &str, field: &str, top: Option<&Environment>) -> String {
    match top {
        None => field.to_string(),
        Some(_) => format!("env.{env_name}.{field}"),
    }
}

fn warn_missing_bindings(d: &mut Diagnostics, env_name: &str, field: &str, target: &str, missing: &[String]) {
    if missing.is_empty() {
        return;
    }
    let list: Vec<String> = missing.iter().map(|name| format!("- {name}")).collect();
    d.warn(format!(
        "The following bindings are at the top level, but not on \"env.{env_name}\".\n\
         This is not what you probably want, since \"{field}\" configuration is not inherited by environments.\n\
         Please add a binding for each to \"{target}\":\n{}",
        list.join("\n")
    ));
}

fn missing_names(top: Option<&Environment>, field: &str, env_value: &Value) -> Vec<String> {
    let Some(top) = top else {
        return Vec::new();
    };
    let top_names = get_binding_names(top.field(field).as_ref());
    let env_names = get_binding_names(Some(env_value));
    top_names.into_iter().filter(|name| !env_names.contains(name)).collect()
}

/// Validate an array of bindings element by element.
pub fn validate_binding_array(
    env_name: &str,
    validate_binding: BindingValidator,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let path = field_path(env_name, field, top);
        let Some(items) = value.as_array() else {
            d.error(format!("The field \"{path}\" should be an array but got {value}."));
            return false;
        };
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            valid = validate_binding(d, &format!("{path}[{i}]"), Some(item), top) && valid;
        }
        let missing = missing_names(top, field, value);
        warn_missing_bindings(d, env_name, field, &path, &missing);
        valid
    }
}

/// Validate a `{bindings: [...]}` container, one child node per binding.
pub fn validate_bindings_property(
    env_name: &str,
    validate_binding: BindingValidator,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let path = field_path(env_name, field, top);
        let mut valid = true;
        match value.as_object() {
            None => {
                d.error(format!("The field \"{path}\" should be an object but got {value}."));
                valid = false;
            }
            Some(container) => match container.get("bindings") {
                None => {
                    d.error(format!("The field \"{path}\" is missing the required \"bindings\" property."));
                    valid = false;
                }
                Some(Value::Array(bindings)) => {
                    for (i, binding) in bindings.iter().enumerate() {
                        let binding_path = format!("{path}.bindings[{i}]");
                        let mut child = Diagnostics::new(format!("\"{binding_path}\": {binding}"));
                        valid = validate_binding(&mut child, &binding_path, Some(binding), top) && valid;
                        d.add_child(child);
                    }
                    valid = validate_unique_name_property(d, &format!("{path}.bindings"), container.get("bindings"), top)
                        && valid;
                }
                Some(other) => {
                    d.error(format!("The field \"{path}.bindings\" should be an array but got {other}."));
                    valid = false;
                }
            },
        }
        if valid {
            let missing = missing_names(top, field, value);
            warn_missing_bindings(d, env_name, field, &format!("{path}.bindings"), &missing);
        }
        valid
    }
}

pub fn validate_durable_object_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    let Some(binding) = value.and_then(Value::as_object) else {
        d.error(format!("Expected \"{field}\" to be an object but got {}", json(value)));
        return false;
    };
    let mut valid = true;
    if !is_required_property(binding, "name", JsonType::String, None) {
        d.error("binding should have a string \"name\" field.");
        valid = false;
    }
    if !is_required_property(binding, "class_name", JsonType::String, None) {
        d.error("binding should have a string \"class_name\" field.");
        valid = false;
    }
    if !is_optional_property(binding, "script_name", JsonType::String) {
        d.error("the field \"script_name\", when present, should be a string.");
        valid = false;
    }
    if !is_optional_property(binding, "environment", JsonType::String) {
        d.error("the field \"environment\", when present, should be a string.");
        valid = false;
    }
    if binding.contains_key("environment") && !binding.contains_key("script_name") {
        d.error("binding should have a \"script_name\" field if \"environment\" is present.");
        valid = false;
    }
    validate_additional_properties(
        d,
        field,
        binding.keys().map(String::as_str),
        ["class_name", "environment", "name", "script_name"],
    );
    valid
}

#[derive(Clone, Copy)]
enum Requirement {
    Required,
    NonEmpty,
    Optional,
    OptionalNonEmpty,
    OptionalOf(JsonType),
}

struct PropertyCheck {
    key: &'static str,
    requirement: Requirement,
    expectation: &'static str,
}

/// Shape of a resource binding that lives in an array of objects.
struct ResourceShape {
    kind: &'static str,
    checks: &'static [PropertyCheck],
    known: Option<&'static [&'static str]>,
}

const BINDING_CHECK: PropertyCheck = PropertyCheck {
    key: "binding",
    requirement: Requirement::Required,
    expectation: "should have a string \"binding\" field",
};

const KV_NAMESPACE: ResourceShape = ResourceShape {
    kind: "kv_namespaces",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "id",
            requirement: Requirement::NonEmpty,
            expectation: "should have a string \"id\" field",
        },
        PropertyCheck {
            key: "preview_id",
            requirement: Requirement::Optional,
            expectation: "should, optionally, have a string \"preview_id\" field",
        },
    ],
    known: Some(&["binding", "id", "preview_id"]),
};

const R2_BUCKET: ResourceShape = ResourceShape {
    kind: "r2_buckets",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "bucket_name",
            requirement: Requirement::NonEmpty,
            expectation: "should have a string \"bucket_name\" field",
        },
        PropertyCheck {
            key: "preview_bucket_name",
            requirement: Requirement::Optional,
            expectation: "should, optionally, have a string \"preview_bucket_name\" field",
        },
        PropertyCheck {
            key: "jurisdiction",
            requirement: Requirement::Optional,
            expectation: "should, optionally, have a string \"jurisdiction\" field",
        },
    ],
    known: Some(&["binding", "bucket_name", "preview_bucket_name", "jurisdiction"]),
};

const D1_DATABASE: ResourceShape = ResourceShape {
    kind: "d1_databases",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "database_id",
            requirement: Requirement::Required,
            expectation: "must have a \"database_id\" field",
        },
        PropertyCheck {
            key: "preview_database_id",
            requirement: Requirement::Optional,
            expectation: "should, optionally, have a string \"preview_database_id\" field",
        },
    ],
    known: Some(&[
        "binding",
        "database_id",
        "database_internal_env",
        "database_name",
        "migrations_dir",
        "migrations_table",
        "preview_database_id",
    ]),
};

const VECTORIZE_INDEX: ResourceShape = ResourceShape {
    kind: "vectorize",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "index_name",
            requirement: Requirement::Required,
            expectation: "must have an \"index_name\" field",
        },
    ],
    known: Some(&["binding", "index_name"]),
};

const HYPERDRIVE: ResourceShape = ResourceShape {
    kind: "hyperdrive",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "id",
            requirement: Requirement::Required,
            expectation: "must have a \"id\" field",
        },
    ],
    known: Some(&["binding", "id", "localConnectionString"]),
};

const SERVICE: ResourceShape = ResourceShape {
    kind: "services",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "service",
            requirement: Requirement::Required,
            expectation: "should have a string \"service\" field",
        },
        PropertyCheck {
            key: "environment",
            requirement: Requirement::Optional,
            expectation: "should have a string \"environment\" field",
        },
        PropertyCheck {
            key: "entrypoint",
            requirement: Requirement::Optional,
            expectation: "should have a string \"entrypoint\" field",
        },
    ],
    known: None,
};

const ANALYTICS_ENGINE_DATASET: ResourceShape = ResourceShape {
    kind: "analytics_engine",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "dataset",
            requirement: Requirement::OptionalNonEmpty,
            expectation: "should, optionally, have a string \"dataset\" field",
        },
    ],
    known: Some(&["binding", "dataset"]),
};

const MTLS_CERTIFICATE: ResourceShape = ResourceShape {
    kind: "mtls_certificates",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "certificate_id",
            requirement: Requirement::NonEmpty,
            expectation: "should have a string \"certificate_id\" field",
        },
    ],
    known: Some(&["binding", "certificate_id"]),
};

const PIPELINE: ResourceShape = ResourceShape {
    kind: "pipeline",
    checks: &[
        PropertyCheck {
            key: "binding",
            requirement: Requirement::Required,
            expectation: "must have a string \"binding\" field",
        },
        PropertyCheck {
            key: "pipeline",
            requirement: Requirement::Required,
            expectation: "must have a string \"pipeline\" field",
        },
    ],
    known: Some(&["binding", "pipeline"]),
};

const SEND_EMAIL: ResourceShape = ResourceShape {
    kind: "send_email",
    checks: &[
        PropertyCheck {
            key: "name",
            requirement: Requirement::Required,
            expectation: "should have a string \"name\" field",
        },
        PropertyCheck {
            key: "destination_address",
            requirement: Requirement::Optional,
            expectation: "should, optionally, have a string \"destination_address\" field",
        },
        PropertyCheck {
            key: "allowed_destination_addresses",
            requirement: Requirement::OptionalOf(JsonType::Array),
            expectation: "should, optionally, have a []string \"allowed_destination_addresses\" field",
        },
    ],
    known: Some(&["allowed_destination_addresses", "destination_address", "name", "binding"]),
};

// Unknown keys are rejected before this runs.
const QUEUE_PRODUCER: ResourceShape = ResourceShape {
    kind: "queue",
    checks: &[
        BINDING_CHECK,
        PropertyCheck {
            key: "queue",
            requirement: Requirement::NonEmpty,
            expectation: "should have a string \"queue\" field",
        },
        PropertyCheck {
            key: "delivery_delay",
            requirement: Requirement::OptionalOf(JsonType::Number),
            expectation: "should, optionally, have a number \"delivery_delay\" field",
        },
    ],
    known: None,
};

fn validate_resource(shape: &ResourceShape, d: &mut Diagnostics, field: &str, value: Option<&Value>) -> bool {
    let Some(binding) = value.and_then(Value::as_object) else {
        d.error(format!(
            "\"{}\" bindings should be objects, but got {}",
            shape.kind,
            json(value)
        ));
        return false;
    };
    let mut valid = true;
    for check in shape.checks {
        let ok = match check.requirement {
            Requirement::Required => is_required_property(binding, check.key, JsonType::String, None),
            Requirement::NonEmpty => binding
                .get(check.key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty()),
            Requirement::Optional => is_optional_property(binding, check.key, JsonType::String),
            Requirement::OptionalNonEmpty => match get_defined(binding, check.key) {
                None => true,
                Some(v) => v.as_str().is_some_and(|s| !s.is_empty()),
            },
            Requirement::OptionalOf(ty) => is_optional_property(binding, check.key, ty),
        };
        if !ok {
            d.error(format!(
                "\"{field}\" bindings {} but got {}.",
                check.expectation,
                Value::Object(binding.clone())
            ));
            valid = false;
        }
    }
    if let Some(known) = shape.known {
        validate_additional_properties(d, field, binding.keys().map(String::as_str), known.iter().copied());
    }
    valid
}

pub fn validate_kv_binding(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    validate_resource(&KV_NAMESPACE, d, field, value)
}

pub fn validate_r2_binding(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    validate_resource(&R2_BUCKET, d, field, value)
}

pub fn validate_d1_binding(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    validate_resource(&D1_DATABASE, d, field, value)
}

pub fn validate_vectorize_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    validate_resource(&VECTORIZE_INDEX, d, field, value)
}

pub fn validate_hyperdrive_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    validate_resource(&HYPERDRIVE, d, field, value)
}

pub fn validate_service_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    validate_resource(&SERVICE, d, field, value)
}

pub fn validate_analytics_engine_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    validate_resource(&ANALYTICS_ENGINE_DATASET, d, field, value)
}

pub fn validate_mtls_certificate_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    validate_resource(&MTLS_CERTIFICATE, d, field, value)
}

pub fn validate_pipeline_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    validate_resource(&PIPELINE, d, field, value)
}

/// A send-email binding may pin one destination or allow a list, not both.
pub fn validate_send_email_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    let mut valid = validate_resource(&SEND_EMAIL, d, field, value);
    if let Some(binding) = value.and_then(Value::as_object)
        && binding.contains_key("destination_address")
        && binding.contains_key("allowed_destination_addresses")
    {
        d.error(format!(
            "\"{field}\" bindings should have either a \"destination_address\" or \"allowed_destination_addresses\" field, but not both."
        ));
        valid = false;
    }
    valid
}

pub fn validate_queue_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    let Some(binding) = value.and_then(Value::as_object) else {
        d.error(format!("\"queue\" bindings should be objects, but got {}", json(value)));
        return false;
    };
    if !validate_additional_properties(
        d,
        field,
        binding.keys().map(String::as_str),
        ["binding", "queue", "delivery_delay"],
    ) {
        return false;
    }
    validate_resource(&QUEUE_PRODUCER, d, field, value)
}

const CONSUMER_OPTIONS: &[(&str, JsonType)] = &[
    ("type", JsonType::String),
    ("max_batch_size", JsonType::Number),
    ("max_batch_timeout", JsonType::Number),
    ("max_retries", JsonType::Number),
    ("dead_letter_queue", JsonType::String),
    ("max_concurrency", JsonType::Number),
    ("visibility_timeout_ms", JsonType::Number),
    ("retry_delay", JsonType::Number),
];

fn validate_queue_consumer(d: &mut Diagnostics, field: &str, value: &Value) -> bool {
    let Some(consumer) = value.as_object() else {
        d.error(format!("\"{field}\" should be an object, but got {value}"));
        return false;
    };
    let known = std::iter::once("queue").chain(CONSUMER_OPTIONS.iter().map(|(key, _)| *key));
    let mut valid = validate_additional_properties(d, field, consumer.keys().map(String::as_str), known);
    if !is_required_property(consumer, "queue", JsonType::String, None) {
        d.error(format!("\"{field}\" should have a string \"queue\" field but got {value}."));
        valid = false;
    }
    for &(key, ty) in CONSUMER_OPTIONS {
        if !is_optional_property(consumer, key, ty) {
            d.error(format!(
                "\"{field}\" should, optionally, have a {} \"{key}\" field but got {value}.",
                ty.as_str()
            ));
            valid = false;
        }
    }
    valid
}

/// `{producers: [...], consumers: [...]}`; producers are bindings, consumers are not.
pub fn validate_queues(
    env_name: &str,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let path = field_path(env_name, field, top);
        let Some(queues) = value.as_object() else {
            d.error(format!("The field \"{path}\" should be an object but got {value}."));
            return false;
        };
        let mut valid = validate_additional_properties(
            d,
            &path,
            queues.keys().map(String::as_str),
            ["consumers", "producers"],
        );
        if let Some(consumers) = get_defined(queues, "consumers") {
            match consumers.as_array() {
                None => {
                    d.error(format!("The field \"{path}.consumers\" should be an array but got {consumers}."));
                    valid = false;
                }
                Some(consumers) => {
                    for (i, consumer) in consumers.iter().enumerate() {
                        valid = validate_queue_consumer(d, &format!("{path}.consumers[{i}]"), consumer) && valid;
                    }
                }
            }
        }
        if let Some(producers) = get_defined(queues, "producers") {
            let validate = validate_binding_array(env_name, validate_queue_binding);
            valid = validate(d, &format!("{field}.producers"), Some(producers), top) && valid;
        }
        valid
    }
}

pub fn validate_dispatch_namespace_binding(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    let Some(binding) = value.and_then(Value::as_object) else {
        d.error(format!("\"{field}\" binding should be objects, but got {}", json(value)));
        return false;
    };
    let mut valid = true;
    for key in ["binding", "namespace"] {
        if !is_required_property(binding, key, JsonType::String, None) {
            d.error(format!(
                "\"{field}\" should have a string \"{key}\" field but got {}.",
                Value::Object(binding.clone())
            ));
            valid = false;
        }
    }
    if let Some(outbound) = get_defined(binding, "outbound")
        && !validate_dispatch_outbound(d, &format!("{field}.outbound"), outbound)
    {
        d.error(format!("\"{field}\" has an invalid outbound definition."));
        valid = false;
    }
    valid
}

fn validate_dispatch_outbound(d: &mut Diagnostics, field: &str, value: &Value) -> bool {
    let Some(outbound) = value.as_object() else {
        d.error(format!("\"{field}\" should be an object, but got {value}"));
        return false;
    };
    validate_required_property(d, field, "service", get_defined(outbound, "service"), JsonType::String, None)
        && validate_optional_property(
            d,
            field,
            "environment",
            get_defined(outbound, "environment"),
            JsonType::String,
            None,
        )
        && validate_optional_typed_array(
            d,
            &format!("{field}.parameters"),
            get_defined(outbound, "parameters"),
            JsonType::String,
        )
}

fn validate_logfwdr_binding(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    let Some(binding) = value.and_then(Value::as_object) else {
        d.error(format!("Expected \"{field}\" to be an object but got {}", json(value)));
        return false;
    };
    let mut valid = true;
    for key in ["name", "destination"] {
        if !is_required_property(binding, key, JsonType::String, None) {
            d.error(format!("binding should have a string \"{key}\" field."));
            valid = false;
        }
    }
    validate_additional_properties(d, field, binding.keys().map(String::as_str), ["destination", "name"]);
    valid
}

pub fn validate_logfwdr(
    env_name: &str,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let validate = validate_bindings_property(env_name, validate_logfwdr_binding);
        if !validate(d, field, value, top) {
            return false;
        }
        if value.and_then(|v| v.get("schema")).is_some() {
            d.error(format!(
                "\"{field}\" binding \"schema\" property has been replaced with the \"unsafe.capnp\" object, \
                 which expects a \"base_path\" and an array of \"source_schemas\" to compile, or a \"compiled_schema\" property."
            ));
            return false;
        }
        true
    }
}

/// Binding types that have a dedicated, checked configuration field.
const SUPPORTED_BINDING_TYPES: &[&str] = &[
    "plain_text",
    "secret_text",
    "json",
    "wasm_module",
    "data_blob",
    "text_blob",
    "browser",
    "ai",
    "kv_namespace",
    "durable_object_namespace",
    "d1_database",
    "r2_bucket",
    "service",
    "logfwdr",
    "mtls_certificate",
    "pipeline",
];

fn validate_unsafe_binding(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    let Some(binding) = value.and_then(Value::as_object) else {
        d.error(format!("Expected {field} to be an object but got {}.", json(value)));
        return false;
    };
    let mut valid = true;
    let has_name = is_required_property(binding, "name", JsonType::String, None);
    if !has_name {
        d.error("binding should have a string \"name\" field.");
        valid = false;
    }
    match get_defined(binding, "type").and_then(Value::as_str) {
        Some(binding_type) => {
            if SUPPORTED_BINDING_TYPES.contains(&binding_type) {
                d.warn(format!(
                    "The binding type \"{binding_type}\" is directly supported.\n\
                     Consider migrating this unsafe binding to the dedicated format for \"{binding_type}\" bindings."
                ));
            }
            if binding_type == "metadata" && has_name {
                d.warn(
                    "The deployment object in the metadata binding is now deprecated. \
                     Please switch to the version_metadata binding for access to version specific fields.",
                );
            }
        }
        None => {
            d.error("binding should have a string \"type\" field.");
            valid = false;
        }
    }
    valid
}

/// `unsafe` must carry at least one of `bindings`, `metadata` or `capnp`.
pub fn validate_unsafe_settings(
    env_name: &str,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let path = field_path(env_name, field, top);
        let Some(settings) = value.as_object() else {
            d.error(format!("The field \"{path}\" should be an object but got {value}."));
            return false;
        };
        if ["bindings", "metadata", "capnp"].iter().all(|key| !settings.contains_key(*key)) {
            d.error(format!(
                "The field \"{path}\" should contain at least one of \"bindings\", \"metadata\" or \"capnp\" properties but got {value}."
            ));
            return false;
        }
        if get_defined(settings, "bindings").is_some() {
            let validate = validate_bindings_property(env_name, validate_unsafe_binding);
            if !validate(d, field, Some(value), top) {
                return false;
            }
        }
        if let Some(metadata) = get_defined(settings, "metadata")
            && !metadata.is_object()
        {
            d.error(format!("The field \"{path}.metadata\" should be an object but got {metadata}."));
            return false;
        }
        match get_defined(settings, "capnp") {
            None => true,
            Some(capnp) => validate_capnp(d, &format!("{path}.capnp"), capnp),
        }
    }
}

/// Either a precompiled schema, or a base path plus the sources to compile.
fn validate_capnp(d: &mut Diagnostics, path: &str, value: &Value) -> bool {
    let Some(capnp) = value.as_object() else {
        d.error(format!("The field \"{path}\" should be an object but got {value}."));
        return false;
    };
    if let Some(compiled) = capnp.get("compiled_schema") {
        if capnp.contains_key("base_path") || capnp.contains_key("source_schemas") {
            d.error(format!(
                "The field \"{path}\" cannot contain both \"compiled_schema\" and one of \"base_path\" or \"source_schemas\"."
            ));
            return false;
        }
        if !compiled.is_string() {
            d.error(format!(
                "The field \"{path}.compiled_schema\", when present, should be a string but got {compiled}."
            ));
            return false;
        }
        return true;
    }
    let mut valid = true;
    if !is_required_property(capnp, "base_path", JsonType::String, None) {
        d.error(format!(
            "The field \"{path}.base_path\", when present, should be a string but got {}",
            json(capnp.get("base_path"))
        ));
        valid = false;
    }
    validate_typed_array(d, &format!("{path}.source_schemas"), get_defined(capnp, "source_schemas"), JsonType::String)
        && valid
}

/// A single `{binding}` object such as `browser` or `ai`.
///
/// With `strict`, unknown keys are warned about.
pub fn validate_named_binding(
    env_name: &str,
    strict: bool,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let Some(binding) = value.as_object() else {
            d.error(format!(
                "The field \"{}\" should be an object but got {value}.",
                field_path(env_name, field, top)
            ));
            return false;
        };
        let mut valid = true;
        if !is_required_property(binding, "binding", JsonType::String, None) {
            d.error("binding should have a string \"binding\" field.");
            valid = false;
        }
        if strict {
            validate_additional_properties(d, field, binding.keys().map(String::as_str), ["binding"]);
        }
        valid
    }
}

pub fn validate_tail_consumers(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    let Some(value) = value else {
        return true;
    };
    let Some(items) = value.as_array() else {
        d.error(format!("Expected \"{field}\" to be an array but got {value}."));
        return false;
    };
    let mut valid = true;
    for (i, item) in items.iter().enumerate() {
        let path = format!("{field}[{i}]");
        let Some(consumer) = item.as_object() else {
            d.error(format!("\"{path}\" should be an object but got {item}."));
            valid = false;
            continue;
        };
        let service = consumer.get("service").filter(|v| !v.is_null());
        let environment = consumer.get("environment").filter(|v| !v.is_null());
        valid = validate_required_property(d, &path, "service", service, JsonType::String, None)
            && validate_optional_property(d, &path, "environment", environment, JsonType::String, None)
            && valid;
    }
    valid
}

/// Binding kinds that share the worker's name space, with display names.
const BINDING_KINDS: &[(&str, &str)] = &[
    ("durable_objects", "Durable Object"),
    ("kv_namespaces", "KV Namespace"),
    ("r2_buckets", "R2 Bucket"),
    ("analytics_engine_datasets", "Analytics Engine Dataset"),
    ("d1_databases", "D1 Database"),
    ("vectorize", "Vectorize Index"),
    ("hyperdrive", "Hyperdrive Config"),
    ("services", "Service"),
    ("browser", "Browser"),
    ("ai", "AI"),
    ("version_metadata", "Version Metadata"),
    ("vars", "Environment Variable"),
    ("define", "Definition"),
];

/// "A", "A and B", "A, B, and C".
fn english_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => (*one).to_string(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

/// Every binding name must be used by only one binding across all kinds.
pub fn validate_bindings_have_unique_names(d: &mut Diagnostics, env: &Environment) -> bool {
    let mut by_name: Vec<(String, Vec<&str>)> = Vec::new();
    for &(field, kind) in BINDING_KINDS {
        for name in get_binding_names(env.field(field).as_ref()) {
            match by_name.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, kinds)) => kinds.push(kind),
                None => by_name.push((name, vec![kind])),
            }
        }
    }

    let mut has_duplicates = false;
    for (name, kinds) in &by_name {
        if kinds.len() < 2 {
            continue;
        }
        has_duplicates = true;

        let mut distinct: Vec<&str> = Vec::new();
        let mut repeated: Vec<&str> = Vec::new();
        for &kind in kinds {
            if !distinct.contains(&kind) {
                distinct.push(kind);
            } else if !repeated.contains(&kind) {
                repeated.push(kind);
            }
        }
        if distinct.len() > 1 {
            d.error(format!("{name} assigned to {} bindings.", english_list(&distinct)));
        }
        for kind in repeated {
            d.error(format!("{name} assigned to multiple {kind} bindings."));
        }
    }

    if has_duplicates {
        d.error(
            "Bindings must have unique names, so that they can all be referenced in the worker.\n\
             Please change your bindings to have unique names.",
        );
    }
    !has_duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KvNamespace, NamedBinding};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn top_with_kv(names: &[&str]) -> Environment {
        Environment {
            kv_namespaces: names
                .iter()
                .map(|name| KvNamespace {
                    binding: (*name).into(),
                    id: "id".into(),
                    preview_id: None,
                })
                .collect(),
            ..Environment::default()
        }
    }

    #[test]
    fn kv_binding_requires_non_empty_id() {
        let mut d = Diagnostics::new("test");
        let ok = validate_kv_binding(&mut d, "kv_namespaces[0]", Some(&json!({"binding": "KV", "id": ""})), None);
        assert!(!ok);
        assert_eq!(
            d.errors,
            vec!["\"kv_namespaces[0]\" bindings should have a string \"id\" field but got {\"binding\":\"KV\",\"id\":\"\"}."]
        );
    }

    #[test]
    fn resource_binding_must_be_object() {
        let mut d = Diagnostics::new("test");
        assert!(!validate_r2_binding(&mut d, "r2_buckets[0]", Some(&json!("bucket")), None));
        assert_eq!(d.errors, vec!["\"r2_buckets\" bindings should be objects, but got \"bucket\""]);
    }

    #[test]
    fn resource_binding_warns_on_unknown_keys() {
        let mut d = Diagnostics::new("test");
        let ok = validate_vectorize_binding(
            &mut d,
            "vectorize[0]",
            Some(&json!({"binding": "V", "index_name": "idx", "dimensions": 3})),
            None,
        );
        assert!(ok);
        assert_eq!(d.warnings, vec!["Unexpected fields found in vectorize[0] field: \"dimensions\""]);
    }

    #[test]
    fn binding_array_reports_missing_top_level_bindings_once() {
        let top = top_with_kv(&["A", "B", "C"]);
        let mut d = Diagnostics::new("test");
        let validate = validate_binding_array("staging", validate_kv_binding);
        let ok = validate(&mut d, "kv_namespaces", Some(&json!([{"binding": "B", "id": "x"}])), Some(&top));
        assert!(ok);
        assert_eq!(
            d.warnings,
            vec![
                "The following bindings are at the top level, but not on \"env.staging\".\n\
                 This is not what you probably want, since \"kv_namespaces\" configuration is not inherited by environments.\n\
                 Please add a binding for each to \"env.staging.kv_namespaces\":\n- A\n- C"
            ]
        );
    }

    #[test]
    fn binding_array_rejects_non_arrays() {
        let mut d = Diagnostics::new("test");
        let validate = validate_binding_array("staging", validate_kv_binding);
        assert!(!validate(&mut d, "kv_namespaces", Some(&json!({})), None));
        assert_eq!(d.errors, vec!["The field \"kv_namespaces\" should be an array but got {}."]);
    }

    #[test]
    fn bindings_property_validates_each_binding_in_child() {
        let mut d = Diagnostics::new("test");
        let validate = validate_bindings_property("staging", validate_durable_object_binding);
        let value = json!({"bindings": [{"name": "OBJ", "class_name": "Obj"}, {"name": "BAD"}]});
        assert!(!validate(&mut d, "durable_objects", Some(&value), None));
        assert!(d.errors.is_empty());
        assert_eq!(d.children.len(), 1);
        assert_eq!(
            d.children[0].description,
            "\"durable_objects.bindings[1]\": {\"name\":\"BAD\"}"
        );
        assert_eq!(d.children[0].errors, vec!["binding should have a string \"class_name\" field."]);
    }

    #[test]
    fn bindings_property_container_errors() {
        let mut d = Diagnostics::new("test");
        let validate = validate_bindings_property("staging", validate_durable_object_binding);
        assert!(!validate(&mut d, "durable_objects", Some(&json!([])), None));
        assert!(!validate(&mut d, "durable_objects", Some(&json!({})), None));
        assert!(!validate(&mut d, "durable_objects", Some(&json!({"bindings": 1})), None));
        assert_eq!(
            d.errors,
            vec![
                "The field \"durable_objects\" should be an object but got [].",
                "The field \"durable_objects\" is missing the required \"bindings\" property.",
                "The field \"durable_objects.bindings\" should be an array but got 1.",
            ]
        );
    }

    #[test]
    fn durable_object_environment_requires_script_name() {
        let mut d = Diagnostics::new("test");
        let value = json!({"name": "OBJ", "class_name": "Obj", "environment": "prod"});
        assert!(!validate_durable_object_binding(&mut d, "b", Some(&value), None));
        assert_eq!(
            d.errors,
            vec!["binding should have a \"script_name\" field if \"environment\" is present."]
        );
    }

    #[test]
    fn browser_binding_is_strict_about_keys() {
        let mut d = Diagnostics::new("test");
        let validate = validate_named_binding("staging", true);
        assert!(validate(&mut d, "browser", Some(&json!({"binding": "B", "extra": 1})), None));
        assert_eq!(d.warnings, vec!["Unexpected fields found in browser field: \"extra\""]);
    }

    #[test]
    fn tail_consumers_require_service() {
        let mut d = Diagnostics::new("test");
        assert!(!validate_tail_consumers(&mut d, "tail_consumers", Some(&json!([{}, 3])), None));
        assert_eq!(
            d.errors,
            vec![
                "\"tail_consumers[0].service\" is a required field.",
                "\"tail_consumers[1]\" should be an object but got 3.",
            ]
        );
    }

    #[test]
    fn duplicate_names_across_and_within_kinds() {
        let mut env = top_with_kv(&["DATA", "CACHE", "CACHE"]);
        env.ai = Some(NamedBinding { binding: "DATA".into() });
        env.vars.insert("DATA".into(), json!("x"));

        let mut d = Diagnostics::new("test");
        assert!(!validate_bindings_have_unique_names(&mut d, &env));
        assert_eq!(
            d.errors,
            vec![
                "DATA assigned to KV Namespace, AI, and Environment Variable bindings.",
                "CACHE assigned to multiple KV Namespace bindings.",
                "Bindings must have unique names, so that they can all be referenced in the worker.\n\
                 Please change your bindings to have unique names.",
            ]
        );
    }

    #[test]
    fn queue_producer_with_unknown_keys_is_rejected() {
        let mut d = Diagnostics::new("test");
        let value = json!({"binding": "JOBS", "queue": "jobs", "batch": 5});
        assert!(!validate_queue_binding(&mut d, "queues.producers[0]", Some(&value), None));
        assert!(d.errors.is_empty());
        assert_eq!(d.warnings, vec!["Unexpected fields found in queues.producers[0] field: \"batch\""]);
    }

    #[test]
    fn queue_producer_needs_non_empty_queue() {
        let mut d = Diagnostics::new("test");
        let value = json!({"binding": "JOBS", "queue": ""});
        assert!(!validate_queue_binding(&mut d, "queues.producers[0]", Some(&value), None));
        assert_eq!(
            d.errors,
            vec!["\"queues.producers[0]\" bindings should have a string \"queue\" field but got {\"binding\":\"JOBS\",\"queue\":\"\"}."]
        );
    }

    #[test]
    fn dispatch_namespace_outbound_needs_service() {
        let mut d = Diagnostics::new("test");
        let value = json!({"binding": "D", "namespace": "ns", "outbound": {"environment": "prod"}});
        assert!(!validate_dispatch_namespace_binding(&mut d, "dispatch_namespaces[0]", Some(&value), None));
        assert_eq!(
            d.errors,
            vec![
                "\"dispatch_namespaces[0].outbound.service\" is a required field.",
                "\"dispatch_namespaces[0]\" has an invalid outbound definition.",
            ]
        );
    }

    #[test]
    fn logfwdr_schema_is_replaced_by_capnp() {
        let mut d = Diagnostics::new("test");
        let validate = validate_logfwdr("staging");
        let value = json!({"bindings": [], "schema": "schema.capnp"});
        assert!(!validate(&mut d, "logfwdr", Some(&value), None));
        assert!(d.errors[0].starts_with("\"logfwdr\" binding \"schema\" property has been replaced"));
    }

    #[test]
    fn unsafe_capnp_is_compiled_or_sourced() {
        let validate = validate_unsafe_settings("staging");

        let mut d = Diagnostics::new("test");
        let both = json!({"capnp": {"compiled_schema": "x", "base_path": "."}});
        assert!(!validate(&mut d, "unsafe", Some(&both), None));
        assert_eq!(
            d.errors,
            vec!["The field \"unsafe.capnp\" cannot contain both \"compiled_schema\" and one of \"base_path\" or \"source_schemas\"."]
        );

        let mut d = Diagnostics::new("test");
        let sourced = json!({"capnp": {"base_path": ".", "source_schemas": ["a.capnp"]}});
        assert!(validate(&mut d, "unsafe", Some(&sourced), None));
        assert!(d.errors.is_empty());
    }

    #[test]
    fn unsafe_binding_of_supported_type_is_warned() {
        let mut d = Diagnostics::new("test");
        let value = json!({"name": "KV", "type": "kv_namespace"});
        assert!(validate_unsafe_binding(&mut d, "unsafe.bindings[0]", Some(&value), None));
        assert_eq!(d.warnings.len(), 1);
        assert!(d.warnings[0].starts_with("The binding type \"kv_namespace\" is directly supported."));
    }

    #[test]
    fn english_lists() {
        assert_eq!(english_list(&["A"]), "A");
        assert_eq!(english_list(&["A", "B"]), "A and B");
        assert_eq!(english_list(&["A", "B", "C"]), "A, B, and C");
    }
}
