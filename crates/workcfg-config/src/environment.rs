//! Normalization of a single environment section
//!
//! The top level of a configuration file is itself an environment. Named
//! environments under `env.<name>` are normalized against it, inheriting some
//! fields and deliberately not inheriting others (bindings, vars).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::bindings::{
    field_path, validate_analytics_engine_binding, validate_binding_array, validate_bindings_property,
    validate_d1_binding, validate_dispatch_namespace_binding, validate_durable_object_binding,
    validate_hyperdrive_binding, validate_kv_binding, validate_logfwdr, validate_mtls_certificate_binding,
    validate_named_binding, validate_pipeline_binding, validate_queues, validate_r2_binding,
    validate_send_email_binding, validate_service_binding, validate_tail_consumers, validate_unsafe_settings,
    validate_vectorize_binding,
};
use crate::diagnostics::Diagnostics;
use crate::inheritance::{append_env_name, inheritable, inheritable_in_legacy_environments, not_inheritable};
use crate::types::{DurableObjects, Environment, Logfwdr, Placement, Queues, Triggers};
use crate::validation::{
    JsonType, Severity, Validator, all, deprecated, experimental, get_defined, is_boolean, is_mutually_exclusive_with,
    is_non_empty_string, is_object_with, is_one_of, is_optional_property, is_required_property, is_string,
    is_string_array, is_valid_date, is_valid_name, validate_additional_properties, validate_optional_property,
    validate_optional_typed_array, validate_required_property, validate_typed_array,
};

const RULE_TYPES: &[&str] = &["ESModule", "CommonJS", "CompiledWasm", "Text", "Data"];
const MIGRATION_KEYS: &[&str] = &["tag", "new_classes", "new_sqlite_classes", "renamed_classes", "deleted_classes"];

/// Where an environment sits relative to the rest of the configuration.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentContext<'a> {
    pub env_name: &'a str,
    /// The normalized top-level environment; `None` when normalizing the top level itself
    pub top: Option<&'a Environment>,
    pub raw_config: Option<&'a Map<String, Value>>,
    pub legacy: bool,
}

impl<'a> EnvironmentContext<'a> {
    pub fn top_level() -> Self {
        Self {
            env_name: "top level",
            top: None,
            raw_config: None,
            legacy: true,
        }
    }

    pub fn named(
        env_name: &'a str,
        top: &'a Environment,
        raw_config: &'a Map<String, Value>,
        legacy: bool,
    ) -> Self {
        Self {
            env_name,
            top: Some(top),
            raw_config: Some(raw_config),
            legacy,
        }
    }
}

/// Validate `raw_env` and resolve it into a typed [`Environment`].
///
/// Deprecated fields are removed from `raw_env` in place, so callers that
/// later check for unknown keys see the cleaned-up object.
pub fn normalize_environment(
    d: &mut Diagnostics,
    raw_env: &mut Map<String, Value>,
    ctx: &EnvironmentContext<'_>,
) -> Environment {
    deprecated(
        d,
        raw_env,
        &["kv-namespaces"],
        "The \"kv-namespaces\" field is no longer supported, please rename to \"kv_namespaces\"",
        true,
        "Deprecation",
        Severity::Warning,
    );
    deprecated(
        d,
        raw_env,
        &["zone_id"],
        "This is unnecessary since we can deduce this from routes directly.",
        false,
        "Deprecation",
        Severity::Warning,
    );
    deprecated(
        d,
        raw_env,
        &["experimental_services"],
        "The \"experimental_services\" field is no longer supported. Simply rename the [experimental_services] field to [services].",
        true,
        "Deprecation",
        Severity::Warning,
    );
    experimental(d, raw_env, &["unsafe"]);
    clear_empty_string(d, raw_env, "route");
    clear_empty_string(d, raw_env, "account_id");

    let raw_env = &*raw_env;
    let top = ctx.top;
    let env_name = ctx.env_name;

    let route = inheritable(d, top, raw_env, "route", is_route, None, |t| Some(t.route.clone()));
    let routes = inheritable(
        d,
        top,
        raw_env,
        "routes",
        all(vec![
            Box::new(is_route_array) as Validator<'_>,
            Box::new(is_mutually_exclusive_with(raw_env, &["route"])) as Validator<'_>,
        ]),
        None,
        |t| Some(t.routes.clone()),
    );

    let name = inheritable_in_legacy_environments(
        d,
        ctx.legacy,
        top,
        raw_env,
        "name",
        is_valid_name,
        None,
        |t| Some(t.name.clone()),
        append_env_name(env_name),
    );
    let account_id = inheritable_in_legacy_environments(
        d,
        ctx.legacy,
        top,
        raw_env,
        "account_id",
        is_string,
        None,
        |t| Some(t.account_id.clone()),
        |id| id,
    );

    let placement = normalize_placement(d, top, raw_env);

    Environment {
        name,
        account_id,
        compatibility_date: inheritable(
            d,
            top,
            raw_env,
            "compatibility_date",
            all(vec![
                Box::new(is_string) as Validator<'_>,
                Box::new(is_valid_date) as Validator<'_>,
            ]),
            None,
            |t| Some(t.compatibility_date.clone()),
        ),
        compatibility_flags: inheritable(d, top, raw_env, "compatibility_flags", is_string_array, Vec::new(), |t| {
            Some(t.compatibility_flags.clone())
        }),
        jsx_factory: inheritable(
            d,
            top,
            raw_env,
            "jsx_factory",
            is_string,
            "React.createElement".to_string(),
            |t| Some(t.jsx_factory.clone()),
        ),
        jsx_fragment: inheritable(d, top, raw_env, "jsx_fragment", is_string, "React.Fragment".to_string(), |t| {
            Some(t.jsx_fragment.clone())
        }),
        main: inheritable(d, top, raw_env, "main", is_string, None, |t| Some(t.main.clone())),
        tsconfig: inheritable(d, top, raw_env, "tsconfig", is_string, None, |t| Some(t.tsconfig.clone())),
        base_dir: inheritable(d, top, raw_env, "base_dir", is_string, None, |t| Some(t.base_dir.clone())),
        route,
        routes,
        workers_dev: inheritable(d, top, raw_env, "workers_dev", is_boolean, None, |t| Some(t.workers_dev)),
        minify: inheritable(d, top, raw_env, "minify", is_boolean, None, |t| Some(t.minify)),
        no_bundle: inheritable(d, top, raw_env, "no_bundle", is_boolean, None, |t| Some(t.no_bundle)),
        logpush: inheritable(d, top, raw_env, "logpush", is_boolean, None, |t| Some(t.logpush)),
        upload_source_maps: inheritable(d, top, raw_env, "upload_source_maps", is_boolean, None, |t| {
            Some(t.upload_source_maps)
        }),
        find_additional_modules: inheritable(d, top, raw_env, "find_additional_modules", is_boolean, None, |t| {
            Some(t.find_additional_modules)
        }),
        preserve_file_names: inheritable(d, top, raw_env, "preserve_file_names", is_boolean, None, |t| {
            Some(t.preserve_file_names)
        }),
        triggers: inheritable(
            d,
            top,
            raw_env,
            "triggers",
            is_object_with(&["crons"]),
            Triggers::default(),
            |t| Some(t.triggers.clone()),
        ),
        usage_model: inheritable(
            d,
            top,
            raw_env,
            "usage_model",
            is_one_of(&["bundled", "unbound"]),
            None,
            |t| Some(t.usage_model),
        ),
        placement,
        rules: inheritable(d, top, raw_env, "rules", validate_rules(env_name), Vec::new(), |t| {
            Some(t.rules.clone())
        }),
        zone_id: get_defined(raw_env, "zone_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        node_compat: inheritable(d, top, raw_env, "node_compat", is_boolean, None, |t| Some(t.node_compat)),
        first_party_worker: inheritable(d, top, raw_env, "first_party_worker", is_boolean, None, |t| {
            Some(t.first_party_worker)
        }),
        migrations: inheritable(d, top, raw_env, "migrations", validate_migrations, Vec::new(), |t| {
            Some(t.migrations.clone())
        }),
        logfwdr: inheritable(
            d,
            top,
            raw_env,
            "logfwdr",
            validate_logfwdr(env_name),
            Logfwdr::default(),
            |t| Some(t.logfwdr.clone()),
        ),
        observability: inheritable(d, top, raw_env, "observability", validate_observability, None, |t| {
            Some(t.observability.clone())
        }),
        assets: inheritable(d, top, raw_env, "assets", validate_assets, None, |t| Some(t.assets.clone())),

        vars: not_inheritable(d, top, ctx.raw_config, raw_env, env_name, "vars", validate_vars(env_name), Map::new()),
        define: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "define",
            validate_defines(env_name),
            BTreeMap::new(),
        ),
        durable_objects: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "durable_objects",
            validate_bindings_property(env_name, validate_durable_object_binding),
            DurableObjects::default(),
        ),
        kv_namespaces: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "kv_namespaces",
            validate_binding_array(env_name, validate_kv_binding),
            Vec::new(),
        ),
        r2_buckets: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "r2_buckets",
            validate_binding_array(env_name, validate_r2_binding),
            Vec::new(),
        ),
        d1_databases: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "d1_databases",
            validate_binding_array(env_name, validate_d1_binding),
            Vec::new(),
        ),
        vectorize: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "vectorize",
            validate_binding_array(env_name, validate_vectorize_binding),
            Vec::new(),
        ),
        hyperdrive: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "hyperdrive",
            validate_binding_array(env_name, validate_hyperdrive_binding),
            Vec::new(),
        ),
        services: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "services",
            validate_binding_array(env_name, validate_service_binding),
            Vec::new(),
        ),
        tail_consumers: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "tail_consumers",
            validate_tail_consumers,
            Vec::new(),
        ),
        browser: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "browser",
            validate_named_binding(env_name, true),
            None,
        ),
        ai: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "ai",
            validate_named_binding(env_name, false),
            None,
        ),
        version_metadata: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "version_metadata",
            validate_named_binding(env_name, false),
            None,
        ),
        queues: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "queues",
            validate_queues(env_name),
            Queues::default(),
        ),
        analytics_engine_datasets: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "analytics_engine_datasets",
            validate_binding_array(env_name, validate_analytics_engine_binding),
            Vec::new(),
        ),
        dispatch_namespaces: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "dispatch_namespaces",
            validate_binding_array(env_name, validate_dispatch_namespace_binding),
            Vec::new(),
        ),
        mtls_certificates: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "mtls_certificates",
            validate_binding_array(env_name, validate_mtls_certificate_binding),
            Vec::new(),
        ),
        send_email: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "send_email",
            validate_binding_array(env_name, validate_send_email_binding),
            Vec::new(),
        ),
        pipelines: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "pipelines",
            validate_binding_array(env_name, validate_pipeline_binding),
            Vec::new(),
        ),
        unsafe_settings: not_inheritable(
            d,
            top,
            ctx.raw_config,
            raw_env,
            env_name,
            "unsafe",
            validate_unsafe_settings(env_name),
            Map::new(),
        ),
    }
}

/// An empty string in `field` is a leftover from old templates; treat it as unset.
fn clear_empty_string(d: &mut Diagnostics, raw_env: &mut Map<String, Value>, field: &str) {
    if raw_env.get(field).and_then(Value::as_str) == Some("") {
        d.warn(format!(
            "The \"{field}\" field in your configuration is an empty string and will be ignored.\n\
             Please remove the \"{field}\" field from your configuration."
        ));
        raw_env.insert(field.to_string(), Value::Null);
    }
}

fn accept_any(_: &mut Diagnostics, _: &str, _: Option<&Value>, _: Option<&Environment>) -> bool {
    true
}

fn normalize_placement(
    d: &mut Diagnostics,
    top: Option<&Environment>,
    raw_env: &Map<String, Value>,
) -> Option<Placement> {
    if let Some(raw) = get_defined(raw_env, "placement") {
        let placement = raw.as_object();
        let mode = placement.and_then(|p| get_defined(p, "mode"));
        let hint = placement.and_then(|p| get_defined(p, "hint"));
        validate_required_property(d, "placement", "mode", mode, JsonType::String, Some(&["off", "smart"][..]));
        validate_optional_property(d, "placement", "hint", hint, JsonType::String, None);
        if hint.is_some() && mode.and_then(Value::as_str) != Some("smart") {
            d.error("\"placement.hint\" cannot be set if \"placement.mode\" is not \"smart\"");
        }
    }
    inheritable(d, top, raw_env, "placement", accept_any, None, |t| Some(t.placement.clone()))
}

fn is_valid_route_value(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Object(route) => {
            if !route.get("pattern").is_some_and(Value::is_string) {
                return false;
            }
            let other_keys = route.len() - 1;
            let has_zone_id = route.get("zone_id").is_some_and(Value::is_string);
            let has_zone_name = route.get("zone_name").is_some_and(Value::is_string);
            let has_custom_domain = route.get("custom_domain").is_some_and(Value::is_boolean);
            match other_keys {
                1 => has_zone_id || has_zone_name || has_custom_domain,
                2 => has_custom_domain && (has_zone_id || has_zone_name),
                _ => false,
            }
        }
        _ => false,
    }
}

pub fn is_route(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    match value {
        Some(v) if !is_valid_route_value(v) => {
            d.error(format!(
                "Expected \"{field}\" to be either a string, or an object with shape {{ pattern, custom_domain, zone_id | zone_name }}, but got {v}."
            ));
            false
        }
        _ => true,
    }
}

pub fn is_route_array(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let Some(items) = value.as_array() else {
        d.error(format!("Expected \"{field}\" to be an array but got {value}."));
        return false;
    };
    let invalid: Vec<&Value> = items.iter().filter(|item| !is_valid_route_value(item)).collect();
    if invalid.is_empty() {
        return true;
    }
    let listing = serde_json::to_string_pretty(&invalid).unwrap_or_default();
    d.error(format!(
        "Expected \"{field}\" to be an array of either strings or objects with the shape {{ pattern, custom_domain, zone_id | zone_name }}, but these weren't valid: {listing}."
    ));
    false
}

fn validate_rules(
    env_name: &str,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let path = field_path(env_name, field, top);
        let Some(rules) = value.as_array() else {
            d.error(format!("The field \"{path}\" should be an array but got {value}."));
            return false;
        };
        let mut valid = true;
        for (i, rule) in rules.iter().enumerate() {
            valid = validate_rule(d, &format!("{path}[{i}]"), rule) && valid;
        }
        valid
    }
}

fn validate_rule(d: &mut Diagnostics, field: &str, value: &Value) -> bool {
    let Some(rule) = value.as_object() else {
        d.error(format!("\"{field}\" should be an object but got {value}."));
        return false;
    };
    let mut valid = true;
    if !is_required_property(rule, "type", JsonType::String, Some(RULE_TYPES)) {
        d.error(
            "bindings should have a string \"type\" field, which contains one of \"ESModule\", \"CommonJS\", \"CompiledWasm\", \"Text\", or \"Data\".",
        );
        valid = false;
    }
    valid = validate_typed_array(d, &format!("{field}.globs"), get_defined(rule, "globs"), JsonType::String) && valid;
    if !is_optional_property(rule, "fallthrough", JsonType::Boolean) {
        d.error("the field \"fallthrough\", when present, should be a boolean.");
        valid = false;
    }
    valid
}

fn validate_migrations(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let Some(migrations) = value.as_array() else {
        d.error(format!("The optional \"{field}\" field should be an array, but got {value}"));
        return false;
    };
    let mut valid = true;
    for (i, migration) in migrations.iter().enumerate() {
        let path = format!("migrations[{i}]");
        let empty = Map::new();
        let migration = migration.as_object().unwrap_or(&empty);
        valid = validate_additional_properties(
            d,
            "migrations",
            migration.keys().map(String::as_str),
            MIGRATION_KEYS.iter().copied(),
        ) && valid;
        valid = validate_required_property(d, &path, "tag", get_defined(migration, "tag"), JsonType::String, None)
            && valid;
        for key in ["new_classes", "new_sqlite_classes"] {
            valid = validate_optional_typed_array(d, &format!("{path}.{key}"), get_defined(migration, key), JsonType::String)
                && valid;
        }
        if let Some(renamed) = get_defined(migration, "renamed_classes") {
            let well_formed = renamed.as_array().is_some_and(|classes| {
                classes.iter().all(|class| {
                    class.as_object().is_some_and(|c| {
                        is_required_property(c, "from", JsonType::String, None)
                            && is_required_property(c, "to", JsonType::String, None)
                    })
                })
            });
            if !well_formed {
                d.error(format!(
                    "Expected \"{path}.renamed_classes\" to be an array of \"{{from: string, to: string}}\" objects but got {renamed}."
                ));
                valid = false;
            }
        }
        valid = validate_optional_typed_array(
            d,
            &format!("{path}.deleted_classes"),
            get_defined(migration, "deleted_classes"),
            JsonType::String,
        ) && valid;
    }
    valid
}

fn validate_observability(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let Some(observability) = value.as_object() else {
        d.error(format!("\"{field}\" should be an object but got {value}."));
        return false;
    };
    let rate = get_defined(observability, "head_sampling_rate");
    let mut valid =
        validate_required_property(d, field, "enabled", get_defined(observability, "enabled"), JsonType::Boolean, None);
    valid = validate_optional_property(d, field, "head_sampling_rate", rate, JsonType::Number, None) && valid;
    valid = validate_additional_properties(
        d,
        field,
        observability.keys().map(String::as_str),
        ["enabled", "head_sampling_rate"],
    ) && valid;
    if rate.and_then(Value::as_f64).is_some_and(|rate| !(0.0..=1.0).contains(&rate)) {
        d.error(format!("\"{field}.head_sampling_rate\" must be a value between 0 and 1."));
        valid = false;
    }
    valid
}

fn validate_assets(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let Some(assets) = value.as_object() else {
        d.error(format!("\"{field}\" should be an object but got {value}."));
        return false;
    };
    let directory = get_defined(assets, "directory");
    let mut valid = validate_required_property(d, field, "directory", directory, JsonType::String, None);
    if directory.is_some_and(Value::is_string) {
        valid = is_non_empty_string(d, &format!("{field}.directory"), directory, None) && valid;
    }
    valid = validate_optional_property(d, field, "binding", get_defined(assets, "binding"), JsonType::String, None)
        && valid;
    valid = validate_optional_property(
        d,
        field,
        "html_handling",
        get_defined(assets, "html_handling"),
        JsonType::String,
        Some(&["auto-trailing-slash", "force-trailing-slash", "drop-trailing-slash", "none"][..]),
    ) && valid;
    valid = validate_optional_property(
        d,
        field,
        "not_found_handling",
        get_defined(assets, "not_found_handling"),
        JsonType::String,
        Some(&["single-page-application", "404-page", "none"][..]),
    ) && valid;
    validate_additional_properties(
        d,
        field,
        assets.keys().map(String::as_str),
        ["directory", "binding", "html_handling", "not_found_handling"],
    ) && valid
}

fn validate_vars(
    env_name: &str,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let path = field_path(env_name, field, top);
        let Some(vars) = value.as_object() else {
            d.error(format!("The field \"{path}\" should be an object but got {value}.\n"));
            return false;
        };
        for name in top.into_iter().flat_map(|t| t.vars.keys()) {
            if !vars.contains_key(name) {
                d.warn(format!(
                    "\"vars.{name}\" exists at the top level, but not on \"{path}\".\n\
                     This is not what you probably want, since \"vars\" configuration is not inherited by environments.\n\
                     Please add \"vars.{name}\" to \"env.{env_name}\"."
                ));
            }
        }
        true
    }
}

fn validate_defines(
    env_name: &str,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + '_ {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let Some(value) = value else {
            return true;
        };
        let path = field_path(env_name, field, top);
        let Some(defines) = value.as_object() else {
            d.error(format!("The field \"{path}\" should be an object but got {value}.\n"));
            return false;
        };
        let mut valid = true;
        for (name, define) in defines {
            if !define.is_string() {
                d.error(format!("The field \"{path}.{name}\" should be a string but got {define}."));
                valid = false;
            }
        }
        if let Some(top) = top.filter(|t| !t.define.is_empty()) {
            for name in top.define.keys() {
                if !defines.contains_key(name) {
                    d.warn(format!(
                        "\"define.{name}\" exists at the top level, but not on \"{path}\".\n\
                         This is not what you probably want, since \"define\" configuration is not inherited by environments.\n\
                         Please add \"define.{name}\" to \"env.{env_name}\"."
                    ));
                }
            }
            for name in defines.keys() {
                if !top.define.contains_key(name) {
                    d.warn(format!(
                        "\"{name}\" exists on \"env.{env_name}\", but not on the top level.\n\
                         This is not what you probably want, since \"define\" configuration within environments can only override existing top level \"define\" configuration\n\
                         Please remove \"{path}.{name}\", or add \"define.{name}\"."
                    ));
                }
            }
        }
        valid
    }
}
