//! Whole-configuration normalization

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use workcfg_content::RawDocument;

use crate::bindings::validate_bindings_have_unique_names;
use crate::diagnostics::Diagnostics;
use crate::environment::{EnvironmentContext, normalize_environment};
use crate::error::{Error, Result};
use crate::types::{Config, DevConfig, Environment, NormalizeArgs, Protocol};
use crate::validation::{
    JsonType, Severity, deprecated, get_defined, validate_additional_properties, validate_optional_property,
};

const IGNORED_BUILD_MESSAGE: &str = "Most common features now work out of the box with wrangler, including modules, jsx, typescript, etc. If you need anything more, use a custom build.";

/// Result of normalizing a configuration.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub config: Config,
    /// Every named environment, normalized against the top level
    pub environments: BTreeMap<String, Environment>,
    pub diagnostics: Diagnostics,
}

impl Normalized {
    /// Fail with the rendered errors if there are any.
    pub fn into_result(self) -> Result<Self> {
        if self.diagnostics.has_errors() {
            return Err(Error::Validation(self.diagnostics.render_errors()));
        }
        Ok(self)
    }
}

/// Load the configuration at `path` and normalize it.
pub fn read_config(path: &Path, args: &NormalizeArgs) -> Result<Normalized> {
    let document = RawDocument::load(path)?;
    Ok(normalize_and_validate_config(document.value(), Some(path), args))
}

/// Validate `raw` and resolve it into a [`Config`], collecting diagnostics.
///
/// Never fails outright: every problem is recorded in the returned
/// diagnostics and the affected fields fall back to their defaults.
pub fn normalize_and_validate_config(
    raw: &Map<String, Value>,
    config_path: Option<&Path>,
    args: &NormalizeArgs,
) -> Normalized {
    let mut diagnostics = Diagnostics::new(format!("Processing {} configuration:", display_path(config_path)));
    let mut raw = raw.clone();

    deprecated(
        &mut diagnostics,
        &mut raw,
        &["miniflare"],
        "Wrangler does not use configuration in the `miniflare` section. Unless you are using Miniflare directly you can remove this section.",
        true,
        "Ignored",
        Severity::Warning,
    );
    for field in ["type", "webpack_config"] {
        deprecated(
            &mut diagnostics,
            &mut raw,
            &[field],
            IGNORED_BUILD_MESSAGE,
            true,
            "Ignored",
            Severity::Warning,
        );
    }

    for field in ["legacy_env", "send_metrics", "keep_vars"] {
        validate_optional_property(&mut diagnostics, "", field, get_defined(&raw, field), JsonType::Boolean, None);
    }
    validate_optional_property(&mut diagnostics, "", "$schema", get_defined(&raw, "$schema"), JsonType::String, None);

    let legacy = args
        .legacy_env
        .or_else(|| get_defined(&raw, "legacy_env").and_then(Value::as_bool))
        .unwrap_or(true);
    if !legacy {
        diagnostics.warn(
            "Experimental: Service environments are in beta, and their behaviour is guaranteed to change in the future. DO NOT USE IN PRODUCTION.",
        );
    }

    let top = normalize_environment(&mut diagnostics, &mut raw, &EnvironmentContext::top_level());

    let mut environments = BTreeMap::new();
    match get_defined(&raw, "env") {
        None => {}
        Some(Value::Object(envs)) => {
            for (name, raw_env) in envs {
                let Some(raw_env) = raw_env.as_object() else {
                    diagnostics.error(format!("The field \"env.{name}\" should be an object but got {raw_env}."));
                    continue;
                };
                let mut env_diagnostics = Diagnostics::new(format!("\"env.{name}\" environment configuration"));
                let env = normalize_environment(
                    &mut env_diagnostics,
                    &mut raw_env.clone(),
                    &EnvironmentContext::named(name, &top, &raw, legacy),
                );
                diagnostics.add_child(env_diagnostics);
                environments.insert(name.clone(), env);
            }
        }
        Some(other) => {
            diagnostics.error(format!("The field \"env\" should be an object but got {other}."));
        }
    }
    tracing::debug!(count = environments.len(), legacy, "Normalized named environments");

    let active = match args.env.as_deref() {
        None => top,
        Some(name) => match environments.get(name) {
            Some(env) => env.clone(),
            None => missing_environment(&mut diagnostics, name, &top, &raw, legacy, config_path),
        },
    };

    let config = Config {
        config_path: config_path.map(Path::to_path_buf),
        legacy_env: legacy,
        send_metrics: get_defined(&raw, "send_metrics").and_then(Value::as_bool),
        keep_vars: get_defined(&raw, "keep_vars").and_then(Value::as_bool),
        env: active,
        dev: normalize_dev(&mut diagnostics, get_defined(&raw, "dev"), args),
        alias: normalize_alias(&mut diagnostics, get_defined(&raw, "alias")),
    };

    validate_bindings_have_unique_names(&mut diagnostics, &config.env);

    let known = Config::TOP_LEVEL_FIELDS
        .iter()
        .chain(Environment::FIELDS)
        .chain(&["env", "$schema"])
        .copied();
    validate_additional_properties(&mut diagnostics, "top-level", raw.keys().map(String::as_str), known);

    Normalized {
        config,
        environments,
        diagnostics,
    }
}

fn display_path(config_path: Option<&Path>) -> String {
    let Some(path) = config_path else {
        return "wrangler".to_string();
    };
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf));
    relative.unwrap_or_else(|| path.to_path_buf()).display().to_string()
}

/// Normalize an empty environment for `name` and report that it is not configured.
fn missing_environment(
    diagnostics: &mut Diagnostics,
    name: &str,
    top: &Environment,
    raw: &Map<String, Value>,
    legacy: bool,
    config_path: Option<&Path>,
) -> Environment {
    let mut env_diagnostics = Diagnostics::new(format!("\"env.{name}\" environment configuration"));
    let env = normalize_environment(
        &mut env_diagnostics,
        &mut Map::new(),
        &EnvironmentContext::named(name, top, raw, legacy),
    );
    diagnostics.add_child(env_diagnostics);

    let configured: Vec<&str> = get_defined(raw, "env")
        .and_then(Value::as_object)
        .map(|envs| envs.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let env_names = if configured.is_empty() {
        String::new()
    } else {
        format!(
            "The available configured environment names are: {}\n",
            Value::from(configured.clone())
        )
    };
    let file_name = config_path
        .and_then(Path::file_name)
        .map_or_else(|| "wrangler.toml".to_string(), |f| f.to_string_lossy().into_owned());
    let message = format!(
        "No environment found in configuration with name \"{name}\".\n\
         Before using `--env={name}` there should be an equivalent environment section in the configuration.\n\
         {env_names}\n\
         Consider adding an environment configuration section to the {file_name} file:\n\
         ```\n[env.{name}]\n```\n"
    );
    if configured.is_empty() {
        diagnostics.warn(message);
    } else {
        diagnostics.error(message);
    }
    env
}

fn protocol(value: Option<&Value>) -> Option<Protocol> {
    value.and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn normalize_dev(diagnostics: &mut Diagnostics, raw_dev: Option<&Value>, args: &NormalizeArgs) -> DevConfig {
    let empty = Map::new();
    let raw_dev = match raw_dev {
        None => &empty,
        Some(Value::Object(dev)) => dev,
        Some(other) => {
            diagnostics.error(format!("Expected \"dev\" to be of type object but got {other}."));
            &empty
        }
    };

    let known = ["ip", "port", "inspector_port", "local_protocol", "upstream_protocol", "host"];
    validate_additional_properties(diagnostics, "dev", raw_dev.keys().map(String::as_str), known);

    let field = |key: &str| get_defined(raw_dev, key);
    let protocols = &["http", "https"][..];
    let mut valid = validate_optional_property(diagnostics, "dev", "ip", field("ip"), JsonType::String, None);
    for key in ["port", "inspector_port"] {
        valid = validate_optional_property(diagnostics, "dev", key, field(key), JsonType::Number, None) && valid;
    }
    for key in ["local_protocol", "upstream_protocol"] {
        valid =
            validate_optional_property(diagnostics, "dev", key, field(key), JsonType::String, Some(protocols)) && valid;
    }
    valid = validate_optional_property(diagnostics, "dev", "host", field("host"), JsonType::String, None) && valid;
    if !valid {
        tracing::debug!("Invalid dev settings fall back to their defaults");
    }

    let defaults = DevConfig::default();
    let local_protocol = protocol(field("local_protocol"))
        .or(args.local_protocol)
        .unwrap_or(defaults.local_protocol);
    DevConfig {
        ip: field("ip")
            .and_then(Value::as_str)
            .map_or(defaults.ip, str::to_string),
        port: field("port").and_then(Value::as_u64).and_then(|p| u16::try_from(p).ok()),
        inspector_port: field("inspector_port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok()),
        local_protocol,
        upstream_protocol: protocol(field("upstream_protocol"))
            .or(args.upstream_protocol)
            .unwrap_or(local_protocol),
        host: field("host").and_then(Value::as_str).map(str::to_string),
    }
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn normalize_alias(diagnostics: &mut Diagnostics, raw_alias: Option<&Value>) -> Option<BTreeMap<String, String>> {
    let raw_alias = raw_alias?;
    let Some(entries) = raw_alias.as_object() else {
        diagnostics.error(format!("Expected alias to be an object, but got {}", type_of(raw_alias)));
        return None;
    };
    let mut alias = BTreeMap::new();
    let mut valid = true;
    for (key, value) in entries {
        match value.as_str() {
            Some(target) => {
                alias.insert(key.clone(), target.to_string());
            }
            None => {
                diagnostics.error(format!(
                    "Expected alias[\"{key}\"] to be a string, but got {}",
                    type_of(value)
                ));
                valid = false;
            }
        }
    }
    valid.then_some(alias)
}
