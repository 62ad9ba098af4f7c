//! Resolution of environment fields against the top-level environment
//!
//! A named environment either inherits a field from the top level, ignores
//! the top level entirely, or (for service environments) must not set the
//! field at all. Each resolver validates the raw value first, then picks the
//! final typed value.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::diagnostics::Diagnostics;
use crate::types::Environment;
use crate::validation::get_defined;

/// Deserialize a raw value, or `None` if it does not fit `T`.
pub(crate) fn typed<T: DeserializeOwned>(field: &str, value: &Value) -> Option<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| tracing::debug!(field, error = %e, "Falling back to default for malformed value"))
        .ok()
}

/// Use the environment's own value, falling back to the inherited one.
#[allow(clippy::too_many_arguments)]
pub fn inheritable<T, V, I>(
    diagnostics: &mut Diagnostics,
    top: Option<&Environment>,
    raw_env: &Map<String, Value>,
    field: &str,
    validate: V,
    default: T,
    inherited: I,
) -> T
where
    T: DeserializeOwned,
    V: Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool,
    I: FnOnce(&Environment) -> Option<T>,
{
    let raw = get_defined(raw_env, field);
    validate(diagnostics, field, raw, top);
    match raw {
        Some(value) => typed(field, value).unwrap_or(default),
        None => top.and_then(inherited).unwrap_or(default),
    }
}

/// Use only the environment's own value; warn when the top level sets it.
#[allow(clippy::too_many_arguments)]
pub fn not_inheritable<T, V>(
    diagnostics: &mut Diagnostics,
    top: Option<&Environment>,
    raw_config: Option<&Map<String, Value>>,
    raw_env: &Map<String, Value>,
    env_name: &str,
    field: &str,
    validate: V,
    default: T,
) -> T
where
    T: DeserializeOwned,
    V: Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool,
{
    if let Some(value) = get_defined(raw_env, field) {
        validate(diagnostics, field, Some(value), top);
        return typed(field, value).unwrap_or(default);
    }
    if raw_config.and_then(|config| get_defined(config, field)).is_some() {
        diagnostics.warn(format!(
            "\"{field}\" exists at the top level, but not on \"env.{env_name}\".\n\
             This is not what you probably want, since \"{field}\" is not inherited by environments.\n\
             Please add \"{field}\" to \"env.{env_name}\"."
        ));
    }
    default
}

/// Inheritable in legacy environments; forbidden in service environments.
///
/// In a service environment the top-level value always wins and setting the
/// field is an error.
#[allow(clippy::too_many_arguments)]
pub fn inheritable_in_legacy_environments<T, V, A, X>(
    diagnostics: &mut Diagnostics,
    legacy: bool,
    top: Option<&Environment>,
    raw_env: &Map<String, Value>,
    field: &str,
    validate: V,
    default: T,
    accessor: A,
    transform: X,
) -> T
where
    T: DeserializeOwned,
    V: Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool,
    A: Fn(&Environment) -> Option<T>,
    X: FnOnce(T) -> T,
{
    match top {
        Some(top) if !legacy => {
            if raw_env.contains_key(field) {
                diagnostics.error(format!(
                    "The \"{field}\" field is not allowed in named service environments.\n\
                     Please remove the field from this environment."
                ));
            }
            accessor(top).unwrap_or(default)
        }
        _ => inheritable(diagnostics, top, raw_env, field, validate, default, |top| {
            accessor(top).map(transform)
        }),
    }
}

/// `"<name>-<env>"`, used to derive a legacy environment's worker name.
pub fn append_env_name(env_name: &str) -> impl FnOnce(Option<String>) -> Option<String> + '_ {
    move |name| name.map(|name| format!("{name}-{env_name}"))
}
