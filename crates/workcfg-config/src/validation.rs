//! Field validators
//!
//! A validator inspects one field of a raw configuration, records any
//! problems in a [`Diagnostics`] node, and reports whether the value is
//! usable. An absent value (`None`) is always valid; required-ness is checked
//! separately. JSON `null` counts as absent.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::diagnostics::Diagnostics;
use crate::types::Environment;

/// Environment variable that silences warnings about experimental fields.
pub const DISABLE_EXPERIMENTAL_WARNING_ENV: &str = "WORKCFG_DISABLE_EXPERIMENTAL_WARNING";

static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^$|^[a-z0-9_][a-z0-9-_]*$").expect("valid name regex"));

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})(?:[T ][0-9:.]+(?:Z|[+-]\d{2}:\d{2})?)?$")
        .expect("valid date regex")
});

/// A boxed validator, for combinators that hold several of them.
pub type Validator<'a> =
    Box<dyn Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + 'a>;

/// Whether a deprecation is reported as a warning or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Warning,
    Error,
}

/// JSON value kinds a property can be required to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// Look up `key` in `map`, treating `null` as absent.
pub fn get_defined<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    map.get(key).filter(|v| !v.is_null())
}

/// Compact JSON rendering used in diagnostic messages.
pub(crate) fn json(value: Option<&Value>) -> String {
    value.map_or_else(|| "undefined".to_string(), Value::to_string)
}

pub fn is_string(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    match value {
        Some(v) if !v.is_string() => {
            d.error(format!("Expected \"{field}\" to be of type string but got {v}."));
            false
        }
        _ => true,
    }
}

pub fn is_non_empty_string(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    match value {
        Some(v) if v.as_str().is_none_or(str::is_empty) => {
            d.error(format!("Expected \"{field}\" to be a non-empty string but got {v}."));
            false
        }
        _ => true,
    }
}

pub fn is_boolean(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    match value {
        Some(v) if !v.is_boolean() => {
            d.error(format!("Expected \"{field}\" to be of type boolean but got {v}."));
            false
        }
        _ => true,
    }
}

pub fn is_string_array(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    match value {
        Some(v) if !v.as_array().is_some_and(|items| items.iter().all(Value::is_string)) => {
            d.error(format!("Expected \"{field}\" to be of type string array but got {v}."));
            false
        }
        _ => true,
    }
}

/// Worker names: lowercase alphanumerics, dashes and underscores, or empty.
pub fn is_valid_name(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    match value {
        None => true,
        Some(Value::String(s)) if VALID_NAME.is_match(s) => true,
        Some(v) => {
            d.error(format!(
                "Expected \"{field}\" to be of type string, alphanumeric and lowercase with dashes only but got {v}."
            ));
            false
        }
    }
}

/// An ISO-8601 date. En and em dashes get their own error.
pub fn is_valid_date(d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>) -> bool {
    let Some(Value::String(s)) = value else {
        return true;
    };
    let mut valid = true;
    if s.contains('–') || s.contains('—') {
        d.error(format!(
            "\"{field}\" field should use ISO-8601 accepted hyphens (-) rather than en-dashes (–) or em-dashes (—)."
        ));
        valid = false;
    }
    let normalized = s.replace(['–', '—'], "-");
    let is_date = ISO_DATE.captures(&normalized).is_some_and(|caps| {
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        (1..=12).contains(&month) && (1..=31).contains(&day)
    });
    if !is_date {
        d.error(format!(
            "\"{field}\" field should be a valid ISO-8601 date (YYYY-MM-DD), but got {}.",
            Value::String(s.clone())
        ));
        valid = false;
    }
    valid
}

pub fn is_one_of<'a>(
    choices: &'a [&'a str],
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + 'a {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>| match value {
        Some(v) if !v.as_str().is_some_and(|s| choices.contains(&s)) => {
            d.error(format!(
                "Expected \"{field}\" field to be one of {} but got {v}.",
                Value::from(choices.to_vec())
            ));
            false
        }
        _ => true,
    }
}

/// An object that has every one of `properties`. Extra keys are warned about.
pub fn is_object_with<'a>(
    properties: &'a [&'a str],
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + 'a {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>| {
        let Some(v) = value else {
            return true;
        };
        let Some(map) = v.as_object().filter(|m| properties.iter().all(|p| m.contains_key(*p))) else {
            d.error(format!(
                "Expected \"{field}\" to be of type object, containing only properties {}, but got {v}.",
                properties.join(",")
            ));
            return false;
        };
        let rest = map.keys().map(String::as_str).filter(|k| !properties.contains(k));
        validate_additional_properties(d, field, rest, []);
        true
    }
}

/// Run every validator, even after one fails.
pub fn all<'a>(
    validators: Vec<Validator<'a>>,
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + 'a {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, top: Option<&Environment>| {
        let mut valid = true;
        for validate in &validators {
            if !validate(d, field, value, top) {
                valid = false;
            }
        }
        valid
    }
}

/// Fails when the field is set alongside any of `fields` in `container`.
pub fn is_mutually_exclusive_with<'a>(
    container: &'a Map<String, Value>,
    fields: &'a [&'a str],
) -> impl Fn(&mut Diagnostics, &str, Option<&Value>, Option<&Environment>) -> bool + 'a {
    move |d: &mut Diagnostics, field: &str, value: Option<&Value>, _: Option<&Environment>| {
        if value.is_none() {
            return true;
        }
        if fields.iter().any(|other| get_defined(container, other).is_some()) {
            let mut all_fields = vec![field];
            all_fields.extend_from_slice(fields);
            d.error(format!(
                "Expected exactly one of the following fields {}.",
                Value::from(all_fields)
            ));
            return false;
        }
        true
    }
}

/// Report a deprecated field at `path` and optionally remove it.
pub fn deprecated(
    d: &mut Diagnostics,
    config: &mut Map<String, Value>,
    path: &[&str],
    message: &str,
    remove: bool,
    title: &str,
    severity: Severity,
) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };
    let mut container = config;
    for segment in parents {
        match container.get_mut(*segment).and_then(Value::as_object_mut) {
            Some(next) => container = next,
            None => return,
        }
    }
    if !container.contains_key(*leaf) {
        return;
    }
    let message = format!("{title}: \"{}\":\n{message}", path.join("."));
    match severity {
        Severity::Warning => d.warn(message),
        Severity::Error => d.error(message),
    }
    if remove {
        container.remove(*leaf);
    }
}

/// Warn that the field at `path` is experimental.
pub fn experimental(d: &mut Diagnostics, config: &Map<String, Value>, path: &[&str]) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };
    let mut container = config;
    for segment in parents {
        match container.get(*segment).and_then(Value::as_object) {
            Some(next) => container = next,
            None => return,
        }
    }
    if container.contains_key(*leaf) && std::env::var_os(DISABLE_EXPERIMENTAL_WARNING_ENV).is_none() {
        d.warn(format!(
            "\"{}\" fields are experimental and may change or break at any time.",
            path.join(".")
        ));
    }
}

fn qualified(container: &str, key: &str) -> String {
    if container.is_empty() {
        key.to_string()
    } else {
        format!("{container}.{key}")
    }
}

/// The property must be present, of type `ty`, and one of `choices` if given.
pub fn validate_required_property(
    d: &mut Diagnostics,
    container: &str,
    key: &str,
    value: Option<&Value>,
    ty: JsonType,
    choices: Option<&[&str]>,
) -> bool {
    let path = qualified(container, key);
    match value {
        None => {
            d.error(format!("\"{path}\" is a required field."));
            false
        }
        Some(v) if !ty.matches(v) => {
            d.error(format!("Expected \"{path}\" to be of type {} but got {v}.", ty.as_str()));
            false
        }
        Some(v) => match choices {
            Some(choices) => is_one_of(choices)(d, &path, Some(v), None),
            None => true,
        },
    }
}

pub fn validate_optional_property(
    d: &mut Diagnostics,
    container: &str,
    key: &str,
    value: Option<&Value>,
    ty: JsonType,
    choices: Option<&[&str]>,
) -> bool {
    match value {
        Some(_) => validate_required_property(d, container, key, value, ty, choices),
        None => true,
    }
}

/// At least one of `properties` must be set, and one that is set must have its type.
pub fn validate_at_least_one_property_required(
    d: &mut Diagnostics,
    container: &str,
    properties: &[(&str, Option<&Value>, JsonType)],
) -> bool {
    if properties.iter().all(|(_, value, _)| value.is_none()) {
        let names: Vec<String> = properties
            .iter()
            .map(|(key, _, _)| format!("\"{}\"", qualified(container, key)))
            .collect();
        d.error(format!("{} is required.", names.join(" or ")));
        return false;
    }

    let mut errors = Vec::new();
    for (key, value, ty) in properties {
        if value.is_some_and(|v| ty.matches(v)) {
            return true;
        }
        errors.push(format!(
            "Expected \"{}\" to be of type {} but got {}.",
            qualified(container, key),
            ty.as_str(),
            json(*value)
        ));
    }
    for error in errors {
        d.error(error);
    }
    false
}

pub fn validate_typed_array(d: &mut Diagnostics, container: &str, value: Option<&Value>, ty: JsonType) -> bool {
    let Some(items) = value.and_then(Value::as_array) else {
        d.error(format!(
            "Expected \"{container}\" to be an array of {}s but got {}",
            ty.as_str(),
            json(value)
        ));
        return false;
    };
    let mut valid = true;
    for (i, item) in items.iter().enumerate() {
        let item = Some(item).filter(|v| !v.is_null());
        valid = validate_required_property(d, container, &format!("[{i}]"), item, ty, None) && valid;
    }
    valid
}

pub fn validate_optional_typed_array(
    d: &mut Diagnostics,
    container: &str,
    value: Option<&Value>,
    ty: JsonType,
) -> bool {
    match value {
        Some(_) => validate_typed_array(d, container, value, ty),
        None => true,
    }
}

/// `target[property]` exists, has type `ty`, and is one of `choices` if given.
pub fn is_required_property(
    target: &Map<String, Value>,
    property: &str,
    ty: JsonType,
    choices: Option<&[&str]>,
) -> bool {
    get_defined(target, property).is_some_and(|v| {
        ty.matches(v) && choices.is_none_or(|choices| v.as_str().is_some_and(|s| choices.contains(&s)))
    })
}

/// `target[property]` is absent or has type `ty`.
pub fn is_optional_property(target: &Map<String, Value>, property: &str, ty: JsonType) -> bool {
    get_defined(target, property).is_none_or(|v| ty.matches(v))
}

/// Warn about keys in `rest` that are not in `known`.
pub fn validate_additional_properties<'k>(
    d: &mut Diagnostics,
    field_path: &str,
    rest: impl IntoIterator<Item = &'k str>,
    known: impl IntoIterator<Item = &'k str>,
) -> bool {
    let known: Vec<&str> = known.into_iter().collect();
    let mut unexpected: Vec<&str> = Vec::new();
    for key in rest {
        if !known.contains(&key) && !unexpected.contains(&key) {
            unexpected.push(key);
        }
    }
    if unexpected.is_empty() {
        return true;
    }
    let fields: Vec<String> = unexpected.iter().map(|f| format!("\"{f}\"")).collect();
    d.warn(format!(
        "Unexpected fields found in {field_path} field: {}",
        fields.join(",")
    ));
    false
}

/// Binding names declared by a binding collection.
///
/// Understands a `{bindings: [{name}]}` list, an array of `{binding}`
/// entries, a single `{binding}` object, and a plain record whose keys are
/// the names. Anything else yields no names.
pub fn get_binding_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Object(map)) => {
            let binding_list = map
                .get("bindings")
                .and_then(Value::as_array)
                .filter(|bindings| bindings.iter().all(|b| b.get("name").is_some_and(Value::is_string)));
            if let Some(bindings) = binding_list {
                return bindings
                    .iter()
                    .filter_map(|b| b.get("name").and_then(Value::as_str).map(str::to_string))
                    .collect();
            }
            if let Some(binding) = get_defined(map, "binding") {
                return binding.as_str().map(|s| vec![s.to_string()]).unwrap_or_default();
            }
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k.clone())
                .collect()
        }
        Some(Value::Array(items))
            if items
                .iter()
                .all(|entry| entry.get("binding").is_some_and(Value::is_string)) =>
        {
            items
                .iter()
                .filter_map(|entry| entry.get("binding").and_then(Value::as_str).map(str::to_string))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Every element of the array must have a distinct `name`.
pub fn validate_unique_name_property(
    d: &mut Diagnostics,
    field: &str,
    value: Option<&Value>,
    _: Option<&Environment>,
) -> bool {
    let Some(items) = value.and_then(Value::as_array) else {
        return true;
    };
    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for (order, item) in items.iter().enumerate() {
        let name = json(item.get("name")).trim_matches('"').to_string();
        let entry = counts.entry(name).or_insert((order, 0));
        entry.1 += 1;
    }
    let mut duplicates: Vec<(usize, String)> = counts
        .into_iter()
        .filter(|(_, (_, count))| *count > 1)
        .map(|(name, (order, _))| (order, name))
        .collect();
    if duplicates.is_empty() {
        return true;
    }
    duplicates.sort();
    let list: Vec<String> = duplicates.into_iter().map(|(_, name)| name).collect();
    d.error(format!(
        "\"{field}\" bindings must have unique \"name\" values; duplicate(s) found: \"{}\"",
        list.join("\", \"")
    ));
    false
}
