//! Conversion between TOML and JSON values

use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::format::ConfigFormat;
use crate::jsonc;

/// Convert a TOML value into JSON. Datetimes become their string form.
pub fn toml_to_json(value: &toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number((*i).into()),
        toml::Value::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| Error::conversion(format!("{f} has no JSON representation")))?,
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            Value::Array(items.iter().map(toml_to_json).collect::<Result<_>>()?)
        }
        toml::Value::Table(table) => {
            let mut map = Map::new();
            for (key, value) in table {
                map.insert(key.clone(), toml_to_json(value)?);
            }
            Value::Object(map)
        }
    })
}

/// Convert a JSON value into TOML. TOML has no null, so nulls are rejected.
pub fn json_to_toml(json: &Value) -> Result<toml::Value> {
    match json {
        Value::Null => Err(Error::conversion("TOML does not support null values")),
        Value::Bool(b) => Ok(toml::Value::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(toml::Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(toml::Value::Float(f))
            } else {
                Err(Error::conversion(format!("{n} does not fit a TOML number")))
            }
        }
        Value::String(s) => Ok(toml::Value::String(s.clone())),
        Value::Array(arr) => {
            let items: Result<Vec<toml::Value>> = arr.iter().map(json_to_toml).collect();
            Ok(toml::Value::Array(items?))
        }
        Value::Object(obj) => {
            let mut table = toml::map::Map::new();
            for (k, v) in obj {
                table.insert(k.clone(), json_to_toml(v)?);
            }
            Ok(toml::Value::Table(table))
        }
    }
}

/// Serialize a JSON object as a TOML document.
pub fn to_toml_string(json: &Value) -> Result<String> {
    let value = json_to_toml(json)?;
    toml::to_string(&value).map_err(|e| Error::conversion(e.to_string()))
}

/// Parse document text into a JSON object.
///
/// An empty JSON document is treated as an empty object.
pub fn parse_document(text: &str, format: ConfigFormat) -> Result<Map<String, Value>> {
    let value = match format {
        ConfigFormat::Toml => {
            let table: toml::Table =
                toml::from_str(text).map_err(|e| Error::parse(format.name(), e.message()))?;
            toml_to_json(&toml::Value::Table(table))?
        }
        ConfigFormat::Json | ConfigFormat::Jsonc => jsonc::parse_value(text)?,
    };
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::parse(
            format.name(),
            format!("expected a top-level object but found {}", type_name(&other)),
        )),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
