//! Copy-pasteable configuration fragments

use serde::Serialize;
use serde_json::{Map, Value};
use toml_edit::{ArrayOfTables, DocumentMut, InlineTable, Item, Table};

use crate::error::{Error, Result};
use crate::format::ConfigFormat;

/// Render one binding entry under `config_key` in the style of `format`.
///
/// TOML gets an array-of-tables entry, JSON and JSONC a `"key": [ ... ]`
/// property that can be pasted into the top-level object.
pub fn render_snippet(format: ConfigFormat, config_key: &str, binding: &Map<String, Value>) -> Result<String> {
    match format {
        ConfigFormat::Toml => {
            let mut table = Table::new();
            for (key, value) in binding {
                table.insert(key, Item::Value(json_to_edit_value(value)?));
            }
            let mut entries = ArrayOfTables::new();
            entries.push(table);

            let mut doc = DocumentMut::new();
            doc.insert(config_key, Item::ArrayOfTables(entries));
            Ok(doc.to_string())
        }
        ConfigFormat::Json | ConfigFormat::Jsonc => {
            let entries = Value::Array(vec![Value::Object(binding.clone())]);
            let mut buf = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            entries.serialize(&mut ser)?;
            let body = String::from_utf8(buf).map_err(|e| Error::conversion(e.to_string()))?;
            Ok(format!("{}: {}", serde_json::to_string(config_key)?, body))
        }
    }
}

fn json_to_edit_value(value: &Value) -> Result<toml_edit::Value> {
    Ok(match value {
        Value::Null => return Err(Error::conversion("TOML does not support null values")),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.into(),
            (None, Some(f)) => f.into(),
            _ => return Err(Error::conversion(format!("{n} does not fit a TOML number"))),
        },
        Value::String(s) => s.as_str().into(),
        Value::Array(items) => {
            let mut array = toml_edit::Array::new();
            for item in items {
                array.push(json_to_edit_value(item)?);
            }
            toml_edit::Value::Array(array)
        }
        Value::Object(map) => {
            let mut table = InlineTable::new();
            for (key, item) in map {
                table.insert(key, json_to_edit_value(item)?);
            }
            toml_edit::Value::InlineTable(table)
        }
    })
}
