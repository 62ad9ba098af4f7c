//! Structural patching of configuration files
//!
//! A patch is a JSON object shaped like the configuration it updates. It is
//! flattened into `(path, value)` pairs, each pair becomes one minimal text
//! edit, and the result is reformatted once at the end. TOML files take a
//! detour through JSON text, which is why they must be free of comments.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::convert::{parse_document, to_toml_string, type_name};
use crate::edit::apply_edits;
use crate::error::{Error, Result};
use crate::format::ConfigFormat;
use crate::jsonc::{self, FormattingOptions, ModifyOptions};
use crate::path::{PathSegment, display_path};

/// How arrays in a patch combine with arrays already in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchMode {
    /// Every array element in the patch is appended.
    #[default]
    Append,
    /// Array elements address the existing element at the same index.
    Replace,
}

/// Options for [`patch_text`].
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Layout of the final reformat pass
    pub formatting: FormattingOptions,
}

/// Flatten a patch into the `(path, value)` pairs that make it up.
///
/// Objects are walked key by key. Empty objects and arrays contribute
/// nothing. `null` is an ordinary scalar.
pub fn flatten_patch(patch: &Value, mode: PatchMode) -> Vec<(Vec<PathSegment>, Value)> {
    let mut out = Vec::new();
    flatten_into(patch, &mut Vec::new(), mode, &mut out);
    out
}

fn flatten_into(
    value: &Value,
    path: &mut Vec<PathSegment>,
    mode: PatchMode,
    out: &mut Vec<(Vec<PathSegment>, Value)>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(PathSegment::key(key));
                flatten_into(child, path, mode, out);
                path.pop();
            }
        }
        Value::Array(items) => match mode {
            PatchMode::Append => {
                for item in items {
                    let mut item_path = path.clone();
                    item_path.push(PathSegment::Append);
                    out.push((item_path, item.clone()));
                }
            }
            PatchMode::Replace => {
                for (index, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    if item.is_object() || item.is_array() {
                        flatten_into(item, path, mode, out);
                    } else {
                        out.push((path.clone(), item.clone()));
                    }
                    path.pop();
                }
            }
        },
        scalar => out.push((path.clone(), scalar.clone())),
    }
}

/// Apply `(path, value)` edits to document text and return the new text.
///
/// In [`PatchMode::Append`] an index segment inserts before the existing
/// element; in [`PatchMode::Replace`] it overwrites it.
pub fn apply_path_edits(
    text: &str,
    format: ConfigFormat,
    edits: &[(Vec<PathSegment>, Value)],
    mode: PatchMode,
    options: &PatchOptions,
) -> Result<String> {
    let mut json = match format {
        ConfigFormat::Json | ConfigFormat::Jsonc => text.to_string(),
        ConfigFormat::Toml => {
            if text.contains('#') {
                return Err(Error::TomlComments);
            }
            serde_json::to_string(&Value::Object(parse_document(text, format)?))?
        }
    };

    let modify_options = ModifyOptions {
        array_insertion: mode == PatchMode::Append,
    };
    for (path, value) in edits {
        tracing::trace!(path = %display_path(path), "Applying patch edit");
        let text_edits = jsonc::modify(&json, path, value, &modify_options)?;
        json = apply_edits(&json, &text_edits)?;
    }

    let format_edits = jsonc::format(&json, None, &options.formatting);
    json = apply_edits(&json, &format_edits)?;

    match format {
        ConfigFormat::Json | ConfigFormat::Jsonc => Ok(json),
        ConfigFormat::Toml => to_toml_string(&jsonc::parse_value(&json)?),
    }
}

/// Apply `patch` to document text. This is the side-effect free core of
/// [`patch_config`].
pub fn patch_text(
    text: &str,
    format: ConfigFormat,
    patch: &Value,
    mode: PatchMode,
    options: &PatchOptions,
) -> Result<String> {
    if !patch.is_object() {
        return Err(Error::InvalidEdit {
            message: format!("a patch must be an object, got {}", type_name(patch)),
        });
    }
    let edits = flatten_patch(patch, mode);
    apply_path_edits(text, format, &edits, mode, options)
}

/// Patch the configuration file at `path` in place and return its new text.
///
/// Nothing is written when the patch cannot be applied.
pub fn patch_config(path: &Path, patch: &Value, mode: PatchMode) -> Result<String> {
    let format = ConfigFormat::from_path(path)?;
    let text = workcfg_fs::read_text(path)?;
    let patched = patch_text(&text, format, patch, mode, &PatchOptions::default())?;
    workcfg_fs::write_text(path, &patched)?;
    tracing::info!(?path, ?mode, "Patched configuration");
    Ok(patched)
}
