//! Adding a resource binding to a configuration file

use std::path::Path;

use serde_json::{Map, Value};
use workcfg_content::{PatchMode, RawDocument, patch_config, render_snippet};

use crate::error::Result;
use crate::naming::{generate_unique_binding_name, prompt_for_valid_binding_name};
use crate::prompt::Prompter;
use crate::registry::BindingRegistry;
use crate::types::ResourceBinding;

#[derive(Debug, Clone, Copy, Default)]
pub struct AddBindingOptions {
    /// Ask for the binding name and for permission to write
    pub interactive: bool,
    /// Write without asking
    pub assume_yes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddBindingOutcome {
    /// The resource is already bound; nothing changed.
    AlreadyBound { binding: Option<String> },
    /// The file was patched; `text` is its new content.
    Patched { binding: String, text: String },
    /// The file was left alone; `text` is a fragment to paste by hand.
    Snippet { binding: String, text: String },
}

/// Add `resource` to the configuration at `path`.
///
/// JSON and JSONC files are patched in place when the caller agrees. TOML
/// files are never rewritten; a snippet is returned instead.
pub fn add_binding(
    path: &Path,
    registry: &BindingRegistry,
    resource: &ResourceBinding,
    options: &AddBindingOptions,
    prompter: &mut dyn Prompter,
) -> Result<AddBindingOutcome> {
    let document = RawDocument::load(path)?;
    let config = document.value();
    let entry = registry.entry(resource.resource_type)?;

    if let Some(existing) = registry.find_existing(config, resource)? {
        let binding = existing.get("binding").and_then(Value::as_str).map(str::to_string);
        tracing::debug!(id = %resource.id, ?binding, "Resource already bound");
        return Ok(AddBindingOutcome::AlreadyBound { binding });
    }

    let binding = if options.interactive {
        prompt_for_valid_binding_name(registry, config, resource, prompter)?
    } else {
        generate_unique_binding_name(registry, config, resource)?
    };
    let binding_config = registry.create_binding_config(resource, &binding)?;

    let format = document.format();
    if format.is_json_like() {
        let write = options.assume_yes
            || (options.interactive
                && prompter.confirm(&format!(
                    "Add the binding \"{binding}\" to {}?",
                    path.display()
                ))?);
        if write {
            let mut patch = Map::new();
            patch.insert(entry.config_key.to_string(), Value::Array(vec![Value::Object(binding_config)]));
            let text = patch_config(path, &Value::Object(patch), PatchMode::Append)?;
            return Ok(AddBindingOutcome::Patched { binding, text });
        }
        tracing::warn!(?path, "Not writing binding, falling back to snippet");
    }

    let text = render_snippet(format, entry.config_key, &binding_config)?;
    Ok(AddBindingOutcome::Snippet { binding, text })
}
