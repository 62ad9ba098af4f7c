//! Bindings command implementation

use std::path::Path;

use colored::Colorize;
use serde_json::Value;
use workcfg_bindings::BindingRegistry;
use workcfg_content::RawDocument;

use crate::error::Result;

/// Print every binding of a registered resource type, grouped by type.
pub fn run_bindings(path: &Path, registry: &BindingRegistry) -> Result<()> {
    let document = RawDocument::load(path)?;
    let config = document.value();
    let mut found = false;

    for entry in registry.iter() {
        let names: Vec<&str> = config
            .get(entry.config_key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|binding| binding.get("binding").and_then(Value::as_str))
            .collect();
        if names.is_empty() {
            continue;
        }
        found = true;
        println!("{}", entry.config_key.cyan().bold());
        for name in names {
            println!("  {name}");
        }
    }

    if !found {
        println!("No bindings in {}", path.display());
    }
    Ok(())
}
