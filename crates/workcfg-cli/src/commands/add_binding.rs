//! Add-binding command implementation

use std::path::Path;

use colored::Colorize;
use workcfg_bindings::{
    AddBindingOptions, AddBindingOutcome, BindingRegistry, Prompter, ResourceBinding, ResourceType, add_binding,
};

use crate::error::{CliError, Result};
use crate::interactive::select_resource_type;

#[derive(Debug, Clone, Default)]
pub struct AddBindingArgs {
    pub resource_type: Option<String>,
    pub id: String,
    pub name: Option<String>,
    pub binding: Option<String>,
    pub yes: bool,
}

/// Bind the described resource in the configuration at `path`.
///
/// Prompts only when `interactive` is set; otherwise a free name is chosen
/// and JSON files are written only with `--yes`.
pub fn run_add_binding(
    path: &Path,
    registry: &BindingRegistry,
    args: AddBindingArgs,
    interactive: bool,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let resource_type = match args.resource_type.as_deref() {
        Some(value) => value.parse::<ResourceType>()?,
        None if interactive => select_resource_type()?,
        None => return Err(CliError::user("Missing --type (one of d1, r2, kv, vectorize, hyperdrive)")),
    };
    let name = args.name.unwrap_or_else(|| args.id.clone());
    let mut resource = ResourceBinding::new(resource_type, args.id, name);
    if let Some(binding) = args.binding {
        resource = resource.with_binding(binding);
    }

    let options = AddBindingOptions {
        interactive,
        assume_yes: args.yes,
    };
    match add_binding(path, registry, &resource, &options, prompter)? {
        AddBindingOutcome::AlreadyBound { binding } => {
            let binding = binding.unwrap_or_else(|| "(unnamed)".to_string());
            println!(
                "{} {} \"{}\" is already bound as {}",
                "=>".blue().bold(),
                resource_type,
                resource.id,
                binding.cyan()
            );
        }
        AddBindingOutcome::Patched { binding, .. } => {
            println!(
                "{} Added binding {} to {}",
                "OK".green().bold(),
                binding.cyan(),
                path.display()
            );
        }
        AddBindingOutcome::Snippet { binding, text } => {
            eprintln!(
                "Add the binding {} by copying this into {}:",
                binding.cyan(),
                path.display()
            );
            println!("{text}");
        }
    }
    Ok(())
}
