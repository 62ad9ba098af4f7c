//! Terminal prompts backed by dialoguer

use dialoguer::{Confirm, Input, Select};
use workcfg_bindings::{Prompter, ResourceType};

use crate::error::Result;

pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm(&mut self, question: &str) -> workcfg_bindings::Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()
            .map_err(|e| workcfg_bindings::Error::Prompt(e.to_string()))
    }

    fn prompt(&mut self, question: &str, default: &str) -> workcfg_bindings::Result<String> {
        Input::<String>::new()
            .with_prompt(question)
            .default(default.to_string())
            .interact_text()
            .map_err(|e| workcfg_bindings::Error::Prompt(e.to_string()))
    }
}

/// Ask which kind of resource to bind.
pub fn select_resource_type() -> Result<ResourceType> {
    let names: Vec<&str> = ResourceType::ALL.iter().map(ResourceType::as_str).collect();
    let index = Select::new()
        .with_prompt("Resource type")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(ResourceType::ALL[index])
}
