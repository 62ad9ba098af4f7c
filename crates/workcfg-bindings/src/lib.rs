//! Resource bindings for workcfg
//!
//! A [`BindingRegistry`] describes how each bindable resource type appears in
//! a configuration. [`add_binding`] uses it to insert a new binding under a
//! name that does not clash with existing ones.

pub mod error;
pub mod flow;
pub mod naming;
pub mod prompt;
pub mod registry;
pub mod types;

pub use error::{Error, Result};
pub use flow::{AddBindingOptions, AddBindingOutcome, add_binding};
pub use naming::{generate_unique_binding_name, is_valid_binding_name, prompt_for_valid_binding_name};
pub use prompt::{Prompter, ScriptedPrompter};
pub use registry::{BindingRegistry, RegistryEntry};
pub use types::{ResourceBinding, ResourceType};
