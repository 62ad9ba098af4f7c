//! Error types for workcfg-bindings

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Content(#[from] workcfg_content::Error),

    #[error("Unsupported resource type: {resource_type}")]
    UnsupportedResourceType { resource_type: String },

    #[error("The binding name \"{name}\" is already in use")]
    BindingConflict { name: String },

    #[error("Prompt failed: {0}")]
    Prompt(String),
}
