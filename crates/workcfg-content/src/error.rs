//! Error types for workcfg-content

/// Result type for workcfg-content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or editing configuration documents
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse {format} content: {message}")]
    ParseError { format: String, message: String },

    #[error("Unsupported configuration format: {path}")]
    UnsupportedFormat { path: String },

    #[error(
        "Cannot patch a TOML configuration that contains comments; they would be lost. \
         Remove the comments or switch to wrangler.jsonc"
    )]
    TomlComments,

    #[error("Invalid edit: {message}")]
    InvalidEdit { message: String },

    #[error("Cannot convert value: {message}")]
    Conversion { message: String },

    #[error(transparent)]
    Fs(#[from] workcfg_fs::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }
}
