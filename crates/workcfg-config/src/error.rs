//! Error types for workcfg-config

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Content(#[from] workcfg_content::Error),

    #[error("{0}")]
    Validation(String),
}
