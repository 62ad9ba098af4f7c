//! Raw configuration documents loaded from disk

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::convert::parse_document;
use crate::error::Result;
use crate::format::ConfigFormat;

/// A configuration file as read from disk: its text and its parsed value.
#[derive(Debug, Clone)]
pub struct RawDocument {
    path: PathBuf,
    format: ConfigFormat,
    source: String,
    value: Map<String, Value>,
}

impl RawDocument {
    /// Read and parse the file at `path`, detecting the format from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let source = workcfg_fs::read_text(path)?;
        let value = parse_document(&source, format)?;
        tracing::debug!(?path, %format, "Loaded configuration document");
        Ok(Self {
            path: path.to_path_buf(),
            format,
            source,
            value,
        })
    }

    /// Parse in-memory text with an explicit format
    pub fn parse_as(path: impl Into<PathBuf>, source: &str, format: ConfigFormat) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            format,
            source: source.to_string(),
            value: parse_document(source, format)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn value(&self) -> &Map<String, Value> {
        &self.value
    }

    pub fn into_value(self) -> Map<String, Value> {
        self.value
    }
}
