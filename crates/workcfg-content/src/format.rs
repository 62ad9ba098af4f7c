//! Configuration file formats

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Toml,
    Json,
    Jsonc,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "jsonc" => Some(Self::Jsonc),
            _ => None,
        }
    }

    /// Detect format from a file path, failing for anything unrecognized
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.display().to_string(),
            })
    }

    /// JSON and JSONC share a parser and an editor
    pub fn is_json_like(&self) -> bool {
        matches!(self, Self::Json | Self::Jsonc)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Jsonc => "JSONC",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
            Self::Jsonc => "jsonc",
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("wrangler.toml", ConfigFormat::Toml)]
    #[case("wrangler.json", ConfigFormat::Json)]
    #[case("wrangler.jsonc", ConfigFormat::Jsonc)]
    #[case("WRANGLER.JSONC", ConfigFormat::Jsonc)]
    fn detects_format_from_path(#[case] path: &str, #[case] expected: ConfigFormat) {
        assert_eq!(ConfigFormat::from_path(Path::new(path)).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = ConfigFormat::from_path(Path::new("wrangler.yaml")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("wrangler.yaml"));
    }

    #[test]
    fn json_like() {
        assert!(ConfigFormat::Json.is_json_like());
        assert!(ConfigFormat::Jsonc.is_json_like());
        assert!(!ConfigFormat::Toml.is_json_like());
    }
}
