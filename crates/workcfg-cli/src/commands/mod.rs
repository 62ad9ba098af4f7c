//! Command implementations for workcfg-cli

pub mod add_binding;
pub mod bindings;
pub mod check;
pub mod patch;

pub use add_binding::{AddBindingArgs, run_add_binding};
pub use bindings::run_bindings;
pub use check::run_check;
pub use patch::run_patch;

use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Looked up in order when no configuration path is given.
const DEFAULT_CONFIG_FILES: &[&str] = &["wrangler.jsonc", "wrangler.json", "wrangler.toml"];

/// The configuration file to operate on.
pub fn resolve_config_path(cwd: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(cwd.join(path));
    }
    DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| cwd.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            CliError::user(format!(
                "No configuration file found in {}. Expected one of: {}",
                cwd.display(),
                DEFAULT_CONFIG_FILES.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_jsonc_preferred_over_toml() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("wrangler.toml"), "").unwrap();
        fs::write(temp_dir.path().join("wrangler.jsonc"), "{}").unwrap();

        let path = resolve_config_path(temp_dir.path(), None).unwrap();
        assert_eq!(path, temp_dir.path().join("wrangler.jsonc"));
    }

    #[test]
    fn test_explicit_path_is_relative_to_cwd() {
        let temp_dir = TempDir::new().unwrap();
        let path = resolve_config_path(temp_dir.path(), Some(Path::new("conf/app.toml"))).unwrap();
        assert_eq!(path, temp_dir.path().join("conf/app.toml"));
    }

    #[test]
    fn test_missing_config_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = resolve_config_path(temp_dir.path(), None).unwrap_err();
        assert!(matches!(err, CliError::User { .. }));
        assert!(err.to_string().contains("wrangler.jsonc, wrangler.json, wrangler.toml"));
    }
}
