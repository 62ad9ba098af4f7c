//! Check command implementation

use std::path::Path;

use colored::Colorize;
use workcfg_config::{NormalizeArgs, read_config};

use crate::error::Result;

/// Normalize the configuration, print its warnings and fail on errors.
pub fn run_check(path: &Path, env: Option<&str>, json: bool) -> Result<()> {
    let args = NormalizeArgs {
        env: env.map(str::to_string),
        ..NormalizeArgs::default()
    };
    let normalized = read_config(path, &args)?;

    if normalized.diagnostics.has_warnings() {
        eprintln!("{}", normalized.diagnostics.render_warnings().yellow());
    }
    let normalized = normalized.into_result()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&normalized.config)?);
    } else {
        println!("{} {} is valid.", "OK".green().bold(), path.display());
    }
    Ok(())
}
