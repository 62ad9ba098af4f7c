//! Patch command implementation

use std::path::Path;

use colored::Colorize;
use serde_json::Value;
use workcfg_content::{ConfigFormat, PatchMode, PatchOptions, patch_config, patch_text, render_diff};

use crate::error::{CliError, Result};

/// Apply the JSON object in `patch` to the configuration at `path`.
pub fn run_patch(path: &Path, patch: &str, replace: bool, dry_run: bool) -> Result<()> {
    let patch: Value = serde_json::from_str(patch)?;
    if !patch.is_object() {
        return Err(CliError::user("The patch must be a JSON object"));
    }
    let mode = if replace { PatchMode::Replace } else { PatchMode::Append };
    let original = workcfg_fs::read_text(path)?;
    let label = path.display().to_string();

    if dry_run {
        let format = ConfigFormat::from_path(path)?;
        let patched = patch_text(&original, format, &patch, mode, &PatchOptions::default())?;
        print_diff(&label, &original, &patched);
        println!("{} Dry run, nothing written.", "=>".blue().bold());
        return Ok(());
    }

    let patched = patch_config(path, &patch, mode)?;
    print_diff(&label, &original, &patched);
    println!("{} Patched {}", "OK".green().bold(), label);
    Ok(())
}

fn print_diff(label: &str, old: &str, new: &str) {
    if old == new {
        println!("No changes.");
    } else {
        print!("{}", render_diff(label, old, new));
    }
}
