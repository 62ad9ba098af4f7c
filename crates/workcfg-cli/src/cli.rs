//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// workcfg - Validate and edit worker configuration files
#[derive(Parser, Debug)]
#[command(name = "workcfg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to wrangler.jsonc, wrangler.json or
    /// wrangler.toml in the current directory)
    #[arg(short, long, global = true, env = "WORKCFG_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Validate the configuration and report problems
    ///
    /// Warnings are printed to stderr. Any error makes the command fail.
    Check {
        /// Environment to resolve
        #[arg(short, long)]
        env: Option<String>,

        /// Print the normalized configuration as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge a JSON object into the configuration
    ///
    /// Examples:
    ///   workcfg patch '{"compatibility_date": "2024-09-01"}'
    ///   workcfg patch '{"kv_namespaces": [{"binding": "KV", "id": "abc"}]}'
    Patch {
        /// Patch object, as JSON
        patch: String,

        /// Replace arrays instead of appending to them
        #[arg(long)]
        replace: bool,

        /// Show the diff without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Bind a resource under a unique name
    ///
    /// JSON and JSONC files are edited in place. For TOML files a snippet
    /// is printed to copy into the file.
    AddBinding {
        /// Resource type (d1, r2, kv, vectorize, hyperdrive)
        #[arg(short = 't', long = "type")]
        resource_type: Option<String>,

        /// Identifier of the resource
        #[arg(long)]
        id: String,

        /// Human-readable resource name (defaults to the id)
        #[arg(short, long)]
        name: Option<String>,

        /// Preferred binding name
        #[arg(short, long)]
        binding: Option<String>,

        /// Do not prompt; pick a free name and write the file
        #[arg(short, long)]
        yes: bool,
    },

    /// List the bindings in the configuration
    Bindings,
}
