//! workcfg CLI
//!
//! Validates worker configuration files and edits them without losing
//! comments or formatting.

mod cli;
mod commands;
mod error;
mod interactive;

use std::io::IsTerminal;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use workcfg_bindings::BindingRegistry;

use cli::{Cli, Commands};
use commands::AddBindingArgs;
use error::Result;
use interactive::DialoguerPrompter;

/// Environment variable holding the log filter when `--verbose` is not given.
const LOG_ENV: &str = "WORKCFG_LOG";

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let path = commands::resolve_config_path(&cwd, cli.config.as_deref())?;
    tracing::debug!(?path, "Using configuration file");
    let registry = BindingRegistry::with_builtins();

    match cli.command {
        Commands::Check { env, json } => commands::run_check(&path, env.as_deref(), json),
        Commands::Patch {
            patch,
            replace,
            dry_run,
        } => commands::run_patch(&path, &patch, replace, dry_run),
        Commands::AddBinding {
            resource_type,
            id,
            name,
            binding,
            yes,
        } => {
            let interactive = !yes && std::io::stdin().is_terminal();
            let args = AddBindingArgs {
                resource_type,
                id,
                name,
                binding,
                yes,
            };
            commands::run_add_binding(&path, &registry, args, interactive, &mut DialoguerPrompter)
        }
        Commands::Bindings => commands::run_bindings(&path, &registry),
    }
}

fn init_tracing(verbose: bool) {
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr).with_target(verbose);
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = builder.with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
    if verbose {
        tracing::debug!("Verbose mode enabled");
    }
}
