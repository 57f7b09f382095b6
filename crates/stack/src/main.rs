//! `stack` command line interface

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stack_config::{Config, parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

mod commands;

#[derive(Parser)]
#[command(name = "stack")]
#[command(about = "Stack orchestrator - install, start, stop and uninstall components")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "stack.yaml")]
    config: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an action to components
    Run {
        /// Action to perform (install, uninstall, start, stop)
        action: String,

        /// Components to act on, e.g. `db,nova(api,compute)`
        #[arg(short = 'C', long, required = true)]
        components: Vec<String>,

        /// Root directory components install under
        #[arg(short, long)]
        dir: PathBuf,

        /// Do not pull in dependencies of the requested components
        #[arg(long)]
        ignore_deps: bool,

        /// Components visible to the others but not acted upon
        #[arg(short, long)]
        ref_components: Vec<String>,

        /// Skip components whose trace file is missing when stopping or uninstalling
        #[arg(short, long)]
        force: bool,
    },

    /// List the component catalog
    List,
}

fn log_level(verbose: bool, config: &Config) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    config
        .settings
        .log_level
        .as_deref()
        .and_then(|level| level.parse().ok())
        .unwrap_or(Level::INFO)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = parser::parse_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose, &config))
        .with_target(false)
        .init();

    smol::block_on(async {
        match cli.command {
            Commands::Run {
                action,
                components,
                dir,
                ignore_deps,
                ref_components,
                force,
            } => {
                let args = commands::run::RunArgs {
                    action,
                    components,
                    dir,
                    ignore_deps,
                    ref_components,
                    force,
                };
                let ok = commands::run::run(&config, args).await?;
                Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
            }
            Commands::List => {
                commands::list::run(&config)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    })
}
