//! PQBench - hybrid post-quantum TLS benchmark tooling
//!
//! Generates and inspects root CA records, prints the algorithm matrix and
//! self-checks certificate chains. Measured runs need a TLS engine and are
//! driven through the harness library.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pqbench_cli::{commands, config, Overrides};
use pqbench_core::{RootFamily, SecurityLevel};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "pqbench")]
#[command(about = "Hybrid post-quantum TLS benchmark tooling")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "PQBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a hybrid root CA record
    GenRoot {
        /// Hybrid signature algorithm, e.g. P384_Dilithium3
        #[arg(short, long)]
        algorithm: String,
    },

    /// Load and print a persisted root CA record
    ShowRoot {
        #[arg(short, long)]
        family: RootFamily,

        #[arg(short, long, value_parser = parse_level)]
        level: SecurityLevel,
    },

    /// Print the algorithm pair matrix with ports and skip reasons
    Plan {
        #[arg(long)]
        json: bool,
    },

    /// Build a chain at one level and validate a freshly issued leaf
    CheckChain {
        #[arg(short, long, value_parser = parse_level)]
        level: SecurityLevel,
    },
}

fn parse_level(s: &str) -> std::result::Result<SecurityLevel, String> {
    let level: u8 = s.parse().map_err(|_| format!("'{}' is not a level", s))?;
    SecurityLevel::try_from(level).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},pqbench_cli=debug", log_level).into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.overrides.apply(config::load(cli.config.as_deref())?)?;
    debug!(?config, "Configuration loaded");

    let output = match cli.command {
        Command::GenRoot { algorithm } => {
            commands::gen_root(&config, &cli.overrides.root_dir(&config), &algorithm)?
        }
        Command::ShowRoot { family, level } => {
            commands::show_root(&config, &cli.overrides.root_dir(&config), family, level)?
        }
        Command::Plan { json } => commands::plan(&config, json)?,
        Command::CheckChain { level } => commands::check_chain(&config, level)?,
    };
    print!("{}", output);
    Ok(())
}
