//! PQBench command-line support
//!
//! Configuration loading with flag overrides, plus the root, plan and chain
//! subcommands of the `pqbench` binary.

pub mod commands;
pub mod config;

pub use config::Overrides;
