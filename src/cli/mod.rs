//! Command-line interface for validated-query
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `check`: Inspect a registry configuration
//! - `echo`: Run the echo query against a configured registry

mod check;
mod echo;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

pub use check::CheckCommand;
pub use echo::EchoCommand;

use crate::config::RegistryConfig;

/// Validated, mixin-composable resolvers
#[derive(Parser, Debug)]
#[command(name = "validated-query")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to registry.toml config file
    #[arg(short, long, global = true, default_value = "registry.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the error hook and global mixins a config produces
    Check(CheckCommand),

    /// Resolve the echo query with the given arguments
    Echo(EchoCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Commands::Check(cmd) => cmd.execute(&self.config).await,
            Commands::Echo(cmd) => cmd.execute(&self.config).await,
        }
    }
}

/// Load the registry config, falling back to defaults when the file is absent
fn load_config(config_path: &str) -> Result<RegistryConfig> {
    if !Path::new(config_path).exists() {
        info!("No config at {}, using defaults", config_path);
        return Ok(RegistryConfig::default());
    }

    info!("Loading configuration from {}", config_path);
    RegistryConfig::load(config_path)
}

/// Print the banner
fn print_banner() {
    eprintln!(
        "\n{} {}\n",
        "validated-query".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
