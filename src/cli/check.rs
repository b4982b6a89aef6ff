//! Check command implementation

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::load_config;

/// Inspect a registry configuration
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Print the configuration as TOML
    #[arg(long)]
    pub dump: bool,
}

impl CheckCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let config = load_config(config_path)?;
        let registry = config.to_registry::<()>()?;

        eprintln!("{} Configuration is valid\n", "✓".green().bold());
        eprintln!("  {} {}", "error hook:".dimmed(), registry.error_hook().name().cyan());

        if config.global_mixins.is_empty() {
            eprintln!("  {} {}", "global mixins:".dimmed(), "none".dimmed());
        } else {
            eprintln!("  {}", "global mixins:".dimmed());
            for (index, name) in config.global_mixins.iter().enumerate() {
                eprintln!("    {} {}", format!("{}.", index + 1).dimmed(), name.cyan());
            }
        }
        eprintln!();

        if self.dump {
            print!("{}", toml::to_string_pretty(&config)?);
        }

        Ok(())
    }
}
