//! Echo command implementation

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use super::load_config;
use crate::query::{QueryOptions, ValidatedQuery};
use crate::utils::format_duration;

/// Resolve the echo query, which returns its `value` argument
#[derive(Args, Debug)]
pub struct EchoCommand {
    /// Arguments as a JSON document
    #[arg(short, long, default_value = "{}")]
    pub args: String,

    /// Payload entries for the query as a JSON object
    #[arg(long)]
    pub extras: Option<String>,
}

impl EchoCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let config = load_config(config_path)?;
        let registry = Arc::new(config.to_registry::<()>()?);

        let args: Value = serde_json::from_str(&self.args).context("--args is not valid JSON")?;
        let mut options = QueryOptions::builder()
            .name("echo")
            .validate(|args| {
                if args.get("value").is_none() {
                    bail!("missing `value` argument");
                }
                Ok(())
            })
            .resolve(|_, args: Value, _| async move { Ok(args["value"].clone()) });
        if let Some(extras) = &self.extras {
            options = options
                .extras(serde_json::from_str(extras).context("--extras is not valid JSON")?);
        }

        let query = ValidatedQuery::with_registry(options, &registry)?;

        let start = Instant::now();
        let outcome = query.resolver().call(Value::Null, args, Arc::new(())).await?;

        match outcome {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => eprintln!("{} No result (failure absorbed by error hook)", "•".yellow()),
        }
        eprintln!(
            "\n{} Resolved in {}\n",
            "✓".green().bold(),
            format_duration(start.elapsed()).dimmed()
        );

        Ok(())
    }
}
