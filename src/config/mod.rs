//! Configuration handling
//!
//! Parses `registry.toml` files describing the global mixins and the error
//! hook of a [`QueryRegistry`].

mod schema;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use schema::*;

use crate::mixins::{self, BUILTIN_MIXINS};
use crate::registry::{LogAndRethrow, QueryRegistry, Swallow};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Built-in mixins applied to every query, in order
    #[serde(default)]
    pub global_mixins: Vec<String>,

    /// Error hook settings
    #[serde(default)]
    pub error_hook: HookConfig,
}

impl RegistryConfig {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path).with_context(|| {
            format!("Failed to read config file: {}", canonical_path.display())
        })?;

        Self::parse(&content)
            .with_context(|| format!("Invalid registry config: {}", canonical_path.display()))
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: RegistryConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        for name in &self.global_mixins {
            if !BUILTIN_MIXINS.contains(&name.as_str()) {
                anyhow::bail!(
                    "Unknown mixin '{}' (available: {})",
                    name,
                    BUILTIN_MIXINS.join(", ")
                );
            }
        }
        Ok(())
    }

    /// Build a registry with the configured hook and global mixins
    pub fn to_registry<C>(&self) -> Result<QueryRegistry<C>>
    where
        C: Send + Sync + 'static,
    {
        let registry = QueryRegistry::new();

        for name in &self.global_mixins {
            let mixin = mixins::by_name(name)
                .with_context(|| format!("Unknown mixin '{}'", name))?;
            registry.register_mixin(mixin);
        }

        match self.error_hook.mode {
            HookMode::Rethrow => {}
            HookMode::Log => registry.set_error_hook(LogAndRethrow),
            HookMode::Swallow => registry.set_error_hook(Swallow),
        }

        Ok(registry)
    }
}
