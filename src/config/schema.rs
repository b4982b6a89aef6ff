//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Error hook configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    /// Which built-in hook handles resolver failures
    #[serde(default)]
    pub mode: HookMode,
}

/// Built-in error hooks selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookMode {
    /// Propagate failures to the caller
    #[default]
    Rethrow,
    /// Log failures, then propagate them
    Log,
    /// Log failures and complete the call without a result
    Swallow,
}

impl HookMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookMode::Rethrow => "rethrow",
            HookMode::Log => "log",
            HookMode::Swallow => "swallow",
        }
    }
}
