//! validated-query library
//!
//! Wraps query resolvers with argument validation, construction-time mixin
//! composition, and a shared error hook.

pub mod cli;
pub mod config;
pub mod mixins;
pub mod query;
pub mod registry;
pub mod utils;

pub use cli::Cli;
pub use config::RegistryConfig;
pub use mixins::Mixin;
pub use query::{BuildError, QueryOptions, ResolutionFailure, Resolver, ValidatedQuery};
pub use registry::{ErrorHook, QueryRegistry};
