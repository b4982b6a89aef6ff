//! Error hooks: the single handler every resolver failure is funneled through

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, warn};

use crate::query::ResolutionFailure;

/// Handler invoked with every failure raised by `validate` or `resolve`.
///
/// Returning `Err` propagates the failure to the resolver's caller.
/// Returning `Ok(value)` makes the resolver complete with `value` instead,
/// where `None` stands for "no result".
#[async_trait]
pub trait ErrorHook: Send + Sync {
    /// Hook name for logging and debugging
    fn name(&self) -> &str;

    async fn on_error(&self, failure: ResolutionFailure)
        -> Result<Option<Value>, ResolutionFailure>;
}

/// Default hook: hands the failure straight back to the caller
pub struct Rethrow;

#[async_trait]
impl ErrorHook for Rethrow {
    fn name(&self) -> &str {
        "rethrow"
    }

    async fn on_error(
        &self,
        failure: ResolutionFailure,
    ) -> Result<Option<Value>, ResolutionFailure> {
        Err(failure)
    }
}

/// Logs the failure, then propagates it
pub struct LogAndRethrow;

#[async_trait]
impl ErrorHook for LogAndRethrow {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_error(
        &self,
        failure: ResolutionFailure,
    ) -> Result<Option<Value>, ResolutionFailure> {
        error!("Query '{}' failed: {:#}", failure.query(), failure.inner());
        Err(failure)
    }
}

/// Logs the failure and completes the call without a result
pub struct Swallow;

#[async_trait]
impl ErrorHook for Swallow {
    fn name(&self) -> &str {
        "swallow"
    }

    async fn on_error(
        &self,
        failure: ResolutionFailure,
    ) -> Result<Option<Value>, ResolutionFailure> {
        warn!(
            "Suppressed {} failure in query '{}': {:#}",
            failure.stage(),
            failure.query(),
            failure.inner()
        );
        Ok(None)
    }
}

/// Completes every failed call with a fixed value
pub struct Fallback(pub Value);

#[async_trait]
impl ErrorHook for Fallback {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn on_error(
        &self,
        _failure: ResolutionFailure,
    ) -> Result<Option<Value>, ResolutionFailure> {
        Ok(Some(self.0.clone()))
    }
}

/// Adapts a plain closure into an [`ErrorHook`]
pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> FnHook<F>
where
    F: Fn(ResolutionFailure) -> Result<Option<Value>, ResolutionFailure> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> ErrorHook for FnHook<F>
where
    F: Fn(ResolutionFailure) -> Result<Option<Value>, ResolutionFailure> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_error(
        &self,
        failure: ResolutionFailure,
    ) -> Result<Option<Value>, ResolutionFailure> {
        (self.f)(failure)
    }
}
