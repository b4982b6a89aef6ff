//! Errors raised while building and invoking a validated query

use std::fmt;

use thiserror::Error;

/// Errors raised synchronously while constructing a [`ValidatedQuery`](super::ValidatedQuery)
#[derive(Debug, Error)]
pub enum BuildError {
    /// A reserved option failed its type contract
    #[error("[ValidatedQuery] - `{field}` {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: String,
    },

    /// A mixin did not hand back a replacement options object
    #[error("Error in {query} method: {mixin} didn't return the options object.")]
    MixinContractViolation {
        query: String,
        mixin: MixinLabel,
    },
}

impl BuildError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

/// How a mixin is identified in diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixinLabel {
    /// Explicit label attached with [`Mixin::named`](crate::mixins::Mixin::named)
    Named(String),
    /// 1-based position in the applied sequence
    Position(usize),
}

impl fmt::Display for MixinLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixinLabel::Named(name) => write!(f, "The function '{}'", name),
            MixinLabel::Position(index) => write!(f, "mixin #{}", index),
        }
    }
}

/// Which step of the resolver raised the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Resolve,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validate => f.write_str("validation"),
            Stage::Resolve => f.write_str("resolution"),
        }
    }
}

/// A failure raised by `validate` or `resolve` during a resolver call.
///
/// The error produced by the user callable is kept untouched and can be
/// recovered with [`ResolutionFailure::into_inner`].
#[derive(Debug, Error)]
#[error("{stage} failed in {query}: {source}")]
pub struct ResolutionFailure {
    query: String,
    stage: Stage,
    #[source]
    source: anyhow::Error,
}

impl ResolutionFailure {
    pub fn new(query: impl Into<String>, stage: Stage, source: anyhow::Error) -> Self {
        Self {
            query: query.into(),
            stage,
            source,
        }
    }

    /// Name of the query whose resolver failed
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The error raised by the user callable
    pub fn inner(&self) -> &anyhow::Error {
        &self.source
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.source
    }
}
