//! Query options: the configuration record flowing through the mixin pipeline

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use super::error::BuildError;
use crate::mixins::Mixin;

/// Keys owned by the pipeline itself; they cannot appear in the payload
pub const RESERVED_KEYS: [&str; 5] = ["name", "resolve", "run", "validate", "mixins"];

/// Future returned by a resolve function
pub type ResolveFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// The work performed by a query: `(parent, args, context) -> result`
pub type ResolveFn<C> = Arc<dyn Fn(Value, Value, Arc<C>) -> ResolveFuture + Send + Sync>;

/// Argument check run before `resolve`
pub type ValidateFn = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Wrap an async closure as a [`ResolveFn`]
pub fn resolve_fn<C, F, Fut>(f: F) -> ResolveFn<C>
where
    F: Fn(Value, Value, Arc<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |parent, args, ctx| f(parent, args, ctx).boxed())
}

/// Wrap a closure as a [`ValidateFn`]
pub fn validate_fn<F>(f: F) -> ValidateFn
where
    F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn noop_validate() -> ValidateFn {
    Arc::new(|_| Ok(()))
}

/// Effective configuration of a query.
///
/// `run` is the field mixins set to change behavior. After every mixin step
/// `resolve` is overwritten with `run`, so a mixin that only assigns `resolve`
/// has no effect.
pub struct QueryOptions<C> {
    /// Identifier used in diagnostics
    pub name: String,
    pub resolve: ResolveFn<C>,
    pub run: ResolveFn<C>,
    pub validate: ValidateFn,
    /// Mixins applied at construction; kept for inspection only
    pub mixins: Vec<Mixin<C>>,
    /// Opaque payload read or rewritten by mixins
    pub extras: Map<String, Value>,
}

impl<C> QueryOptions<C> {
    /// Start building the construction input of a query
    pub fn builder() -> QueryOptionsBuilder<C> {
        QueryOptionsBuilder::default()
    }

    /// Look up a payload entry
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// Whether `resolve` and `run` point at the same callable
    pub fn is_aliased(&self) -> bool {
        Arc::ptr_eq(&self.resolve, &self.run)
    }
}

impl<C> Clone for QueryOptions<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            resolve: Arc::clone(&self.resolve),
            run: Arc::clone(&self.run),
            validate: Arc::clone(&self.validate),
            mixins: self.mixins.clone(),
            extras: self.extras.clone(),
        }
    }
}

impl<C> fmt::Debug for QueryOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("name", &self.name)
            .field("mixins", &self.mixins)
            .field("extras", &self.extras)
            .finish_non_exhaustive()
    }
}

/// Construction input of a [`ValidatedQuery`](super::ValidatedQuery).
///
/// Type contracts are checked by [`QueryOptionsBuilder::build`], which the
/// query constructor calls before running any mixin.
pub struct QueryOptionsBuilder<C> {
    name: Option<String>,
    resolve: Option<ResolveFn<C>>,
    validate: Option<ValidateFn>,
    mixins: Vec<Mixin<C>>,
    extras: Value,
}

impl<C> Default for QueryOptionsBuilder<C> {
    fn default() -> Self {
        Self {
            name: None,
            resolve: None,
            validate: None,
            mixins: Vec::new(),
            extras: Value::Object(Map::new()),
        }
    }
}

impl<C> QueryOptionsBuilder<C> {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the resolve function from an async closure
    pub fn resolve<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Value, Value, Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.resolve_with(resolve_fn(f))
    }

    /// Set an already wrapped resolve function
    pub fn resolve_with(mut self, resolve: ResolveFn<C>) -> Self {
        self.resolve = Some(resolve);
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.validate = Some(validate_fn(f));
        self
    }

    /// Append a per-query mixin
    pub fn mixin(mut self, mixin: Mixin<C>) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn mixins(mut self, mixins: impl IntoIterator<Item = Mixin<C>>) -> Self {
        self.mixins.extend(mixins);
        self
    }

    /// Replace the whole payload. It must be a JSON object.
    pub fn extras(mut self, extras: Value) -> Self {
        self.extras = extras;
        self
    }

    /// Insert a single payload entry
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Value::Object(map) = &mut self.extras {
            map.insert(key.into(), value);
        }
        self
    }

    /// Check the type contracts and produce the initial options record.
    ///
    /// The returned record carries only the explicit mixins; the query
    /// constructor appends the registry's global mixins.
    pub fn build(self) -> Result<QueryOptions<C>, BuildError> {
        let name = self
            .name
            .ok_or_else(|| BuildError::invalid("name", "must be a string."))?;
        let resolve = self
            .resolve
            .ok_or_else(|| BuildError::invalid("resolve", "must be a function."))?;

        let extras = match self.extras {
            Value::Object(map) => map,
            other => {
                return Err(BuildError::invalid(
                    "extras",
                    format!("must be an object, got {}.", type_name(&other)),
                ))
            }
        };
        if let Some(key) = RESERVED_KEYS.iter().find(|key| extras.contains_key(**key)) {
            return Err(BuildError::invalid(
                "extras",
                format!("cannot contain the reserved key `{}`.", key),
            ));
        }

        Ok(QueryOptions {
            name,
            run: Arc::clone(&resolve),
            resolve,
            validate: self.validate.unwrap_or_else(noop_validate),
            mixins: self.mixins,
            extras,
        })
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
