//! Mixins: ordered transformers rewriting query options before a query is finalized

mod builtin;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::query::{QueryOptions, RESERVED_KEYS};

pub use builtin::{by_name, defaults, require_args_object, trace, BUILTIN_MIXINS};

type TypedFn<C> = dyn Fn(QueryOptions<C>) -> QueryOptions<C> + Send + Sync;
type CheckedFn<C> = dyn Fn(QueryOptions<C>) -> Option<QueryOptions<C>> + Send + Sync;
type PayloadFn = dyn Fn(Value) -> Value + Send + Sync;

enum Transform<C> {
    /// Always yields options
    Typed(Arc<TypedFn<C>>),
    /// May decline to yield options, which breaks the mixin contract
    Checked(Arc<CheckedFn<C>>),
    /// Rewrites the payload only; must yield a JSON object
    Payload(Arc<PayloadFn>),
}

impl<C> Clone for Transform<C> {
    fn clone(&self) -> Self {
        match self {
            Transform::Typed(f) => Transform::Typed(Arc::clone(f)),
            Transform::Checked(f) => Transform::Checked(Arc::clone(f)),
            Transform::Payload(f) => Transform::Payload(Arc::clone(f)),
        }
    }
}

/// A labelled transformer from options to options.
///
/// Mixins run once, in order, while a query is constructed. Each one receives
/// the output of the previous one.
pub struct Mixin<C> {
    label: Option<String>,
    transform: Transform<C>,
}

impl<C> Mixin<C> {
    /// A mixin that always returns replacement options
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(QueryOptions<C>) -> QueryOptions<C> + Send + Sync + 'static,
    {
        Self {
            label: None,
            transform: Transform::Typed(Arc::new(f)),
        }
    }

    /// A mixin loaded from a source that cannot promise to return options.
    /// Returning `None` fails the query construction.
    pub fn checked<F>(f: F) -> Self
    where
        F: Fn(QueryOptions<C>) -> Option<QueryOptions<C>> + Send + Sync + 'static,
    {
        Self {
            label: None,
            transform: Transform::Checked(Arc::new(f)),
        }
    }

    /// A mixin that rewrites the opaque payload. Returning anything other
    /// than a JSON object, or an object using a reserved key, fails the query
    /// construction.
    pub fn payload<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            label: None,
            transform: Transform::Payload(Arc::new(f)),
        }
    }

    /// Attach a label used in diagnostics
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Run the transformer. `None` means the mixin broke its contract.
    pub fn apply(&self, mut options: QueryOptions<C>) -> Option<QueryOptions<C>> {
        match &self.transform {
            Transform::Typed(f) => Some(f(options)),
            Transform::Checked(f) => f(options),
            Transform::Payload(f) => {
                let payload = Value::Object(std::mem::take(&mut options.extras));
                match f(payload) {
                    Value::Object(extras)
                        if !RESERVED_KEYS.iter().any(|key| extras.contains_key(*key)) =>
                    {
                        options.extras = extras;
                        Some(options)
                    }
                    _ => None,
                }
            }
        }
    }
}

impl<C> Clone for Mixin<C> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            transform: self.transform.clone(),
        }
    }
}

impl<C> fmt::Debug for Mixin<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.transform {
            Transform::Typed(_) => "typed",
            Transform::Checked(_) => "checked",
            Transform::Payload(_) => "payload",
        };
        f.debug_struct("Mixin")
            .field("label", &self.label)
            .field("kind", &kind)
            .finish()
    }
}

/// Merge `patch` into a payload object, overwriting existing keys
pub fn merge_payload(mut payload: Value, patch: Map<String, Value>) -> Value {
    if let Value::Object(map) = &mut payload {
        map.extend(patch);
    }
    payload
}
