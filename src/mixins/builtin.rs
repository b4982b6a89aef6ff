//! Built-in mixins, addressable by name from configuration files

use std::sync::Arc;
use std::time::Instant;

use anyhow::bail;
use futures_util::future::FutureExt;
use serde_json::{Map, Value};
use tracing::debug;

use super::Mixin;
use crate::query::{options::type_name, QueryOptions};
use crate::utils::format_duration;

/// Names accepted by [`by_name`]
pub const BUILTIN_MIXINS: [&str; 3] = ["trace", "require-args-object", "defaults"];

/// Look up a built-in mixin by its configuration name
pub fn by_name<C>(name: &str) -> Option<Mixin<C>>
where
    C: Send + Sync + 'static,
{
    match name {
        "trace" => Some(trace()),
        "require-args-object" => Some(require_args_object()),
        "defaults" => Some(defaults()),
        _ => None,
    }
}

/// Log every call of the query with its elapsed time
pub fn trace<C>() -> Mixin<C>
where
    C: Send + Sync + 'static,
{
    Mixin::new(|mut options: QueryOptions<C>| {
        let inner = Arc::clone(&options.run);
        let query = options.name.clone();

        options.run = Arc::new(move |parent: Value, args: Value, ctx: Arc<C>| {
            let inner = Arc::clone(&inner);
            let query = query.clone();
            async move {
                let start = Instant::now();
                let result = inner(parent, args, ctx).await;
                debug!(
                    "Query '{}' {} in {}",
                    query,
                    if result.is_ok() { "resolved" } else { "failed" },
                    format_duration(start.elapsed())
                );
                result
            }
            .boxed()
        });
        options
    })
    .named("trace")
}

/// Reject calls whose arguments are not a JSON object
pub fn require_args_object<C>() -> Mixin<C>
where
    C: Send + Sync + 'static,
{
    Mixin::new(|mut options: QueryOptions<C>| {
        let previous = Arc::clone(&options.validate);

        options.validate = Arc::new(move |args: &Value| {
            if !args.is_object() {
                bail!("arguments must be an object, got {}", type_name(args));
            }
            previous(args)
        });
        options
    })
    .named("require-args-object")
}

/// Fill missing arguments from the `defaults` payload entry.
///
/// Both `validate` and `run` see the filled arguments. Queries without a
/// `defaults` object in their payload are left untouched.
pub fn defaults<C>() -> Mixin<C>
where
    C: Send + Sync + 'static,
{
    Mixin::new(|mut options: QueryOptions<C>| {
        let defaults = match options.extra("defaults") {
            Some(Value::Object(defaults)) => Arc::new(defaults.clone()),
            _ => return options,
        };

        let validate = Arc::clone(&options.validate);
        let validate_defaults = Arc::clone(&defaults);
        options.validate = Arc::new(move |args: &Value| {
            if args.is_object() {
                validate(&fill_defaults(args.clone(), &validate_defaults))
            } else {
                validate(args)
            }
        });

        let inner = Arc::clone(&options.run);
        options.run = Arc::new(move |parent: Value, args: Value, ctx: Arc<C>| {
            inner(parent, fill_defaults(args, &defaults), ctx)
        });
        options
    })
    .named("defaults")
}

fn fill_defaults(mut args: Value, defaults: &Map<String, Value>) -> Value {
    if let Value::Object(map) = &mut args {
        for (key, value) in defaults {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    args
}
