//! Validated queries
//!
//! A [`ValidatedQuery`] wraps a resolve function with an argument check,
//! lets an ordered chain of mixins rewrite its options once at construction,
//! and funnels every failure of the final resolver through the registry's
//! error hook.

mod error;
pub(crate) mod options;

use std::fmt;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::debug;

pub use error::{BuildError, MixinLabel, ResolutionFailure, Stage};
pub use options::{
    resolve_fn, validate_fn, QueryOptions, QueryOptionsBuilder, ResolveFn, ResolveFuture,
    ValidateFn, RESERVED_KEYS,
};

use crate::registry::QueryRegistry;

/// Outcome of a resolver call. `Ok(None)` means the error hook absorbed a failure.
pub type ResolverResult = Result<Option<Value>, ResolutionFailure>;

/// Resolver as a shareable boxed-future callable
pub type ResolverFn<C> =
    Arc<dyn Fn(Value, Value, Arc<C>) -> BoxFuture<'static, ResolverResult> + Send + Sync>;

/// A query whose options have been checked and run through its mixins
pub struct ValidatedQuery<C> {
    options: Arc<QueryOptions<C>>,
    registry: Arc<QueryRegistry<C>>,
}

impl<C> ValidatedQuery<C>
where
    C: Send + Sync + 'static,
{
    /// Build a query against a fresh registry with no global mixins and the
    /// rethrowing error hook
    pub fn new(input: QueryOptionsBuilder<C>) -> Result<Self, BuildError> {
        Self::with_registry(input, &Arc::new(QueryRegistry::new()))
    }

    /// Build a query against a shared registry.
    ///
    /// The explicit mixins run first, followed by the registry's global
    /// mixins as registered at this moment.
    pub fn with_registry(
        input: QueryOptionsBuilder<C>,
        registry: &Arc<QueryRegistry<C>>,
    ) -> Result<Self, BuildError> {
        let mut options = input.build()?;
        options.mixins.extend(registry.global_mixins());

        let options = apply_mixins(options)?;

        Ok(Self {
            options: Arc::new(options),
            registry: Arc::clone(registry),
        })
    }

    /// The effective options after every mixin ran
    pub fn options(&self) -> &QueryOptions<C> {
        &self.options
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    /// Produce the resolver to register with a query execution framework
    pub fn resolver(&self) -> Resolver<C> {
        Resolver {
            options: Arc::clone(&self.options),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<C> fmt::Debug for ValidatedQuery<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedQuery")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Run each mixin on the output of the previous one, re-deriving `resolve`
/// from `run` after every step. Diagnostics use the name the query was
/// constructed with, even if a mixin renames it.
fn apply_mixins<C>(mut options: QueryOptions<C>) -> Result<QueryOptions<C>, BuildError> {
    let mixins = options.mixins.clone();
    let query = options.name.clone();
    debug!("Applying {} mixin(s) to query '{}'", mixins.len(), query);

    for (index, mixin) in mixins.iter().enumerate() {
        options = mixin.apply(options).ok_or_else(|| BuildError::MixinContractViolation {
            query: query.clone(),
            mixin: match mixin.label() {
                Some(label) => MixinLabel::Named(label.to_string()),
                None => MixinLabel::Position(index + 1),
            },
        })?;
        options.resolve = Arc::clone(&options.run);
    }

    Ok(options)
}

/// Callable produced by [`ValidatedQuery::resolver`].
///
/// Calls are independent of each other. The error hook is looked up on each
/// call, never captured.
pub struct Resolver<C> {
    options: Arc<QueryOptions<C>>,
    registry: Arc<QueryRegistry<C>>,
}

impl<C> Resolver<C>
where
    C: Send + Sync + 'static,
{
    /// Validate `args`, then run the query with `(parent, args, ctx)`
    pub async fn call(&self, parent: Value, args: Value, ctx: Arc<C>) -> ResolverResult {
        match self.execute(parent, args, ctx).await {
            Ok(value) => Ok(Some(value)),
            Err(failure) => {
                debug!("Query '{}' hit a {} failure", self.options.name, failure.stage());
                let hook = self.registry.error_hook();
                hook.on_error(failure).await
            }
        }
    }

    async fn execute(
        &self,
        parent: Value,
        args: Value,
        ctx: Arc<C>,
    ) -> Result<Value, ResolutionFailure> {
        let options = &self.options;

        (options.validate)(&args)
            .map_err(|err| ResolutionFailure::new(&options.name, Stage::Validate, err))?;

        (options.resolve)(parent, args, ctx)
            .await
            .map_err(|err| ResolutionFailure::new(&options.name, Stage::Resolve, err))
    }

    /// Turn the resolver into a plain boxed-future closure
    pub fn into_fn(self) -> ResolverFn<C> {
        let resolver = Arc::new(self);
        Arc::new(move |parent: Value, args: Value, ctx: Arc<C>| {
            let resolver = Arc::clone(&resolver);
            async move { resolver.call(parent, args, ctx).await }.boxed()
        })
    }
}

impl<C> Clone for Resolver<C> {
    fn clone(&self) -> Self {
        Self {
            options: Arc::clone(&self.options),
            registry: Arc::clone(&self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::bail;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::mixins::Mixin;
    use crate::registry::{Fallback, FnHook, Swallow};

    fn echo() -> QueryOptionsBuilder<()> {
        QueryOptions::builder()
            .name("echo")
            .resolve(|_, args: Value, _| async move { Ok(args["value"].clone()) })
    }

    fn doubled(options: QueryOptions<()>) -> QueryOptions<()> {
        let inner = Arc::clone(&options.resolve);
        QueryOptions {
            run: resolve_fn(move |parent, args, ctx| {
                let inner = Arc::clone(&inner);
                async move {
                    let value = inner(parent, args, ctx).await?;
                    Ok(json!(value.as_i64().unwrap_or_default() * 2))
                }
            }),
            ..options
        }
    }

    async fn call(query: &ValidatedQuery<()>, args: Value) -> ResolverResult {
        query.resolver().call(Value::Null, args, Arc::new(())).await
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let query = ValidatedQuery::new(echo()).unwrap();

        assert_eq!(call(&query, json!({ "value": 5 })).await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn test_mixin_replaces_run() {
        let query = ValidatedQuery::new(echo().name("double").mixin(Mixin::new(doubled))).unwrap();

        assert_eq!(call(&query, json!({ "value": 5 })).await.unwrap(), Some(json!(10)));
    }

    #[tokio::test]
    async fn test_validate_then_resolve_once_each() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (validated, resolved) = (Arc::clone(&calls), Arc::clone(&calls));

        let query = ValidatedQuery::new(
            QueryOptions::builder()
                .name("ordered")
                .validate(move |_| {
                    validated.lock().push("validate");
                    Ok(())
                })
                .resolve(move |_, _, _: Arc<()>| {
                    resolved.lock().push("resolve");
                    async { Ok(json!(true)) }
                }),
        )
        .unwrap();

        call(&query, json!({})).await.unwrap();
        assert_eq!(*calls.lock(), vec!["validate", "resolve"]);

        call(&query, json!({})).await.unwrap();
        assert_eq!(calls.lock().len(), 4);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_resolve() {
        let resolved = Arc::new(AtomicUsize::new(0));
        let spy = Arc::clone(&resolved);

        let query = ValidatedQuery::new(
            QueryOptions::builder()
                .name("strict")
                .resolve(move |_, _, _: Arc<()>| {
                    spy.fetch_add(1, Ordering::SeqCst);
                    async { Ok(json!(1)) }
                })
                .validate(|args| {
                    if args["ok"] != json!(true) {
                        bail!("bad");
                    }
                    Ok(())
                }),
        )
        .unwrap();

        let failure = call(&query, json!({ "ok": false })).await.unwrap_err();
        assert_eq!(failure.stage(), Stage::Validate);
        assert_eq!(failure.inner().to_string(), "bad");
        assert_eq!(resolved.load(Ordering::SeqCst), 0);

        assert_eq!(call(&query, json!({ "ok": true })).await.unwrap(), Some(json!(1)));
        assert_eq!(resolved.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hook_receives_validation_error() {
        let registry = Arc::new(QueryRegistry::new());
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        registry.set_error_hook(FnHook::new("spy", move |failure: ResolutionFailure| {
            *sink.lock() = Some((failure.stage(), failure.inner().to_string()));
            Err(failure)
        }));

        let query = ValidatedQuery::with_registry(
            echo().validate(|_| bail!("bad")),
            &registry,
        )
        .unwrap();

        assert!(call(&query, json!({})).await.is_err());
        assert_eq!(*seen.lock(), Some((Stage::Validate, "bad".to_string())));
    }

    #[tokio::test]
    async fn test_async_rejection_reaches_hook() {
        let registry = Arc::new(QueryRegistry::new());
        let query = ValidatedQuery::with_registry(
            QueryOptions::builder()
                .name("flaky")
                .resolve(|_, _, _: Arc<()>| async {
                    tokio::task::yield_now().await;
                    bail!("timeout")
                }),
            &registry,
        )
        .unwrap();

        let failure = call(&query, json!({})).await.unwrap_err();
        assert_eq!(failure.stage(), Stage::Resolve);
        assert_eq!(failure.query(), "flaky");
        assert_eq!(failure.into_inner().to_string(), "timeout");

        registry.set_error_hook(Swallow);
        assert_eq!(call(&query, json!({})).await.unwrap(), None);

        registry.set_error_hook(Fallback(json!("sentinel")));
        assert_eq!(call(&query, json!({})).await.unwrap(), Some(json!("sentinel")));
    }

    #[tokio::test]
    async fn test_hook_replacement_applies_to_existing_resolvers() {
        let registry = Arc::new(QueryRegistry::new());
        let query = ValidatedQuery::with_registry(echo().validate(|_| bail!("nope")), &registry)
            .unwrap();
        let resolver = query.resolver();

        assert!(resolver.call(Value::Null, json!({}), Arc::new(())).await.is_err());

        registry.set_error_hook(Swallow);
        assert_eq!(resolver.call(Value::Null, json!({}), Arc::new(())).await.unwrap(), None);

        registry.reset_error_hook();
        assert!(resolver.call(Value::Null, json!({}), Arc::new(())).await.is_err());
    }

    #[test]
    fn test_mixins_compose_left_to_right() {
        let append = |suffix: &'static str| {
            Mixin::new(move |mut options: QueryOptions<()>| {
                options.name.push_str(suffix);
                options
            })
        };

        let query =
            ValidatedQuery::new(echo().name("q").mixins([append("1"), append("2"), append("3")]))
                .unwrap();

        assert_eq!(query.name(), "q123");
    }

    #[test]
    fn test_resolve_and_run_stay_aliased() {
        let step_checks = Arc::new(AtomicUsize::new(0));
        let checks = Arc::clone(&step_checks);
        let assert_aliased = Mixin::new(move |options: QueryOptions<()>| {
            assert!(options.is_aliased());
            checks.fetch_add(1, Ordering::SeqCst);
            options
        });

        let query = ValidatedQuery::new(
            echo()
                .mixin(assert_aliased.clone())
                .mixin(Mixin::new(doubled))
                .mixin(assert_aliased),
        )
        .unwrap();

        assert!(query.options().is_aliased());
        assert_eq!(step_checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_setting_only_resolve_is_discarded() {
        let mixin = Mixin::new(|options: QueryOptions<()>| QueryOptions {
            resolve: resolve_fn(|_, _, _| async { Ok(json!("ignored")) }),
            ..options
        });

        let query = ValidatedQuery::new(echo().mixin(mixin)).unwrap();

        assert_eq!(call(&query, json!({ "value": 7 })).await.unwrap(), Some(json!(7)));
    }

    #[test]
    fn test_global_mixins_follow_explicit_ones() {
        let registry = Arc::new(QueryRegistry::new());
        let tag = |label: &'static str| {
            Mixin::new(move |mut options: QueryOptions<()>| {
                options.name.push_str(label);
                options
            })
            .named(label)
        };
        registry.register_mixin(tag("-global"));

        let first = ValidatedQuery::with_registry(echo().mixin(tag("-local")), &registry).unwrap();
        registry.register_mixin(tag("-late"));
        let second = ValidatedQuery::with_registry(echo(), &registry).unwrap();

        assert_eq!(first.name(), "echo-local-global");
        assert_eq!(first.options().mixins.len(), 2);
        assert_eq!(second.name(), "echo-global-late");
    }

    #[test]
    fn test_contract_violation_names_mixin() {
        let err = ValidatedQuery::new(
            echo().mixin(Mixin::checked(|_: QueryOptions<()>| None).named("paginate")),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Error in echo method: The function 'paginate' didn't return the options object."
        );
    }

    #[test]
    fn test_contract_violation_reports_original_name() {
        let rename = Mixin::new(|mut options: QueryOptions<()>| {
            options.name = "renamed".to_string();
            options
        });

        let err = ValidatedQuery::new(
            echo()
                .name("users")
                .mixin(rename)
                .mixin(Mixin::checked(|_: QueryOptions<()>| None).named("bad")),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Error in users method: The function 'bad' didn't return the options object."
        );
    }

    #[test]
    fn test_contract_violation_falls_back_to_position() {
        let err = ValidatedQuery::new(
            echo()
                .mixin(Mixin::new(|options| options))
                .mixin(Mixin::payload(|_| json!(3))),
        )
        .unwrap_err();

        match err {
            BuildError::MixinContractViolation { query, mixin } => {
                assert_eq!(query, "echo");
                assert_eq!(mixin, MixinLabel::Position(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_input_fails_before_mixins_run() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        let err = ValidatedQuery::new(QueryOptions::<()>::builder().name("broken").mixin(
            Mixin::new(move |options| {
                counter.fetch_add(1, Ordering::SeqCst);
                options
            }),
        ))
        .unwrap_err();

        assert!(matches!(err, BuildError::InvalidArgument { field: "resolve", .. }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let query = ValidatedQuery::new(echo()).unwrap();
        let resolver = query.resolver().into_fn();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let resolver = resolver.clone();
                let args = json!({ "value": i });
                tokio::spawn(async move { resolver(Value::Null, args, Arc::new(())).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), Some(json!(i)));
        }
    }
}
