//! Query registry
//!
//! Holds the extension points shared by every query built against it: the
//! ordered list of global mixins and the current error hook.

mod hooks;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

pub use hooks::{ErrorHook, Fallback, FnHook, LogAndRethrow, Rethrow, Swallow};

use crate::mixins::Mixin;

static DEFAULT_HOOK: Lazy<Arc<dyn ErrorHook>> = Lazy::new(|| Arc::new(Rethrow));

/// Shared setup for a family of queries.
///
/// Intended to be configured during startup, before queries are built and
/// traffic is served. Queries copy the global mixins when they are
/// constructed, but look the error hook up on every call, so replacing the
/// hook also affects queries that already exist.
pub struct QueryRegistry<C> {
    mixins: RwLock<Vec<Mixin<C>>>,
    error_hook: RwLock<Arc<dyn ErrorHook>>,
}

impl<C> QueryRegistry<C> {
    /// Create a registry with no global mixins and the rethrowing hook
    pub fn new() -> Self {
        Self {
            mixins: RwLock::new(Vec::new()),
            error_hook: RwLock::new(Arc::clone(&*DEFAULT_HOOK)),
        }
    }

    /// Append a mixin applied to every query built from now on
    pub fn register_mixin(&self, mixin: Mixin<C>) {
        debug!("Registering global mixin {:?}", mixin.label());
        self.mixins.write().push(mixin);
    }

    /// Snapshot of the global mixins, in registration order
    pub fn global_mixins(&self) -> Vec<Mixin<C>> {
        self.mixins.read().clone()
    }

    /// Replace the error hook for all subsequent resolver calls
    pub fn set_error_hook<H>(&self, hook: H)
    where
        H: ErrorHook + 'static,
    {
        debug!("Installing error hook '{}'", hook.name());
        *self.error_hook.write() = Arc::new(hook);
    }

    /// Restore the rethrowing hook
    pub fn reset_error_hook(&self) {
        *self.error_hook.write() = Arc::clone(&*DEFAULT_HOOK);
    }

    /// The hook currently in effect
    pub fn error_hook(&self) -> Arc<dyn ErrorHook> {
        self.error_hook.read().clone()
    }
}

impl<C> Default for QueryRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for QueryRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRegistry")
            .field("mixins", &*self.mixins.read())
            .field("error_hook", &self.error_hook.read().name())
            .finish()
    }
}
