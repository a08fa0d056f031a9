use std::sync::Arc;

use crate::error::Result;

/// A hook into a store's write path.
///
/// Middlewares run in the order they were given to the store: `init` once at
/// creation, `apply` before each write is committed and `committed` after it.
pub trait Middleware<T>: Send + Sync {
    fn name(&self) -> &str;

    /// Rewrite the initial state.
    fn init(&self, state: T) -> Result<T> {
        Ok(state)
    }

    /// Transform an incoming state before it replaces `prev`.
    fn apply(&self, _prev: &T, next: T) -> T {
        next
    }

    /// Observe the state after a write.
    fn committed(&self, _state: &T) {}
}

impl<T, M> Middleware<T> for Arc<M>
where
    M: Middleware<T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init(&self, state: T) -> Result<T> {
        (**self).init(state)
    }

    fn apply(&self, prev: &T, next: T) -> T {
        (**self).apply(prev, next)
    }

    fn committed(&self, state: &T) {
        (**self).committed(state)
    }
}
