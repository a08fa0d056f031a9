use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);

/// Identity of a provided value. Two keys never collide, even when they
/// carry values of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey(usize);

impl ContextKey {
    pub fn new() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ContextKey {
    fn default() -> Self {
        Self::new()
    }
}

struct Frame {
    key: ContextKey,
    value: Arc<dyn Any + Send + Sync>,
    parent: Scope,
}

/// The values provided to a subtree.
///
/// Scopes are immutable: providing a value returns a child scope, so a
/// sibling subtree never sees it.
#[derive(Clone, Default)]
pub struct Scope {
    frame: Option<Arc<Frame>>,
}

impl Scope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn provide<T>(&self, key: ContextKey, value: Arc<T>) -> Scope
    where
        T: Any + Send + Sync,
    {
        Scope {
            frame: Some(Arc::new(Frame {
                key,
                value,
                parent: self.clone(),
            })),
        }
    }

    /// Nearest value provided under `key`.
    pub fn lookup<T>(&self, key: ContextKey) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let mut scope = self;
        while let Some(frame) = &scope.frame {
            if frame.key == key {
                return Arc::clone(&frame.value).downcast::<T>().ok();
            }
            scope = &frame.parent;
        }
        None
    }

    /// Number of values provided along this scope chain.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self;
        while let Some(frame) = &scope.frame {
            depth += 1;
            scope = &frame.parent;
        }
        depth
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_value_wins() {
        let key = ContextKey::new();
        let outer = Scope::root().provide(key, Arc::new(1u32));
        let inner = outer.provide(key, Arc::new(2u32));

        assert_eq!(outer.lookup::<u32>(key).as_deref(), Some(&1));
        assert_eq!(inner.lookup::<u32>(key).as_deref(), Some(&2));
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn keys_are_distinct() {
        let a = ContextKey::new();
        let b = ContextKey::new();
        let scope = Scope::root().provide(a, Arc::new("a"));

        assert!(scope.lookup::<&str>(b).is_none());
        assert!(scope.lookup::<u8>(a).is_none());
        assert!(Scope::root().lookup::<&str>(a).is_none());
    }
}
