use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::render::RenderCx;

/// Read accessor: state getters take `()`, selectors take their argument tuple.
pub(crate) type GetFn<A, V> = Arc<dyn Fn(A) -> V + Send + Sync>;

/// Write accessor: setters take the new value, actions their argument tuple.
pub(crate) type ActionFn<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Hook: reads like a getter and subscribes the rendering component.
pub(crate) type HookFn<A, V> = Arc<dyn Fn(&mut RenderCx, A) -> V + Send + Sync>;

/// Name-keyed accessors with their concrete signatures erased.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    entries: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    /// Insert or replace the accessor called `name`.
    pub(crate) fn insert<T>(&mut self, name: impl Into<String>, accessor: T)
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(name.into(), Arc::new(accessor));
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub(crate) fn extend(&mut self, other: &Registry) {
        for (name, entry) in &other.entries {
            self.entries.insert(name.clone(), Arc::clone(entry));
        }
    }

    pub(crate) fn lookup<T: Any>(&self, name: &str) -> Result<&T> {
        let entry = self.entries.get(name).ok_or_else(|| Error::unknown(name))?;
        (**entry)
            .downcast_ref::<T>()
            .ok_or_else(|| Error::signature(name))
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
