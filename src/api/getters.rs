use std::fmt;
use std::sync::Arc;

use super::registry::{GetFn, Registry};
use crate::error::Result;
use crate::state::{Field, FieldVisitor, State, Value};
use crate::store::Store;

/// Read accessors of a store: one per state key, plus any selectors.
pub struct Getters<S> {
    store: Store<S>,
    pub(crate) entries: Registry,
}

struct GetterVisitor<'a, S> {
    store: &'a Store<S>,
    entries: &'a mut Registry,
}

impl<S: State> FieldVisitor<S> for GetterVisitor<'_, S> {
    fn visit<V: Value>(&mut self, field: Field<S, V>) {
        let store = self.store.clone();
        let getter: GetFn<(), V> = Arc::new(move |()| store.read(|state| field.get(state).clone()));
        self.entries.insert(field.name(), getter);
    }
}

impl<S: State> Getters<S> {
    pub(crate) fn from_store(store: &Store<S>) -> Self {
        let mut entries = Registry::default();
        S::describe(&mut GetterVisitor {
            store,
            entries: &mut entries,
        });
        Self {
            store: store.clone(),
            entries,
        }
    }

    /// The whole current state.
    pub fn state(&self) -> S {
        self.store.get_state()
    }

    /// Live value of one field.
    ///
    /// Always reads the stored field, even when a selector of the same name
    /// overrides the getter returned by [`value`](Self::value).
    pub fn field<V: Value>(&self, field: Field<S, V>) -> V {
        self.store.read(|state| field.get(state).clone())
    }

    /// Call the getter or selector called `name`.
    pub fn call<A: 'static, V: 'static>(&self, name: &str, args: A) -> Result<V> {
        let getter = self.entries.lookup::<GetFn<A, V>>(name)?;
        Ok(getter(args))
    }

    /// Call a getter or selector that takes no arguments.
    pub fn value<V: 'static>(&self, name: &str) -> Result<V> {
        self.call(name, ())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// Accessor names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.names()
    }
}

impl<S> Clone for Getters<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            entries: self.entries.clone(),
        }
    }
}

impl<S> fmt::Debug for Getters<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.names()).finish()
    }
}
