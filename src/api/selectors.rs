use std::sync::Arc;

use super::naming::hook_name;
use super::registry::{GetFn, HookFn, Registry};
use crate::render::RenderCx;
use crate::state::{State, Value};
use crate::store::Store;

type Install<S> = Box<dyn FnOnce(&Store<S>, &mut Registry, &mut Registry)>;

/// Derived values returned by a selector builder.
///
/// Each selector becomes a getter under its own name and a `use<Name>` hook.
/// Selectors are not memoized: they run on every read, and their hooks
/// re-evaluate on every store update.
pub struct Selectors<S> {
    names: Vec<String>,
    installs: Vec<Install<S>>,
}

impl<S: State> Selectors<S> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            installs: Vec::new(),
        }
    }

    /// Add a selector taking `A` (use `()` for none, a tuple for several).
    pub fn add<A, V, F>(mut self, name: impl Into<String>, selector: F) -> Self
    where
        A: Clone + Send + Sync + 'static,
        V: Value,
        F: Fn(A) -> V + Send + Sync + 'static,
    {
        let name = name.into();
        self.names.push(name.clone());
        self.installs.push(Box::new(move |store, getters, hooks| {
            let getter: GetFn<A, V> = Arc::new(selector);

            let store = store.clone();
            let select = Arc::clone(&getter);
            let hook: HookFn<A, V> = Arc::new(move |cx: &mut RenderCx, args: A| {
                let select = Arc::clone(&select);
                cx.use_store(&store, move |_: &S| select(args.clone()))
            });

            hooks.insert(hook_name(&name), hook);
            getters.insert(name, getter);
        }));
        self
    }

    /// Selector names, in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn install(self, store: &Store<S>, getters: &mut Registry, hooks: &mut Registry) {
        for install in self.installs {
            install(store, getters, hooks);
        }
    }
}

impl<S: State> Default for Selectors<S> {
    fn default() -> Self {
        Self::new()
    }
}
