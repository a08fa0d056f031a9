use std::fmt;
use std::sync::Arc;

use super::naming::{hook_name, setter_name};
use super::registry::{HookFn, Registry};
use super::setters::{Actions, SetterVisitor};
use crate::error::Result;
use crate::render::RenderCx;
use crate::state::{Field, FieldVisitor, State, Value};
use crate::store::Store;

const USE_ACTIONS: &str = "useActions";

/// Hooks of a store: `use<Key>` per state key, `use<Name>` per selector,
/// and `useActions`.
///
/// Calling a hook during a render returns the current value and re-renders
/// the calling component whenever that value changes.
pub struct Hooks<S> {
    store: Store<S>,
    entries: Registry,
    actions: Actions,
}

struct HookVisitor<'a, S> {
    store: &'a Store<S>,
    entries: &'a mut Registry,
}

impl<S: State> FieldVisitor<S> for HookVisitor<'_, S> {
    fn visit<V: Value>(&mut self, field: Field<S, V>) {
        let store = self.store.clone();
        let hook: HookFn<(), V> = Arc::new(move |cx: &mut RenderCx, ()| {
            cx.use_store(&store, move |state: &S| field.get(state).clone())
        });
        self.entries.insert(hook_name(field.name()), hook);
    }
}

/// Build the hook bundle for any store, including ones not created through
/// [`create`](crate::create).
pub fn create_hooks<S: State>(store: &Store<S>) -> Hooks<S> {
    let mut entries = Registry::default();
    S::describe(&mut HookVisitor {
        store,
        entries: &mut entries,
    });

    let mut actions = Actions::new();
    S::describe(&mut SetterVisitor {
        store,
        actions: &mut actions,
        name: setter_name,
    });

    Hooks {
        store: store.clone(),
        entries,
        actions,
    }
    .with_use_actions()
}

impl<S: State> Hooks<S> {
    /// Call the hook called `name`.
    pub fn call<A: 'static, V: 'static>(
        &self,
        cx: &mut RenderCx,
        name: &str,
        args: A,
    ) -> Result<V> {
        let hook = self.entries.lookup::<HookFn<A, V>>(name)?;
        Ok(hook(cx, args))
    }

    /// Call a hook that takes no arguments.
    pub fn value<V: 'static>(&self, cx: &mut RenderCx, name: &str) -> Result<V> {
        self.call(cx, name, ())
    }

    /// Subscribe to one field directly.
    ///
    /// Selects the stored field, bypassing a same-named selector hook.
    pub fn field<V: Value>(&self, cx: &mut RenderCx, field: Field<S, V>) -> V {
        cx.use_store(&self.store, move |state: &S| field.get(state).clone())
    }

    /// The `useActions` hook: every `set<Key>` setter plus custom actions.
    pub fn use_actions(&self) -> Actions {
        self.actions.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// Hook names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.names()
    }

    pub(crate) fn with_selector_hooks(&self, hooks: &Registry) -> Self {
        let mut merged = self.clone();
        merged.entries.extend(hooks);
        merged
    }

    pub(crate) fn with_actions(&self, actions: &Actions) -> Self {
        let mut merged = self.clone();
        merged.actions.merge(actions);
        merged.with_use_actions()
    }

    fn with_use_actions(mut self) -> Self {
        let actions = self.actions.clone();
        let hook: HookFn<(), Actions> = Arc::new(move |_: &mut RenderCx, ()| actions.clone());
        self.entries.insert(USE_ACTIONS, hook);
        self
    }
}

impl<S> Clone for Hooks<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            entries: self.entries.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<S> fmt::Debug for Hooks<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("hooks", &self.entries.names())
            .field("actions", &self.actions)
            .finish()
    }
}
