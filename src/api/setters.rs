use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::naming::setter_name;
use super::registry::{ActionFn, Registry};
use crate::error::Result;
use crate::state::{Field, FieldVisitor, State, Value};
use crate::store::Store;

/// Write `value` into `field`, replacing the whole state.
///
/// Skipped when the field already holds an equal value, so no listener
/// runs and no new state is built. The comparison and the write happen under
/// one store write lock, so concurrent writes to other fields are kept.
pub(crate) fn write_field<S: State, V: Value>(store: &Store<S>, field: Field<S, V>, value: V) {
    let written = store.replace_with(move |state| {
        if *field.get(state) == value {
            return None;
        }
        let mut next = state.clone();
        *field.get_mut(&mut next) = value;
        Some(next)
    });
    if !written {
        trace!(key = field.name(), "value unchanged, skipping write");
    }
}

/// A named set of mutation functions.
///
/// Action builders return one of these, and the `useActions` hook hands one
/// out containing `set<Key>` for every state key plus the custom actions.
#[derive(Clone, Default)]
pub struct Actions {
    entries: Registry,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action taking `A` (use a tuple for several arguments).
    pub fn add<A, F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        A: 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        let action: ActionFn<A> = Arc::new(action);
        self.entries.insert(name, action);
        self
    }

    /// Run the action called `name`.
    pub fn call<A: 'static>(&self, name: &str, args: A) -> Result<()> {
        let action = self.entries.lookup::<ActionFn<A>>(name)?;
        action(args);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.names()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn insert<A: 'static>(&mut self, name: impl Into<String>, action: ActionFn<A>) {
        self.entries.insert(name, action);
    }

    pub(crate) fn merge(&mut self, other: &Actions) {
        self.entries.extend(&other.entries);
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.names()).finish()
    }
}

/// Visits the schema and emits one conditional setter per field, named by
/// `name`.
pub(crate) struct SetterVisitor<'a, S> {
    pub(crate) store: &'a Store<S>,
    pub(crate) actions: &'a mut Actions,
    pub(crate) name: fn(&str) -> String,
}

impl<S: State> FieldVisitor<S> for SetterVisitor<'_, S> {
    fn visit<V: Value>(&mut self, field: Field<S, V>) {
        let store = self.store.clone();
        let setter: ActionFn<V> = Arc::new(move |value| write_field(&store, field, value));
        self.actions.insert((self.name)(field.name()), setter);
    }
}

/// Write accessors of a store: one per state key, plus any actions.
pub struct Setters<S> {
    store: Store<S>,
    actions: Actions,
}

impl<S: State> Setters<S> {
    pub(crate) fn from_store(store: &Store<S>) -> Self {
        let mut actions = Actions::new();
        S::describe(&mut SetterVisitor {
            store,
            actions: &mut actions,
            name: str::to_string,
        });
        Self {
            store: store.clone(),
            actions,
        }
    }

    /// Replace the whole state.
    pub fn state(&self, next: S) {
        self.store.set_state(next);
    }

    /// Write one field; a no-op if the value is unchanged.
    ///
    /// Writes the stored field directly. An action registered under the
    /// field's name is not called.
    pub fn field<V: Value>(&self, field: Field<S, V>, value: V) {
        write_field(&self.store, field, value);
    }

    /// Call the setter or action called `name`.
    pub fn call<A: 'static>(&self, name: &str, args: A) -> Result<()> {
        self.actions.call(name, args)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.names()
    }

    pub(crate) fn with_actions(&self, actions: &Actions) -> Self {
        let mut merged = self.clone();
        merged.actions.merge(actions);
        merged
    }
}

impl<S> Clone for Setters<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<S> fmt::Debug for Setters<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.actions, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    crate::state! {
        #[derive(Clone, Debug, PartialEq)]
        struct Cart {
            items: Vec<String>,
            total: u32,
        }
    }

    fn cart_store() -> Store<Cart> {
        Store::new(Cart {
            items: Vec::new(),
            total: 0,
        })
    }

    #[test]
    fn setters_are_named_by_key() {
        let setters = Setters::from_store(&cart_store());
        assert_eq!(setters.names(), vec!["items", "total"]);
    }

    #[test]
    fn setter_replaces_one_field() {
        let store = cart_store();
        let setters = Setters::from_store(&store);

        setters.call("total", 12u32).unwrap();
        setters.field(Cart::items(), vec!["tea".to_string()]);

        assert_eq!(
            store.get_state(),
            Cart {
                items: vec!["tea".to_string()],
                total: 12,
            }
        );
    }

    #[test]
    fn equal_value_does_not_notify() {
        let store = cart_store();
        let setters = Setters::from_store(&store);
        let notified = Arc::new(AtomicUsize::new(0));
        let notified_clone = notified.clone();
        let _sub = store.subscribe(move |_, _| {
            notified_clone.fetch_add(1, Ordering::SeqCst);
        });

        setters.field(Cart::total(), 0);
        setters.field(Cart::items(), Vec::new());
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        setters.field(Cart::total(), 3);
        setters.field(Cart::total(), 3);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_field_writes_keep_each_other() {
        let store = cart_store();
        let setters = Setters::from_store(&store);

        let writer = {
            let setters = setters.clone();
            std::thread::spawn(move || {
                for total in 1..=2_000u32 {
                    setters.field(Cart::total(), total);
                }
            })
        };
        for n in 1..=200 {
            setters.field(Cart::items(), vec![n.to_string()]);
        }
        writer.join().unwrap();

        let state = store.get_state();
        assert_eq!(state.total, 2_000);
        assert_eq!(state.items, vec!["200".to_string()]);
    }

    #[test]
    fn actions_take_argument_tuples() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let actions = Actions::new().add("addBoth", move |(a, b): (usize, usize)| {
            seen_clone.fetch_add(a + b, Ordering::SeqCst);
        });

        actions.call("addBoth", (2usize, 3usize)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert!(actions.call("addBoth", 2usize).is_err());
        assert_eq!(actions.len(), 1);
        assert!(!actions.is_empty());
    }
}
