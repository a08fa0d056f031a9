use std::any::Any;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use super::node::Node;
use super::scope::{ContextKey, Scope};
use super::view::{Component, View};
use crate::error::Result;
use crate::state::Value;
use crate::store::{Store, Subscription};

type Slot = Arc<dyn Any + Send + Sync>;

/// Render context handed to a component.
///
/// Hooks are positional: `use_lazy` slots are matched to the previous render
/// by call order, so a component must call them in the same order every time.
pub struct RenderCx {
    pub(super) node: Arc<Node>,
    pub(super) scope: Scope,
    pub(super) slots: Vec<Slot>,
    pub(super) cursor: usize,
    pub(super) subscriptions: Vec<Subscription>,
    pub(super) previous: BTreeMap<String, Arc<Node>>,
    pub(super) children: BTreeMap<String, Arc<Node>>,
}

impl RenderCx {
    pub(super) fn new(
        node: Arc<Node>,
        scope: Scope,
        slots: Vec<Slot>,
        previous: BTreeMap<String, Arc<Node>>,
    ) -> Self {
        Self {
            node,
            scope,
            slots,
            cursor: 0,
            subscriptions: Vec::new(),
            previous,
            children: BTreeMap::new(),
        }
    }

    /// Render `component` as the child called `key`.
    ///
    /// A child keeps its hook state across renders as long as the same key
    /// is rendered again. Children not rendered again are unmounted.
    pub fn child(&mut self, key: impl Into<String>, component: impl Component) -> Result<View> {
        self.child_shared(key, Arc::new(component))
    }

    pub fn child_shared(
        &mut self,
        key: impl Into<String>,
        component: Arc<dyn Component>,
    ) -> Result<View> {
        let key = key.into();
        let node = match self.previous.remove(&key) {
            Some(node) => {
                node.replace(component, self.scope.clone());
                node
            }
            None => Node::new(key.clone(), component, self.scope.clone()),
        };
        if let Some(replaced) = self.children.insert(key.clone(), Arc::clone(&node)) {
            replaced.unmount();
        }
        node.render()?;
        Ok(View::Child(key))
    }

    /// Value created on the first render and kept until unmount.
    pub fn use_lazy<T, F>(&mut self, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        match self.slot(|| Ok::<T, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`use_lazy`](Self::use_lazy) with a fallible initializer. A
    /// failed initializer is retried on the next render.
    pub fn try_use_lazy<T, F>(&mut self, init: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T>,
    {
        self.slot(init)
    }

    fn slot<T, E, F>(&mut self, init: F) -> std::result::Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let index = self.cursor;
        self.cursor += 1;
        if let Some(slot) = self.slots.get(index) {
            if let Ok(value) = Arc::clone(slot).downcast::<T>() {
                return Ok(value);
            }
        }

        let value = match init() {
            Ok(value) => Arc::new(value),
            Err(error) => {
                // hold the position so later slots keep their index
                if index == self.slots.len() {
                    self.slots.push(Arc::new(()));
                }
                return Err(error);
            }
        };
        let erased: Slot = value.clone();
        if index < self.slots.len() {
            // hook order changed; the old slot is lost
            self.slots[index] = erased;
        } else {
            self.slots.push(erased);
        }
        Ok(value)
    }

    /// Make `value` visible to every child rendered after this call.
    pub fn provide<T>(&mut self, key: ContextKey, value: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        self.scope = self.scope.provide(key, value);
    }

    /// Nearest value provided under `key` by this component or an ancestor.
    pub fn consume<T>(&self, key: ContextKey) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.scope.lookup(key)
    }

    /// Read a slice of `store` and re-render this component when it changes.
    pub fn use_store<S, V, F>(&mut self, store: &Store<S>, selector: F) -> V
    where
        S: Clone + Send + Sync + 'static,
        V: Value,
        F: Fn(&S) -> V + Send + Sync + 'static,
    {
        let value = selector(&store.get_state());
        let node = Arc::downgrade(&self.node);
        let subscription = store.subscribe_with_selector(selector, move |_, _| {
            if let Some(node) = node.upgrade() {
                node.rerender();
            }
        });
        self.subscriptions.push(subscription);
        value
    }
}
