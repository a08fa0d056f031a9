use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::{debug, trace, warn};

use super::cx::RenderCx;
use super::scope::Scope;
use super::view::{Component, View};
use crate::error::Result;
use crate::store::Subscription;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct NodeState {
    view: View,
    slots: Vec<Arc<dyn Any + Send + Sync>>,
    subscriptions: Vec<Subscription>,
    children: BTreeMap<String, Arc<Node>>,
    renders: usize,
    mounted: bool,
}

/// A mounted component instance.
pub(crate) struct Node {
    key: String,
    component: Mutex<Arc<dyn Component>>,
    scope: Mutex<Scope>,
    state: Mutex<NodeState>,
    rendering: Mutex<()>,
    dirty: AtomicBool,
}

impl Node {
    pub(super) fn new(key: String, component: Arc<dyn Component>, scope: Scope) -> Arc<Self> {
        Arc::new(Self {
            key,
            component: Mutex::new(component),
            scope: Mutex::new(scope),
            state: Mutex::new(NodeState {
                mounted: true,
                ..NodeState::default()
            }),
            rendering: Mutex::new(()),
            dirty: AtomicBool::new(false),
        })
    }

    pub(super) fn replace(&self, component: Arc<dyn Component>, scope: Scope) {
        *lock(&self.component) = component;
        *lock(&self.scope) = scope;
    }

    /// Render until no update arrives mid-render.
    ///
    /// An update that lands while this node is rendering, from this thread or
    /// another, only marks it dirty; the thread holding the render lock picks
    /// it up.
    pub(super) fn render(self: &Arc<Self>) -> Result<()> {
        let _rendering = match self.rendering.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.dirty.store(true, Ordering::SeqCst);
                return Ok(());
            }
        };
        loop {
            self.dirty.store(false, Ordering::SeqCst);
            self.render_once()?;
            if !self.dirty.load(Ordering::SeqCst) {
                return Ok(());
            }
        }
    }

    /// Re-render after a store change. Errors have no caller to go to.
    pub(super) fn rerender(self: &Arc<Self>) {
        trace!(node = %self.key, "re-rendering");
        if let Err(error) = self.render() {
            warn!(node = %self.key, %error, "re-render failed");
        }
    }

    fn render_once(self: &Arc<Self>) -> Result<()> {
        let component = Arc::clone(&*lock(&self.component));
        let scope = lock(&self.scope).clone();
        let (slots, previous) = {
            let mut state = lock(&self.state);
            if !state.mounted {
                return Ok(());
            }
            (mem::take(&mut state.slots), mem::take(&mut state.children))
        };

        let mut cx = RenderCx::new(Arc::clone(self), scope, slots, previous);
        let result = component.render(&mut cx);
        let RenderCx {
            slots,
            subscriptions,
            previous,
            children,
            ..
        } = cx;

        let mut state = lock(&self.state);
        state.slots = slots;
        match result {
            Ok(view) => {
                state.view = view;
                state.children = children;
                state.renders += 1;
                let stale = mem::replace(&mut state.subscriptions, subscriptions);
                drop(state);
                drop(stale);
                for child in previous.into_values() {
                    child.unmount();
                }
                Ok(())
            }
            Err(error) => {
                // keep the last good view and every child it may refer to
                let mut kept = previous;
                kept.extend(children);
                state.children = kept;
                drop(state);
                drop(subscriptions);
                Err(error)
            }
        }
    }

    pub(super) fn unmount(&self) {
        let (subscriptions, children, slots) = {
            let mut state = lock(&self.state);
            if !state.mounted {
                return;
            }
            state.mounted = false;
            (
                mem::take(&mut state.subscriptions),
                mem::take(&mut state.children),
                mem::take(&mut state.slots),
            )
        };
        drop(subscriptions);
        for child in children.into_values() {
            child.unmount();
        }
        drop(slots);
        trace!(node = %self.key, "unmounted");
    }

    fn write_text(&self, out: &mut String) {
        let (view, children) = {
            let state = lock(&self.state);
            (state.view.clone(), state.children.clone())
        };
        write_view(&view, &children, out);
    }

    fn renders(&self) -> usize {
        lock(&self.state).renders
    }
}

fn write_view(view: &View, children: &BTreeMap<String, Arc<Node>>, out: &mut String) {
    match view {
        View::Text(text) => out.push_str(text),
        View::Child(key) => {
            if let Some(child) = children.get(key) {
                child.write_text(out);
            }
        }
        View::Fragment(views) => {
            for view in views {
                write_view(view, children, out);
            }
        }
        View::Empty => {}
    }
}

/// The top of a component tree.
///
/// Dropping the root unmounts every component and removes their store
/// subscriptions.
pub struct Root {
    node: Arc<Node>,
}

impl Root {
    /// Mount `component` and run its first render.
    pub fn mount(component: impl Component) -> Result<Root> {
        let node = Node::new("root".to_string(), Arc::new(component), Scope::root());
        if let Err(error) = node.render() {
            node.unmount();
            return Err(error);
        }
        debug!("component tree mounted");
        Ok(Root { node })
    }

    /// Render the root component again, and with it every child.
    pub fn rerender(&self) -> Result<()> {
        self.node.render()
    }

    /// The rendered text of the whole tree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.node.write_text(&mut out);
        out
    }

    /// How many times the root component has rendered.
    pub fn render_count(&self) -> usize {
        self.node.renders()
    }

    pub fn unmount(self) {}
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("renders", &self.render_count())
            .finish_non_exhaustive()
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.node.unmount();
        debug!("component tree unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{component, ContextKey};
    use crate::store::Store;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn mount_renders_once() {
        let root = Root::mount(component(|_| Ok(View::text("hello")))).unwrap();
        assert_eq!(root.text(), "hello");
        assert_eq!(root.render_count(), 1);

        root.rerender().unwrap();
        assert_eq!(root.render_count(), 2);
    }

    #[test]
    fn children_are_flattened_in_order() {
        let root = Root::mount(component(|cx| {
            let a = cx.child("a", component(|_| Ok(View::text("A"))))?;
            let b = cx.child("b", component(|_| Ok(View::text("B"))))?;
            Ok(View::fragment([a, View::text("-"), b]))
        }))
        .unwrap();
        assert_eq!(root.text(), "A-B");
    }

    #[test]
    fn lazy_values_survive_rerenders() {
        let inits = Arc::new(AtomicUsize::new(0));
        let root = Root::mount(component({
            let inits = inits.clone();
            move |cx| {
                let inits = inits.clone();
                let value = cx.use_lazy(move || {
                    inits.fetch_add(1, Ordering::SeqCst);
                    7
                });
                Ok(View::text(value.to_string()))
            }
        }))
        .unwrap();

        root.rerender().unwrap();
        root.rerender().unwrap();
        assert_eq!(root.text(), "7");
        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_lazy_init_keeps_later_slots_in_place() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let inits = Arc::new(AtomicUsize::new(0));
        let root = Root::mount(component({
            let attempts = attempts.clone();
            let inits = inits.clone();
            move |cx| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                let first = cx.try_use_lazy(|| {
                    if attempt == 0 {
                        Err(crate::Error::MissingInitialState)
                    } else {
                        Ok(1u8)
                    }
                });
                let inits = inits.clone();
                let second = cx.use_lazy(move || {
                    inits.fetch_add(1, Ordering::SeqCst);
                    "kept".to_string()
                });
                Ok(View::text(format!("{}/{}", first.is_ok(), second)))
            }
        }))
        .unwrap();
        assert_eq!(root.text(), "false/kept");

        root.rerender().unwrap();
        root.rerender().unwrap();
        assert_eq!(root.text(), "true/kept");
        assert_eq!(inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn writes_during_render_render_again() {
        let store = Store::new(9i32);
        let root = Root::mount(component({
            let store = store.clone();
            move |cx| {
                let count = cx.use_store(&store, |state: &i32| *state);
                if count < 12 {
                    store.set_state(count + 1);
                }
                Ok(View::text(format!("Count: {count}")))
            }
        }))
        .unwrap();

        assert_eq!(root.text(), "Count: 12");
        assert_eq!(root.render_count(), 4);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn provided_values_reach_descendants_only() {
        let key = ContextKey::new();
        let root = Root::mount(component(move |cx| {
            let before = cx.child(
                "before",
                component(move |cx| Ok(View::text(format!("{:?}", cx.consume::<u8>(key))))),
            )?;
            cx.provide(key, Arc::new(1u8));
            let after = cx.child(
                "after",
                component(move |cx| {
                    cx.child(
                        "inner",
                        component(move |cx| Ok(View::text(format!("{:?}", cx.consume::<u8>(key))))),
                    )
                }),
            )?;
            Ok(View::fragment([before, View::text(" "), after]))
        }))
        .unwrap();
        assert_eq!(root.text(), "None Some(1)");
    }

    #[test]
    fn store_changes_rerender_the_reading_component() {
        let store = Store::new((0i32, 0i32));
        let child_renders = Arc::new(AtomicUsize::new(0));

        let root = Root::mount(component({
            let store = store.clone();
            let child_renders = child_renders.clone();
            move |cx| {
                let store = store.clone();
                let child_renders = child_renders.clone();
                cx.child(
                    "reader",
                    component(move |cx| {
                        child_renders.fetch_add(1, Ordering::SeqCst);
                        let first = cx.use_store(&store, |state: &(i32, i32)| state.0);
                        Ok(View::text(first.to_string()))
                    }),
                )
            }
        }))
        .unwrap();

        store.update(|state| state.1 = 5);
        assert_eq!(child_renders.load(Ordering::SeqCst), 1);

        store.update(|state| state.0 = 3);
        assert_eq!(child_renders.load(Ordering::SeqCst), 2);
        assert_eq!(root.render_count(), 1);
        assert_eq!(root.text(), "3");
    }

    #[test]
    fn unmount_removes_subscriptions() {
        let store = Store::new(0i32);
        let root = Root::mount(component({
            let store = store.clone();
            move |cx| {
                let value = cx.use_store(&store, |state: &i32| *state);
                Ok(View::text(value.to_string()))
            }
        }))
        .unwrap();
        assert_eq!(store.listener_count(), 1);

        root.rerender().unwrap();
        assert_eq!(store.listener_count(), 1);

        root.unmount();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn children_not_rendered_again_are_unmounted() {
        let store = Store::new(0i32);
        let show = Arc::new(AtomicBool::new(true));
        let root = Root::mount(component({
            let store = store.clone();
            let show = show.clone();
            move |cx| {
                if !show.load(Ordering::SeqCst) {
                    return Ok(View::empty());
                }
                let store = store.clone();
                cx.child(
                    "reader",
                    component(move |cx| {
                        let value = cx.use_store(&store, |state: &i32| *state);
                        Ok(View::text(value.to_string()))
                    }),
                )
            }
        }))
        .unwrap();
        assert_eq!(store.listener_count(), 1);

        show.store(false, Ordering::SeqCst);
        root.rerender().unwrap();
        assert_eq!(store.listener_count(), 0);
        assert_eq!(root.text(), "");
    }

    #[test]
    fn failed_render_keeps_the_previous_view() {
        let fail = Arc::new(AtomicBool::new(false));
        let root = Root::mount(component({
            let fail = fail.clone();
            move |_| {
                if fail.load(Ordering::SeqCst) {
                    return Err(crate::Error::MissingProvider);
                }
                Ok(View::text("ok"))
            }
        }))
        .unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(root.rerender().is_err());
        assert_eq!(root.text(), "ok");
        assert_eq!(root.render_count(), 1);
    }
}
