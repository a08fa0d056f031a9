use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::api::{create_hooks, Hooks, StoreApi};
use crate::error::{Error, Result};
use crate::render::{Component, ContextKey, RenderCx, View};
use crate::state::State;
use crate::store::Store;

/// The store a provider hands to its subtree: an extended handle from
/// [`create`](crate::create) or a plain [`Store`].
pub enum ContextStore<S> {
    Extended(StoreApi<S>),
    Raw(Store<S>),
}

impl<S: State> ContextStore<S> {
    /// The hook bundle; synthesized with [`create_hooks`] for raw stores.
    pub fn hooks(&self) -> Hooks<S> {
        match self {
            ContextStore::Extended(api) => api.hooks().clone(),
            ContextStore::Raw(store) => create_hooks(store),
        }
    }

    pub fn store(&self) -> &Store<S> {
        match self {
            ContextStore::Extended(api) => api.store(),
            ContextStore::Raw(store) => store,
        }
    }
}

impl<S> Clone for ContextStore<S> {
    fn clone(&self) -> Self {
        match self {
            ContextStore::Extended(api) => ContextStore::Extended(api.clone()),
            ContextStore::Raw(store) => ContextStore::Raw(store.clone()),
        }
    }
}

impl<S> fmt::Debug for ContextStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextStore::Extended(api) => f.debug_tuple("Extended").field(api).finish(),
            ContextStore::Raw(_) => f.write_str("Raw(..)"),
        }
    }
}

/// Anything an initializer may return.
pub trait IntoContextStore {
    type Schema: State;

    fn into_context_store(self) -> ContextStore<Self::Schema>;
}

impl<S: State> IntoContextStore for StoreApi<S> {
    type Schema = S;

    fn into_context_store(self) -> ContextStore<S> {
        ContextStore::Extended(self)
    }
}

impl<S: State> IntoContextStore for Store<S> {
    type Schema = S;

    fn into_context_store(self) -> ContextStore<S> {
        ContextStore::Raw(self)
    }
}

impl<S: State> IntoContextStore for ContextStore<S> {
    type Schema = S;

    fn into_context_store(self) -> ContextStore<S> {
        self
    }
}

type Nullary<S> = Arc<dyn Fn() -> ContextStore<S> + Send + Sync>;
type Unary<S, P> = Arc<dyn Fn(P) -> ContextStore<S> + Send + Sync>;

enum Initializer<S, P> {
    Nullary(Nullary<S>),
    Unary(Unary<S, P>),
}

struct Inner<S, P> {
    key: ContextKey,
    init: Initializer<S, P>,
}

/// What a mounted provider publishes to its subtree.
struct Provided<S> {
    handle: ContextStore<S>,
    hooks: Hooks<S>,
}

/// A store factory bound to a provider scope.
///
/// Every mounted [`StoreProvider`] owns its own store, created on its first
/// render. Descendants reach the nearest one through
/// [`store`](StoreContext::store). Each context has its own identity, so two
/// contexts over the same state type never see each other's providers.
pub struct StoreContext<S, P = ()> {
    inner: Arc<Inner<S, P>>,
}

/// Create a context whose initializer takes no arguments.
///
/// ```rust
/// use tincan_utils::render::{component, Root, View};
/// use tincan_utils::{create, create_context, state};
///
/// state! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Counter {
///         pub count: i32,
///     }
/// }
///
/// let counter = create_context(|| create(Counter { count: 9 }));
/// let consumer = {
///     let counter = counter.clone();
///     component(move |cx| {
///         let hooks = counter.store(cx)?;
///         let count: i32 = hooks.value(cx, "useCount")?;
///         Ok(View::text(format!("Count: {count}")))
///     })
/// };
///
/// let root = Root::mount(counter.provider(None, consumer)).unwrap();
/// assert_eq!(root.text(), "Count: 9");
/// ```
pub fn create_context<H, F>(init: F) -> StoreContext<H::Schema>
where
    H: IntoContextStore,
    F: Fn() -> H + Send + Sync + 'static,
{
    StoreContext::from_initializer(Initializer::Nullary(Arc::new(move || {
        init().into_context_store()
    })))
}

/// Create a context whose initializer takes the provider's initial state.
///
/// Mounting its provider without an initial state fails with
/// [`Error::MissingInitialState`].
pub fn create_context_with<P, H, F>(init: F) -> StoreContext<H::Schema, P>
where
    P: Send + 'static,
    H: IntoContextStore,
    F: Fn(P) -> H + Send + Sync + 'static,
{
    StoreContext::from_initializer(Initializer::Unary(Arc::new(move |initial| {
        init(initial).into_context_store()
    })))
}

impl<S: State, P: Send + 'static> StoreContext<S, P> {
    fn from_initializer(init: Initializer<S, P>) -> Self {
        Self {
            inner: Arc::new(Inner {
                key: ContextKey::new(),
                init,
            }),
        }
    }

    /// A provider component rendering `children` under a fresh store.
    pub fn provider(
        &self,
        initial_state: Option<P>,
        children: impl Component,
    ) -> StoreProvider<S, P> {
        StoreProvider {
            context: self.clone(),
            initial_state: Mutex::new(initial_state),
            children: Arc::new(children),
        }
    }

    /// Hooks of the nearest provider's store.
    pub fn store(&self, cx: &RenderCx) -> Result<Hooks<S>> {
        self.provided(cx).map(|provided| provided.hooks.clone())
    }

    /// The nearest provider's store handle itself.
    pub fn handle(&self, cx: &RenderCx) -> Result<ContextStore<S>> {
        self.provided(cx).map(|provided| provided.handle.clone())
    }

    fn provided(&self, cx: &RenderCx) -> Result<Arc<Provided<S>>> {
        cx.consume::<Provided<S>>(self.inner.key)
            .ok_or(Error::MissingProvider)
    }

    fn instantiate(&self, initial_state: Option<P>) -> Result<Provided<S>> {
        let handle = match &self.inner.init {
            Initializer::Nullary(init) => init(),
            Initializer::Unary(init) => init(initial_state.ok_or(Error::MissingInitialState)?),
        };
        debug!(context = ?self.inner.key, "provider store initialised");
        Ok(Provided {
            hooks: handle.hooks(),
            handle,
        })
    }
}

impl<S, P> Clone for StoreContext<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, P> fmt::Debug for StoreContext<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arity = match self.inner.init {
            Initializer::Nullary(_) => "nullary",
            Initializer::Unary(_) => "unary",
        };
        f.debug_struct("StoreContext")
            .field("key", &self.inner.key)
            .field("initializer", &arity)
            .finish()
    }
}

/// Provider component built by [`StoreContext::provider`].
///
/// The initial state is consumed by the first render; a provider rendered
/// again keeps the store it created.
pub struct StoreProvider<S, P = ()> {
    context: StoreContext<S, P>,
    initial_state: Mutex<Option<P>>,
    children: Arc<dyn Component>,
}

impl<S: State, P: Send + 'static> Component for StoreProvider<S, P> {
    fn render(&self, cx: &mut RenderCx) -> Result<View> {
        let provided = cx.try_use_lazy(|| {
            let initial_state = self
                .initial_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            self.context.instantiate(initial_state)
        })?;
        cx.provide(self.context.inner.key, provided);
        cx.child_shared("children", Arc::clone(&self.children))
    }
}
