use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::getters::Getters;
use super::hooks::{create_hooks, Hooks};
use super::registry::Registry;
use super::selectors::Selectors;
use super::setters::{Actions, Setters};
use crate::error::Result;
use crate::state::State;
use crate::store::{Devtools, DevtoolsOptions, Middleware, Persist, PersistOptions, Store};

/// Middleware configuration for [`create_with`].
///
/// The pipeline runs custom middlewares in insertion order, then persist,
/// then devtools.
pub struct StoreOptions<S> {
    devtools: Option<DevtoolsOptions>,
    persist: Option<Arc<dyn Middleware<S>>>,
    middlewares: Vec<Arc<dyn Middleware<S>>>,
}

impl<S: State> StoreOptions<S> {
    pub fn new() -> Self {
        Self {
            devtools: None,
            persist: None,
            middlewares: Vec::new(),
        }
    }

    pub fn devtools(mut self, options: DevtoolsOptions) -> Self {
        self.devtools = Some(options);
        self
    }

    pub fn persist(mut self, options: PersistOptions) -> Self
    where
        S: Serialize + DeserializeOwned,
    {
        self.persist = Some(Arc::new(Persist::<S>::new(options)));
        self
    }

    pub fn middleware(mut self, middleware: impl Middleware<S> + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    fn into_pipeline(self) -> Vec<Arc<dyn Middleware<S>>> {
        let mut pipeline = self.middlewares;
        pipeline.extend(self.persist);
        if let Some(options) = self.devtools {
            pipeline.push(Arc::new(Devtools::new(options)));
        }
        pipeline
    }
}

impl<S: State> Default for StoreOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A store with generated accessors.
///
/// `get()` and `set()` hold one getter and one setter per state key, named by
/// the key; `hooks()` holds `use<Key>` for each key and `useActions`.
/// [`selectors`](StoreApi::selectors) and [`actions`](StoreApi::actions)
/// return extended copies and can be chained in any order.
pub struct StoreApi<S> {
    store: Store<S>,
    get: Getters<S>,
    set: Setters<S>,
    hooks: Hooks<S>,
}

/// Create a store from its initial state and generate its accessors.
///
/// ```rust
/// use tincan_utils::{create, state, Actions, Selectors};
///
/// state! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Counter {
///         pub count: i32,
///     }
/// }
///
/// let api = create(Counter { count: 1 })
///     .selectors(|get| {
///         let get = get.clone();
///         Selectors::new().add("doubleCount", move |()| get.field(Counter::count()) * 2)
///     })
///     .actions(|set, get| {
///         let (set, get) = (set.clone(), get.clone());
///         Actions::new().add("inc", move |by: i32| {
///             set.field(Counter::count(), get.field(Counter::count()) + by)
///         })
///     });
///
/// api.set().call("inc", 2).unwrap();
/// assert_eq!(api.get().value::<i32>("doubleCount").unwrap(), 6);
/// ```
pub fn create<S: State>(initial: S) -> StoreApi<S> {
    StoreApi::from_store(Store::new(initial))
}

/// Like [`create`], with a middleware pipeline.
///
/// Fails if a middleware rejects the initial state, e.g. when persisted
/// state cannot be read back.
pub fn create_with<S: State>(initial: S, options: StoreOptions<S>) -> Result<StoreApi<S>> {
    let store = Store::with_middlewares(initial, options.into_pipeline())?;
    Ok(StoreApi::from_store(store))
}

impl<S: State> StoreApi<S> {
    /// Wrap an existing store.
    pub fn from_store(store: Store<S>) -> Self {
        debug!(keys = ?S::keys(), "generating store accessors");
        Self {
            get: Getters::from_store(&store),
            set: Setters::from_store(&store),
            hooks: create_hooks(&store),
            store,
        }
    }

    pub fn get(&self) -> &Getters<S> {
        &self.get
    }

    pub fn set(&self) -> &Setters<S> {
        &self.set
    }

    /// The hook bundle.
    pub fn hooks(&self) -> &Hooks<S> {
        &self.hooks
    }

    /// The underlying store.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    /// Add derived values.
    ///
    /// The builder sees the current getters. Each selector becomes a getter
    /// and a `use<Name>` hook; a selector named like an existing key replaces
    /// that key's getter and hook.
    pub fn selectors<F>(&self, builder: F) -> Self
    where
        F: FnOnce(&Getters<S>) -> Selectors<S>,
    {
        let selectors = builder(&self.get);
        debug!(selectors = ?selectors.names(), "adding selectors");

        let mut get = self.get.clone();
        let mut hooks = Registry::default();
        selectors.install(&self.store, &mut get.entries, &mut hooks);

        Self {
            store: self.store.clone(),
            get,
            set: self.set.clone(),
            hooks: self.hooks.with_selector_hooks(&hooks),
        }
    }

    /// Add mutation functions.
    ///
    /// The builder sees the current setters and getters. Its actions are
    /// merged into `set()` and into the `useActions` bundle; generated
    /// setters are kept.
    pub fn actions<F>(&self, builder: F) -> Self
    where
        F: FnOnce(&Setters<S>, &Getters<S>) -> Actions,
    {
        let actions = builder(&self.set, &self.get);
        debug!(actions = ?actions.names(), "adding actions");

        Self {
            store: self.store.clone(),
            get: self.get.clone(),
            set: self.set.with_actions(&actions),
            hooks: self.hooks.with_actions(&actions),
        }
    }
}

impl<S> Clone for StoreApi<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            get: self.get.clone(),
            set: self.set.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<S> fmt::Debug for StoreApi<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreApi")
            .field("get", &self.get)
            .field("set", &self.set)
            .field("use", &self.hooks)
            .finish_non_exhaustive()
    }
}
