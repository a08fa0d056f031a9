use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use super::middleware::Middleware;
use crate::error::Result;

type Callback<T> = dyn Fn(&T, &T) + Send + Sync;

static NEXT_STORE_ID: AtomicUsize = AtomicUsize::new(0);

struct Listener<T> {
    active: AtomicBool,
    callback: Box<Callback<T>>,
}

type ListenerList<T> = Arc<RwLock<Vec<Arc<Listener<T>>>>>;

/// A thread-safe store for managing application state.
///
/// Every write replaces the whole state and notifies all listeners with the
/// new and previous state. Writes pass through the store's middlewares
/// before they are committed.
pub struct Store<T> {
    id: usize,
    state: Arc<RwLock<T>>,
    listeners: ListenerList<T>,
    middlewares: Arc<[Arc<dyn Middleware<T>>]>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        Self::from_parts(initial, Arc::from(Vec::new()))
    }

    /// Create a store whose writes run through `middlewares`, in order.
    ///
    /// Each middleware may rewrite the initial state (persist uses this to
    /// rehydrate), so creation can fail.
    pub fn with_middlewares(initial: T, middlewares: Vec<Arc<dyn Middleware<T>>>) -> Result<Self> {
        let mut state = initial;
        for middleware in &middlewares {
            state = middleware.init(state)?;
            trace!(middleware = middleware.name(), "middleware initialised");
        }
        Ok(Self::from_parts(state, Arc::from(middlewares)))
    }

    fn from_parts(initial: T, middlewares: Arc<[Arc<dyn Middleware<T>>]>) -> Self {
        let id = NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(store = id, middlewares = middlewares.len(), "store created");
        Self {
            id,
            state: Arc::new(RwLock::new(initial)),
            listeners: Arc::new(RwLock::new(Vec::new())),
            middlewares,
        }
    }

    /// Get a clone of the current state.
    pub fn get_state(&self) -> T {
        self.read_state().clone()
    }

    /// Replace the state and notify every listener.
    pub fn set_state(&self, next: T) {
        self.replace_with(move |_| Some(next));
    }

    /// Update the state using a function.
    ///
    /// The function edits a copy of the state while writers are locked out,
    /// so concurrent updates never overwrite each other.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.replace_with(move |state| {
            let mut next = state.clone();
            f(&mut next);
            Some(next)
        });
    }

    /// Compute the next state from the current one, or skip the write by
    /// returning `None`.
    ///
    /// Reading the current state, the middleware `apply` pass and the commit
    /// happen under the write lock; `committed` hooks and listeners run after
    /// it is released. `f` and `apply` must not access this store. Returns
    /// whether a write happened.
    pub fn replace_with<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let (current, prev) = {
            let mut state = self.write_state();
            let Some(next) = f(&state) else {
                return false;
            };
            let prev = state.clone();
            let next = self
                .middlewares
                .iter()
                .fold(next, |next, middleware| middleware.apply(&prev, next));
            *state = next.clone();
            (next, prev)
        };

        for middleware in self.middlewares.iter() {
            middleware.committed(&current);
        }
        self.notify(&current, &prev);
        true
    }

    /// Read state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.read_state();
        f(&state)
    }

    /// Subscribe to state changes.
    ///
    /// The callback receives the new and the previous state after every
    /// write. The listener stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let listener = Arc::new(Listener {
            active: AtomicBool::new(true),
            callback: Box::new(callback),
        });
        self.lock_listeners().push(Arc::clone(&listener));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            listener.active.store(false, Ordering::SeqCst);
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|entry| !Arc::ptr_eq(entry, &listener));
            }
        })
    }

    /// Subscribe to a slice of the state.
    ///
    /// `listener` runs with the new and previous selected values, and only
    /// when the selected value changes.
    pub fn subscribe_with_selector<V, S, F>(&self, selector: S, listener: F) -> Subscription
    where
        V: Clone + PartialEq + Send + 'static,
        S: Fn(&T) -> V + Send + Sync + 'static,
        F: Fn(&V, &V) + Send + Sync + 'static,
    {
        let last = Mutex::new(selector(&self.get_state()));
        self.subscribe(move |state, _prev| {
            let selected = selector(state);
            let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == selected {
                return;
            }
            let current = selected.clone();
            let previous = std::mem::replace(&mut *last, selected);
            drop(last);
            listener(&current, &previous);
        })
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether two handles share the same underlying state.
    pub fn same_store(&self, other: &Store<T>) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Notify all listeners of a state change.
    fn notify(&self, current: &T, prev: &T) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        trace!(
            store = self.id,
            listeners = listeners.len(),
            "notifying listeners"
        );
        for listener in listeners {
            // Skip listeners removed by an earlier callback in this round.
            if listener.active.load(Ordering::SeqCst) {
                (listener.callback)(current, prev);
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, T> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, T> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> RwLockWriteGuard<'_, Vec<Arc<Listener<T>>>> {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Arc::clone(&self.state),
            listeners: Arc::clone(&self.listeners),
            middlewares: Arc::clone(&self.middlewares),
        }
    }
}

/// RAII guard for store listeners.
///
/// Dropping the guard removes the listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    /// Keep the listener registered for as long as the store lives.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}
