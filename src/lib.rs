//! # Tincan utils
//!
//! Generated accessors and provider-scoped stores on top of a small reactive
//! store.
//!
//! Declare a flat state with [`state!`] and hand an initial value to
//! [`create`]. The returned [`StoreApi`] carries three capability sets, each
//! addressed by a name derived from the state keys:
//!
//! - getters: `count` reads the live value
//! - setters: `count` writes it, and does nothing when the value is unchanged
//! - hooks: `useCount` reads it inside a component and re-renders that
//!   component when it changes; `useActions` returns every `set<Key>` setter
//!   plus custom actions
//!
//! Derived values and mutations are added with [`StoreApi::selectors`] and
//! [`StoreApi::actions`], in any order. Typed access is available through the
//! field descriptors generated by [`state!`] (`Counter::count()`).
//!
//! [`create_context`] binds a store factory to a provider component so that
//! every mounted provider owns a store and its descendants reach it without
//! passing it down by hand. The [`render`] module is the component host this
//! works against.
//!
//! ```rust
//! use tincan_utils::{create, state};
//!
//! state! {
//!     #[derive(Clone, Debug, PartialEq)]
//!     pub struct Counter {
//!         pub count: i32,
//!     }
//! }
//!
//! let api = create(Counter { count: 0 });
//! api.set().call("count", 5).unwrap();
//! assert_eq!(api.get().value::<i32>("count").unwrap(), 5);
//! assert!(api.hooks().contains("useCount"));
//! ```

mod api;
pub mod context;
mod error;
mod macros;
pub mod render;
mod state;
pub mod store;

pub use api::{
    capitalize, create, create_hooks, create_with, hook_name, setter_name, Actions, Getters, Hooks,
    Selectors, Setters, StoreApi, StoreOptions,
};
pub use context::{create_context, create_context_with, ContextStore, StoreContext, StoreProvider};
pub use error::{Error, Result};
pub use state::{Field, FieldVisitor, State, Value};
pub use store::{
    Devtools, DevtoolsOptions, FileStorage, MemoryStorage, Middleware, PersistOptions,
    StateStorage, Store, Subscription,
};

#[cfg(test)]
mod tests {
    use super::*;

    state! {
        #[derive(Clone, Debug, PartialEq)]
        struct Smoke {
            value: i32,
        }
    }

    #[test]
    fn it_works() {
        let api = create(Smoke { value: 0 });
        assert_eq!(api.get().field(Smoke::value()), 0);
        api.set().field(Smoke::value(), 42);
        assert_eq!(api.get().field(Smoke::value()), 42);
    }
}
