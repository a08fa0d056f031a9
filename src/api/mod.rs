//! Generated accessors and the chaining store builder.
//!
//! [`create`] wraps a [`Store`](crate::Store) in a [`StoreApi`] holding
//! three capability sets: getters, setters and hooks. Each is keyed by a
//! synthesized accessor name (`count`, `useCount`, `setCount`) and grows with
//! [`StoreApi::selectors`] and [`StoreApi::actions`].

mod create;
mod getters;
mod hooks;
mod naming;
mod registry;
mod selectors;
mod setters;

pub use create::{create, create_with, StoreApi, StoreOptions};
pub use getters::Getters;
pub use hooks::{create_hooks, Hooks};
pub use naming::{capitalize, hook_name, setter_name};
pub use selectors::Selectors;
pub use setters::{Actions, Setters};
