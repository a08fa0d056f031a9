//! Provider-scoped stores.
//!
//! [`create_context`] turns a store factory into a provider component and an
//! accessor. The accessor only works below a mounted provider and fails with
//! [`Error::MissingProvider`](crate::Error::MissingProvider) elsewhere.

mod context;

pub use context::{
    create_context, create_context_with, ContextStore, IntoContextStore, StoreContext,
    StoreProvider,
};
