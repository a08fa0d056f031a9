//! The underlying reactive store.
//!
//! Stores own the state and the listener list; every other layer of the crate
//! goes through [`Store::get_state`], [`Store::set_state`] and the
//! subscription methods. Writes run through an ordered middleware pipeline.

mod devtools;
mod middleware;
mod persist;
mod store;

pub use devtools::{Devtools, DevtoolsOptions};
pub use middleware::Middleware;
pub use persist::{FileStorage, MemoryStorage, Persist, PersistOptions, StateStorage};
pub use store::{Store, Subscription};
