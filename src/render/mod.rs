//! A minimal component host.
//!
//! Components render a [`View`] through a [`RenderCx`], which gives them
//! positional lazy state, scoped values for descendants and store
//! subscriptions. A component that reads a store through
//! [`RenderCx::use_store`] re-renders by itself when the value it read
//! changes; its parent and siblings do not.

mod cx;
mod node;
mod scope;
mod view;

pub use cx::RenderCx;
pub use node::Root;
pub use scope::{ContextKey, Scope};
pub use view::{component, Component, View};
