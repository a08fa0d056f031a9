use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use tracing::debug;

use super::middleware::Middleware;
use crate::error::Result;

/// Devtools configuration, loadable from any serde source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DevtoolsOptions {
    /// Name the store is reported under.
    pub name: String,
    pub enabled: bool,
}

impl Default for DevtoolsOptions {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            enabled: true,
        }
    }
}

impl DevtoolsOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Middleware that reports every committed change as a tracing event on the
/// `tincan_utils::devtools` target.
#[derive(Debug)]
pub struct Devtools {
    options: DevtoolsOptions,
    changes: AtomicUsize,
}

impl Devtools {
    pub fn new(options: DevtoolsOptions) -> Self {
        Self {
            options,
            changes: AtomicUsize::new(0),
        }
    }

    /// Number of changes reported so far.
    pub fn changes(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }
}

impl<T> Middleware<T> for Devtools {
    fn name(&self) -> &str {
        "devtools"
    }

    fn init(&self, state: T) -> Result<T> {
        if self.options.enabled {
            debug!(
                target: "tincan_utils::devtools",
                store = %self.options.name,
                "devtools attached"
            );
        }
        Ok(state)
    }

    fn committed(&self, _state: &T) {
        if !self.options.enabled {
            return;
        }
        let change = self.changes.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            target: "tincan_utils::devtools",
            store = %self.options.name,
            change,
            "state committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use std::sync::Arc;

    #[test]
    fn options_deserialize_with_defaults() {
        let options: DevtoolsOptions = serde_json::from_str(r#"{"name":"cart"}"#).unwrap();
        assert_eq!(options, DevtoolsOptions::named("cart"));

        let options: DevtoolsOptions = serde_json::from_str(r#"{"enabled":false}"#).unwrap();
        assert_eq!(options.name, "store");
        assert!(!options.enabled);
    }

    #[test]
    fn counts_committed_changes() {
        let devtools = Arc::new(Devtools::new(DevtoolsOptions::named("counter")));
        let middlewares: Vec<Arc<dyn Middleware<i32>>> = vec![Arc::new(devtools.clone())];
        let store = Store::with_middlewares(0, middlewares).unwrap();

        store.set_state(1);
        store.update(|n| *n += 1);
        assert_eq!(devtools.changes(), 2);
    }

    #[test]
    fn unchanged_setter_writes_are_not_counted() {
        crate::state! {
            #[derive(Clone, Debug, PartialEq)]
            struct Counter {
                count: i32,
            }
        }

        let devtools = Arc::new(Devtools::new(DevtoolsOptions::named("counter")));
        let api = crate::create_with(
            Counter { count: 9 },
            crate::StoreOptions::new().middleware(devtools.clone()),
        )
        .unwrap();

        api.set().call("count", 9).unwrap();
        assert_eq!(devtools.changes(), 0);

        api.set().call("count", 10).unwrap();
        api.hooks().use_actions().call("setCount", 10).unwrap();
        assert_eq!(devtools.changes(), 1);
    }

    #[test]
    fn disabled_devtools_stays_silent() {
        let devtools = Devtools::new(DevtoolsOptions {
            enabled: false,
            ..DevtoolsOptions::default()
        });
        Middleware::<i32>::committed(&devtools, &1);
        assert_eq!(devtools.changes(), 0);
    }
}
