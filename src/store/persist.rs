use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::middleware::Middleware;
use crate::error::{Error, Result};

/// Key/value backend for persisted state.
pub trait StateStorage: Send + Sync {
    fn get_item(&self, name: &str) -> Result<Option<String>>;
    fn set_item(&self, name: &str, value: &str) -> Result<()>;
    fn remove_item(&self, name: &str) -> Result<()>;
}

/// In-process storage, mostly useful for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(name).cloned())
    }

    fn set_item(&self, name: &str, value: &str) -> Result<()> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<()> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

/// Stores each entry as `<name>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for storage, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl StateStorage for FileStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path(name)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, name: &str, value: &str) -> Result<()> {
        std::fs::write(self.path(name), value)?;
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<()> {
        match std::fs::remove_file(self.path(name)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Where and how a store is persisted.
#[derive(Clone)]
pub struct PersistOptions {
    pub name: String,
    pub version: u32,
    pub storage: Arc<dyn StateStorage>,
}

impl PersistOptions {
    pub fn new(name: impl Into<String>, storage: Arc<dyn StateStorage>) -> Self {
        Self {
            name: name.into(),
            version: 0,
            storage,
        }
    }

    /// Stored state written under another version is ignored on load.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

impl fmt::Debug for PersistOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistOptions")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Stored<T> {
    version: u32,
    state: T,
}

#[derive(Serialize)]
struct StoredRef<'a, T> {
    version: u32,
    state: &'a T,
}

/// Middleware that rehydrates the state from storage and writes it back
/// after every change.
pub struct Persist<T> {
    options: PersistOptions,
    _state: PhantomData<fn(T) -> T>,
}

impl<T> Persist<T> {
    pub fn new(options: PersistOptions) -> Self {
        Self {
            options,
            _state: PhantomData,
        }
    }
}

impl<T> Middleware<T> for Persist<T>
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        "persist"
    }

    fn init(&self, state: T) -> Result<T> {
        let Some(raw) = self.options.storage.get_item(&self.options.name)? else {
            debug!(name = %self.options.name, "nothing persisted yet");
            return Ok(state);
        };
        let stored: Stored<serde_json::Value> = serde_json::from_str(&raw)?;
        if stored.version != self.options.version {
            warn!(
                name = %self.options.name,
                stored = stored.version,
                expected = self.options.version,
                "persisted state version mismatch, keeping initial state"
            );
            return Ok(state);
        }
        let state = serde_json::from_value(stored.state)?;
        debug!(name = %self.options.name, "state rehydrated");
        Ok(state)
    }

    fn committed(&self, state: &T) {
        let stored = StoredRef {
            version: self.options.version,
            state,
        };
        let written = serde_json::to_string(&stored)
            .map_err(Error::from)
            .and_then(|raw| self.options.storage.set_item(&self.options.name, &raw));
        if let Err(e) = written {
            warn!(name = %self.options.name, error = %e, "failed to persist state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        size: u8,
    }

    fn prefs() -> Prefs {
        Prefs {
            theme: "light".to_string(),
            size: 12,
        }
    }

    fn persisted_store(options: PersistOptions) -> Result<Store<Prefs>> {
        let middlewares: Vec<Arc<dyn Middleware<Prefs>>> = vec![Arc::new(Persist::new(options))];
        Store::with_middlewares(prefs(), middlewares)
    }

    #[test]
    fn writes_after_every_change() {
        let storage = Arc::new(MemoryStorage::new());
        let store = persisted_store(PersistOptions::new("prefs", storage.clone())).unwrap();
        assert_eq!(storage.get_item("prefs").unwrap(), None);

        store.update(|p| p.size = 14);
        let raw = storage.get_item("prefs").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["size"], 14);
    }

    #[test]
    fn rehydrates_matching_version() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(
                "prefs",
                r#"{"version":2,"state":{"theme":"dark","size":9}}"#,
            )
            .unwrap();

        let store =
            persisted_store(PersistOptions::new("prefs", storage.clone()).version(2)).unwrap();
        assert_eq!(store.get_state().theme, "dark");

        let stale = persisted_store(PersistOptions::new("prefs", storage).version(3)).unwrap();
        assert_eq!(stale.get_state(), prefs());
    }

    #[test]
    fn corrupt_storage_fails_creation() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("prefs", "{not json").unwrap();
        let result = persisted_store(PersistOptions::new("prefs", storage));
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state")).unwrap();

        assert_eq!(storage.get_item("prefs").unwrap(), None);
        storage.set_item("prefs", "{}").unwrap();
        assert_eq!(storage.get_item("prefs").unwrap().as_deref(), Some("{}"));
        assert!(dir.path().join("state/prefs.json").exists());

        storage.remove_item("prefs").unwrap();
        storage.remove_item("prefs").unwrap();
        assert_eq!(storage.get_item("prefs").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_store_restart() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StateStorage> = Arc::new(FileStorage::new(dir.path()).unwrap());

        let first = persisted_store(PersistOptions::new("prefs", storage.clone())).unwrap();
        first.update(|p| p.theme = "solarized".to_string());
        drop(first);

        let second = persisted_store(PersistOptions::new("prefs", storage)).unwrap();
        assert_eq!(second.get_state().theme, "solarized");
    }
}
