//! Token Store and its durable key-value backing
//!
//! The store holds string values under fixed keys, mirroring browser local
//! storage: `access-token` for the bearer credential and `remember-me` for
//! the persistence opt-in (`"true"` / `"false"`).

use pawhaven_core::{storage_error, PawhavenResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "access-token";
pub const REMEMBER_ME_KEY: &str = "remember-me";

/// Durable string key-value storage scoped to one client installation
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PawhavenResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PawhavenResult<()>;
    fn remove(&self, key: &str) -> PawhavenResult<()>;
}

/// In-process store, used by tests and embedders without a disk
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PawhavenResult<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PawhavenResult<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PawhavenResult<()> {
        self.values().remove(key);
        Ok(())
    }
}

/// JSON-file backed store
///
/// Every read goes to disk so that separate processes see the latest value.
/// Writes replace the file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PawhavenResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    storage_error!(
                        format!("Failed to create {}: {}", parent.display(), e),
                        "file_store",
                        e
                    )
                })?;
            }
        }

        debug!("File store initialized at: {}", path.display());

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> PawhavenResult<HashMap<String, String>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(storage_error!(
                    format!("Failed to read {}: {}", self.path.display(), e),
                    "file_store",
                    e
                ))
            }
        };

        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }

        match serde_json::from_str(&data) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable local state"
                );
                Ok(HashMap::new())
            }
        }
    }

    fn store(&self, values: &HashMap<String, String>) -> PawhavenResult<()> {
        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("tmp");

        std::fs::write(&tmp, json).map_err(|e| {
            storage_error!(
                format!("Failed to write {}: {}", tmp.display(), e),
                "file_store",
                e
            )
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            storage_error!(
                format!("Failed to replace {}: {}", self.path.display(), e),
                "file_store",
                e
            )
        })?;

        Ok(())
    }

    fn update<F>(&self, change: F) -> PawhavenResult<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut values = self.load()?;
        change(&mut values);
        self.store(&values)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> PawhavenResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PawhavenResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> PawhavenResult<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Persisted bearer credential plus the "remember me" opt-in
///
/// Cheap to clone; all clones share the same backing store. No expiry is
/// tracked here: only the backend decides whether a token is still valid.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn save(&self, token: &str) -> PawhavenResult<()> {
        self.backend.set(ACCESS_TOKEN_KEY, token)
    }

    /// The stored token; unreadable storage counts as no token
    pub fn read(&self) -> Option<String> {
        match self.backend.get(ACCESS_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                None
            }
        }
    }

    pub fn clear(&self) -> PawhavenResult<()> {
        self.backend.remove(ACCESS_TOKEN_KEY)
    }

    pub fn save_remember_flag(&self, remember: bool) -> PawhavenResult<()> {
        self.backend
            .set(REMEMBER_ME_KEY, if remember { "true" } else { "false" })
    }

    /// Anything other than a stored `"true"` reads as false
    pub fn read_remember_flag(&self) -> bool {
        match self.backend.get(REMEMBER_ME_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "Failed to read remember flag");
                false
            }
        }
    }

    pub fn clear_remember_flag(&self) -> PawhavenResult<()> {
        self.backend.remove(REMEMBER_ME_KEY)
    }
}
