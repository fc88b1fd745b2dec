//! Local storage backends.
//!
//! Both keep entries in a `DashMap`. `FileStore` additionally rewrites a JSON
//! object file on every mutation, so state survives process restarts the way
//! browser local storage survives reloads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use super::KeyValueStore;
use crate::errors::AppError;

/// Ephemeral store. Cheap to clone; clones share entries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON-file backed store.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: Arc<DashMap<String, String>>,
}

impl FileStore {
    /// Open the store, creating parent directories as needed.
    /// A missing file is an empty store. A corrupt file is logged and ignored.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Storage(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let store = Self {
            path,
            entries: Arc::new(DashMap::new()),
        };
        let initial = match store.read_raw()? {
            None => BTreeMap::new(),
            Some(raw) => store.parse(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %store.path.display(), error = %e, "local storage file is corrupt, starting empty");
                BTreeMap::new()
            }),
        };
        for (k, v) in initial {
            store.entries.insert(k, v);
        }
        tracing::debug!(path = %store.path.display(), entries = store.entries.len(), "opened local storage");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, AppError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn parse(&self, raw: &str) -> Result<BTreeMap<String, String>, AppError> {
        serde_json::from_str(raw).map_err(|e| {
            AppError::Storage(format!("corrupt storage file {}: {}", self.path.display(), e))
        })
    }

    fn flush(&self) -> Result<(), AppError> {
        let snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| AppError::Storage(e.to_string()))?;

        // Readers in other processes must never see a half-written file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)
            .map_err(|e| AppError::Storage(format!("cannot write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            AppError::Storage(format!("cannot replace {}: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        self.flush()
    }

    /// An unreadable or corrupt file is an error and leaves the current entries untouched.
    fn reload(&self) -> Result<Vec<String>, AppError> {
        let on_disk = match self.read_raw()? {
            Some(raw) => self.parse(&raw)?,
            None => BTreeMap::new(),
        };
        let mut changed = Vec::new();

        for (k, v) in &on_disk {
            if self.get(k).as_deref() != Some(v.as_str()) {
                self.entries.insert(k.clone(), v.clone());
                changed.push(k.clone());
            }
        }

        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !on_disk.contains_key(e.key()))
            .map(|e| e.key().clone())
            .collect();
        for k in stale {
            self.entries.remove(&k);
            changed.push(k);
        }

        Ok(changed)
    }
}
