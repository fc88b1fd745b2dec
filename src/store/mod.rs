pub mod local;

use crate::errors::AppError;

/// Persisted state layout. One key per concern, values stored as strings.
pub mod keys {
    pub const AUTH_TOKEN: &str = "picnode_token";
    pub const USER: &str = "picnode_user";
    pub const LANGUAGE: &str = "language";
    pub const THEME: &str = "theme";
    pub const GLOBAL_API_TOKEN: &str = "picnode_global_api_token";
    pub const GLOBAL_SERVER_URL: &str = "picnode_global_server_url";
    pub const GLOBAL_LIVE_MODE: &str = "picnode_global_live_mode";
}

/// Abstraction over the browser-local key-value storage.
/// Implementations: MemoryStore (tests, ephemeral sessions), FileStore (JSON file).
///
/// Writes are last-write-wins. There is no cross-process lock.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    fn remove(&self, key: &str) -> Result<(), AppError>;

    /// Re-read the backing medium, picking up writes from other processes.
    /// Returns the keys whose values changed.
    fn reload(&self) -> Result<Vec<String>, AppError> {
        Ok(Vec::new())
    }
}

pub use local::{FileStore, MemoryStore};
