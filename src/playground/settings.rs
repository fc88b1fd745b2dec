//! Settings shared by every playground instance: bearer token, server URL and
//! live/mock mode. Each field is mirrored to its own storage key on change.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use url::Url;

use crate::errors::AppError;
use crate::store::{keys, KeyValueStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GlobalPlaygroundState {
    pub token: String,
    pub server_url: String,
    pub live_mode: bool,
}

/// Cheaply cloneable handle; clones share state.
#[derive(Clone)]
pub struct PlaygroundSettings {
    store: Arc<dyn KeyValueStore>,
    state: Arc<RwLock<GlobalPlaygroundState>>,
}

impl PlaygroundSettings {
    /// Restore from storage. Missing keys fall back to empty values and mock mode.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let state = GlobalPlaygroundState {
            token: store.get(keys::GLOBAL_API_TOKEN).unwrap_or_default(),
            server_url: store.get(keys::GLOBAL_SERVER_URL).unwrap_or_default(),
            live_mode: store
                .get(keys::GLOBAL_LIVE_MODE)
                .map(|v| v.trim() == "true")
                .unwrap_or(false),
        };
        Self {
            store,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn snapshot(&self) -> GlobalPlaygroundState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn token(&self) -> String {
        self.snapshot().token
    }

    pub fn server_url(&self) -> String {
        self.snapshot().server_url
    }

    pub fn live_mode(&self) -> bool {
        self.snapshot().live_mode
    }

    /// Callers persist first, so memory never runs ahead of storage.
    fn update(&self, f: impl FnOnce(&mut GlobalPlaygroundState)) {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard);
    }

    pub fn set_token(&self, token: &str) -> Result<(), AppError> {
        self.store.set(keys::GLOBAL_API_TOKEN, token)?;
        self.update(|s| s.token = token.to_string());
        Ok(())
    }

    /// An empty URL clears the selection and falls back to the document's servers.
    pub fn set_server_url(&self, url: &str) -> Result<(), AppError> {
        let url = url.trim().trim_end_matches('/');
        if !url.is_empty() {
            let parsed = Url::parse(url)
                .map_err(|e| AppError::InvalidInput(format!("invalid server URL '{}': {}", url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::InvalidInput(format!(
                    "server URL must use http or https, got '{}'",
                    parsed.scheme()
                )));
            }
        }
        self.store.set(keys::GLOBAL_SERVER_URL, url)?;
        self.update(|s| s.server_url = url.to_string());
        Ok(())
    }

    pub fn set_live_mode(&self, live: bool) -> Result<(), AppError> {
        self.store
            .set(keys::GLOBAL_LIVE_MODE, if live { "true" } else { "false" })?;
        self.update(|s| s.live_mode = live);
        tracing::debug!(live, "playground mode changed");
        Ok(())
    }

    /// Flip live/mock and return the new mode.
    pub fn toggle_live_mode(&self) -> Result<bool, AppError> {
        let live = !self.live_mode();
        self.set_live_mode(live)?;
        Ok(live)
    }
}
