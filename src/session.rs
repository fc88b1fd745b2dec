//! Authenticated session: the bearer token and cached user record kept in
//! local storage under `picnode_token` / `picnode_user`.

use std::sync::Arc;

use crate::backend::Backend;
use crate::errors::AppError;
use crate::models::user::{AuthResponse, Credentials, ProfileUpdate, Registration, User};
use crate::store::{keys, KeyValueStore};

#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn Backend>,
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { backend, store }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn token(&self) -> Option<String> {
        self.store
            .get(keys::AUTH_TOKEN)
            .filter(|t| !t.trim().is_empty())
    }

    /// The cached user record. An unparsable record counts as absent.
    pub fn cached_user(&self) -> Option<User> {
        let raw = self.store.get(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable cached user");
                None
            }
        }
    }

    pub fn require_token(&self) -> Result<String, AppError> {
        self.token()
            .ok_or_else(|| AppError::Unauthorized("not logged in".into()))
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, AppError> {
        let resp = self.backend.login(credentials).await?;
        self.persist(resp)
    }

    /// Register without establishing a session; callers log in afterwards.
    pub async fn register(&self, registration: &Registration) -> Result<User, AppError> {
        let resp = self.backend.register(registration).await?;
        Ok(resp.user)
    }

    /// Clears local state even when the remote logout fails.
    pub async fn logout(&self) -> Result<(), AppError> {
        let remote = match self.token() {
            Some(token) => self.backend.logout(&token).await,
            None => Ok(()),
        };
        self.clear()?;
        if let Err(ref e) = remote {
            tracing::warn!(error = %e, "remote logout failed, local session cleared anyway");
        }
        remote
    }

    /// Re-fetch the current user. A 401 drops the stale session.
    pub async fn refresh_user(&self) -> Result<User, AppError> {
        let token = self.require_token()?;
        match self.backend.current_user(&token).await {
            Ok(user) => {
                self.store_user(&user)?;
                Ok(user)
            }
            Err(AppError::Unauthorized(msg)) => {
                tracing::info!("session expired, clearing cached credentials");
                self.clear()?;
                Err(AppError::Unauthorized(msg))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, AppError> {
        let token = self.require_token()?;
        let user = self.backend.update_profile(&token, update).await?;
        self.store_user(&user)?;
        Ok(user)
    }

    pub async fn send_verification_email(&self) -> Result<(), AppError> {
        let token = self.require_token()?;
        self.backend.send_verification_email(&token).await
    }

    fn persist(&self, resp: AuthResponse) -> Result<User, AppError> {
        self.store.set(keys::AUTH_TOKEN, &resp.token)?;
        self.store_user(&resp.user)?;
        Ok(resp.user)
    }

    fn store_user(&self, user: &User) -> Result<(), AppError> {
        let json = serde_json::to_string(user).map_err(|e| AppError::Storage(e.to_string()))?;
        self.store.set(keys::USER, &json)
    }

    fn clear(&self) -> Result<(), AppError> {
        self.store.remove(keys::AUTH_TOKEN)?;
        self.store.remove(keys::USER)
    }
}
