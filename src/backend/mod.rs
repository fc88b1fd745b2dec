pub mod client;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::asset::{Category, Paginated};
use crate::models::order::{Order, PriceQuote};
use crate::models::token::{ApiToken, TokenConfig};
use crate::models::user::{AuthResponse, Credentials, ProfileUpdate, Registration, User};

pub use client::BackendClient;

/// The PicNode REST backend. All business logic lives behind this trait.
/// Implementations: BackendClient (reqwest), in-memory fakes in tests.
///
/// Authenticated calls take the bearer token explicitly so a single backend
/// handle can serve several sessions.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, AppError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, AppError>;

    async fn logout(&self, token: &str) -> Result<(), AppError>;

    async fn current_user(&self, token: &str) -> Result<User, AppError>;

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<User, AppError>;

    async fn send_verification_email(&self, token: &str) -> Result<(), AppError>;

    async fn list_tokens(&self, token: &str) -> Result<Vec<ApiToken>, AppError>;

    /// `idempotency_key` lets the backend collapse duplicate submissions.
    async fn create_token(
        &self,
        token: &str,
        config: &TokenConfig,
        idempotency_key: &str,
    ) -> Result<ApiToken, AppError>;

    async fn list_orders(&self, token: &str) -> Result<Vec<Order>, AppError>;

    async fn calculate_price(&self, config: &TokenConfig) -> Result<PriceQuote, AppError>;

    async fn list_resources(
        &self,
        category: Category,
        page: u32,
        search: Option<&str>,
    ) -> Result<Paginated<serde_json::Value>, AppError>;
}
