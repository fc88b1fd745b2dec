//! reqwest implementation of the `Backend` trait.
//!
//! No retries and no request cancellation: every failure is returned to the
//! caller as a terminal `AppError` for that attempt.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::Backend;
use crate::config::{self, Config};
use crate::errors::{AppError, FREE_ORDER_CLAIMED_MESSAGE};
use crate::models::asset::{Category, Paginated};
use crate::models::order::{Order, PriceQuote};
use crate::models::token::{ApiToken, TokenConfig};
use crate::models::user::{AuthResponse, Credentials, ProfileUpdate, Registration, User};

pub struct BackendClient {
    base_url: String,
    http: Client,
}

/// Laravel-style error body: `{ "message": "...", "errors": { "field": ["..."] } }`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

impl BackendClient {
    pub fn new(cfg: &Config) -> Result<Self, AppError> {
        Ok(Self {
            base_url: cfg.api_url.trim_end_matches('/').to_string(),
            http: config::http_client(cfg)?,
        })
    }

    /// Client against an explicit base URL with default settings.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, AppError> {
        let cfg = Config {
            api_url: base_url.into(),
            ..Config::default()
        };
        Self::new(&cfg)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, AppError> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, "backend request failed");
            AppError::Network(e.to_string())
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| AppError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "backend returned error status");
            return Err(error_from_response(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| AppError::Network(format!("invalid JSON from backend: {}", e)))
    }

    async fn send_as<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, AppError> {
        let body = self.send(req).await?;
        decode(body)
    }
}

/// Map a non-2xx backend response onto the error taxonomy.
pub(crate) fn error_from_response(status: StatusCode, text: &str) -> AppError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let message = body
        .message
        .or(body.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected error")
                .to_string()
        });

    if message.to_lowercase().contains(FREE_ORDER_CLAIMED_MESSAGE) {
        return AppError::FreeOrderAlreadyClaimed;
    }

    match status {
        StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation {
            message,
            errors: body.errors,
        },
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        _ => AppError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Decode a payload that may or may not be wrapped in `{ "data": ... }`.
fn decode<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    match serde_json::from_value::<T>(body.clone()) {
        Ok(v) => Ok(v),
        Err(first) => match body.get("data") {
            Some(inner) => serde_json::from_value(inner.clone())
                .map_err(|e| AppError::Network(format!("unexpected backend payload: {}", e))),
            None => Err(AppError::Network(format!(
                "unexpected backend payload: {}",
                first
            ))),
        },
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, AppError> {
        tracing::info!(email = %registration.email, "registering account");
        self.send_as(self.request(Method::POST, "register", None).json(registration))
            .await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, AppError> {
        tracing::info!(email = %credentials.email, "logging in");
        self.send_as(self.request(Method::POST, "login", None).json(credentials))
            .await
    }

    async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.send(self.request(Method::POST, "logout", Some(token)))
            .await
            .map(|_| ())
    }

    async fn current_user(&self, token: &str) -> Result<User, AppError> {
        self.send_as(self.request(Method::GET, "user", Some(token)))
            .await
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<User, AppError> {
        self.send_as(
            self.request(Method::PUT, "user/profile", Some(token))
                .json(update),
        )
        .await
    }

    async fn send_verification_email(&self, token: &str) -> Result<(), AppError> {
        self.send(self.request(Method::POST, "email/verification-notification", Some(token)))
            .await
            .map(|_| ())
    }

    async fn list_tokens(&self, token: &str) -> Result<Vec<ApiToken>, AppError> {
        self.send_as(self.request(Method::GET, "tokens", Some(token)))
            .await
    }

    async fn create_token(
        &self,
        token: &str,
        config: &TokenConfig,
        idempotency_key: &str,
    ) -> Result<ApiToken, AppError> {
        tracing::info!(
            validity = config.validity,
            apis = config.apis.len(),
            idempotency_key,
            "creating token"
        );
        self.send_as(
            self.request(Method::POST, "tokens", Some(token))
                .header("Idempotency-Key", idempotency_key)
                .json(config),
        )
        .await
    }

    async fn list_orders(&self, token: &str) -> Result<Vec<Order>, AppError> {
        self.send_as(self.request(Method::GET, "orders", Some(token)))
            .await
    }

    async fn calculate_price(&self, config: &TokenConfig) -> Result<PriceQuote, AppError> {
        self.send_as(
            self.request(Method::POST, "calculate-price", None)
                .json(config),
        )
        .await
    }

    async fn list_resources(
        &self,
        category: Category,
        page: u32,
        search: Option<&str>,
    ) -> Result<Paginated<Value>, AppError> {
        let mut query = vec![("page", page.to_string())];
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", term.to_string()));
        }
        tracing::debug!(category = %category, page, "listing resources");
        self.send_as(
            self.request(Method::GET, category.slug(), None)
                .query(&query),
        )
        .await
    }
}
