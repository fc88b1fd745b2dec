//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use picnode::backend::Backend;
use picnode::errors::AppError;
use picnode::models::asset::{Category, PageMeta, Paginated};
use picnode::models::order::{Order, PriceQuote};
use picnode::models::token::{ApiToken, TokenConfig};
use picnode::models::user::{AuthResponse, Credentials, ProfileUpdate, Registration, User};
use picnode::session::Session;
use picnode::store::{KeyValueStore, MemoryStore};

pub const PASSWORD: &str = "secret123";

/// How `create_token` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimMode {
    Succeed,
    AlreadyClaimed,
    ServerError,
}

#[derive(Debug, Clone)]
pub struct ResourceCall {
    pub category: Category,
    pub page: u32,
    pub search: Option<String>,
}

pub struct FakeBackend {
    pub claim_mode: Mutex<ClaimMode>,
    pub create_calls: AtomicUsize,
    pub idempotency_keys: Mutex<Vec<String>>,
    pub logout_fails: Mutex<bool>,
    pub user_unauthorized: Mutex<bool>,
    /// Pages served per category; page N is `pages[N - 1]`.
    pub resources: Mutex<HashMap<Category, Vec<Vec<Value>>>>,
    /// Pages served for a category and search term, ahead of `resources`.
    pub search_resources: Mutex<HashMap<(Category, String), Vec<Vec<Value>>>>,
    pub resource_calls: Mutex<Vec<ResourceCall>>,
    /// The next listing of a gated category blocks until the gate is notified.
    /// Each gate holds back one request only.
    pub gates: Mutex<HashMap<Category, Arc<Notify>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            claim_mode: Mutex::new(ClaimMode::Succeed),
            create_calls: AtomicUsize::new(0),
            idempotency_keys: Mutex::new(Vec::new()),
            logout_fails: Mutex::new(false),
            user_unauthorized: Mutex::new(false),
            resources: Mutex::new(HashMap::new()),
            search_resources: Mutex::new(HashMap::new()),
            resource_calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_claim_mode(self, mode: ClaimMode) -> Self {
        *self.claim_mode.lock().unwrap() = mode;
        self
    }

    /// Serve `pages` for `category`, each page holding records named `{prefix}-{page}-{i}`.
    pub fn with_resources(self, category: Category, prefix: &str, pages: &[usize]) -> Self {
        self.resources
            .lock()
            .unwrap()
            .insert(category, pages_of(prefix, pages));
        self
    }

    /// Like `with_resources`, but only for requests searching `term`.
    pub fn with_search_results(self, category: Category, term: &str, prefix: &str, pages: &[usize]) -> Self {
        self.search_resources
            .lock()
            .unwrap()
            .insert((category, term.to_string()), pages_of(prefix, pages));
        self
    }

    pub fn gate(&self, category: Category) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(category, gate.clone());
        gate
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn resource_calls(&self) -> Vec<ResourceCall> {
        self.resource_calls.lock().unwrap().clone()
    }
}

fn pages_of(prefix: &str, pages: &[usize]) -> Vec<Vec<Value>> {
    pages
        .iter()
        .enumerate()
        .map(|(p, count)| {
            (0..*count)
                .map(|i| json!({"id": format!("{}-{}-{}", prefix, p + 1, i), "name": format!("{} {}", prefix, i)}))
                .collect()
        })
        .collect()
}

pub fn user(email: &str) -> User {
    User {
        id: json!(1),
        name: "Ana".into(),
        email: email.into(),
        email_verified_at: None,
    }
}

pub fn validation(field: &str, message: &str) -> AppError {
    AppError::validation(field, message)
}

#[async_trait]
impl Backend for FakeBackend {
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, AppError> {
        if registration.email.starts_with("taken") {
            return Err(validation("email", "The email has already been taken."));
        }
        Ok(AuthResponse {
            token: "tok-registered".into(),
            user: user(&registration.email),
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, AppError> {
        if credentials.password != PASSWORD {
            return Err(validation("email", "These credentials do not match our records."));
        }
        Ok(AuthResponse {
            token: "tok-session".into(),
            user: user(&credentials.email),
        })
    }

    async fn logout(&self, _token: &str) -> Result<(), AppError> {
        if *self.logout_fails.lock().unwrap() {
            return Err(AppError::Network("connection reset".into()));
        }
        Ok(())
    }

    async fn current_user(&self, _token: &str) -> Result<User, AppError> {
        if *self.user_unauthorized.lock().unwrap() {
            return Err(AppError::Unauthorized("Unauthenticated.".into()));
        }
        Ok(user("ana@example.com"))
    }

    async fn update_profile(&self, _token: &str, update: &ProfileUpdate) -> Result<User, AppError> {
        let mut u = user(update.email.as_deref().unwrap_or("ana@example.com"));
        if let Some(name) = &update.name {
            u.name = name.clone();
        }
        Ok(u)
    }

    async fn send_verification_email(&self, _token: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn list_tokens(&self, _token: &str) -> Result<Vec<ApiToken>, AppError> {
        Ok(vec![serde_json::from_value(json!({"id": 7, "name": "default", "apis": ["places"]}))
            .map_err(|e| AppError::Network(e.to_string()))?])
    }

    async fn create_token(
        &self,
        _token: &str,
        config: &TokenConfig,
        idempotency_key: &str,
    ) -> Result<ApiToken, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.idempotency_keys
            .lock()
            .unwrap()
            .push(idempotency_key.to_string());
        match *self.claim_mode.lock().unwrap() {
            ClaimMode::Succeed => serde_json::from_value(json!({
                "id": 42,
                "plainTextToken": "pn_live_abc",
                "apis": config.apis,
            }))
            .map_err(|e| AppError::Network(e.to_string())),
            ClaimMode::AlreadyClaimed => Err(AppError::FreeOrderAlreadyClaimed),
            ClaimMode::ServerError => Err(AppError::Api {
                status: 500,
                message: "Server Error".into(),
            }),
        }
    }

    async fn list_orders(&self, _token: &str) -> Result<Vec<Order>, AppError> {
        Ok(vec![serde_json::from_value(json!({"id": 3, "status": "paid", "total": 0.0}))
            .map_err(|e| AppError::Network(e.to_string()))?])
    }

    async fn calculate_price(&self, config: &TokenConfig) -> Result<PriceQuote, AppError> {
        Ok(PriceQuote {
            total: config.apis.len() as f64 * 9.9,
            currency: "BRL".into(),
            free: false,
        })
    }

    async fn list_resources(
        &self,
        category: Category,
        page: u32,
        search: Option<&str>,
    ) -> Result<Paginated<Value>, AppError> {
        self.resource_calls.lock().unwrap().push(ResourceCall {
            category,
            page,
            search: search.map(String::from),
        });

        let gate = self.gates.lock().unwrap().remove(&category);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let searched = search.and_then(|term| {
            self.search_resources
                .lock()
                .unwrap()
                .get(&(category, term.to_string()))
                .cloned()
        });
        let pages = searched.unwrap_or_else(|| {
            self.resources
                .lock()
                .unwrap()
                .get(&category)
                .cloned()
                .unwrap_or_default()
        });
        let data = pages
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default();
        Ok(Paginated {
            meta: PageMeta {
                current_page: page,
                last_page: pages.len().max(1) as u32,
                per_page: data.len() as u32,
                total: pages.iter().map(Vec::len).sum::<usize>() as u64,
            },
            data,
        })
    }
}

pub fn session_with(backend: Arc<FakeBackend>) -> (Session, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = Session::new(backend, store.clone() as Arc<dyn KeyValueStore>);
    (session, store)
}
