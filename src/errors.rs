use std::collections::BTreeMap;

use serde_json::json;
use thiserror::Error;

/// Message the backend returns when a user tries to claim a second free order.
pub const FREE_ORDER_CLAIMED_MESSAGE: &str = "already claimed a free order";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("you have already claimed a free order")]
    FreeOrderAlreadyClaimed,

    #[error("unauthenticated: {0}")]
    Unauthorized(String),

    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(String),

    #[error("failed to load API documentation: {0}")]
    SpecLoad(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot {event} while at the {from} step")]
    InvalidTransition { from: String, event: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// How an error is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shown inline, next to the offending field.
    Validation,
    /// Matched by message and routed to a dedicated state.
    Business,
    /// Non-blocking banner.
    Network,
    /// Full-panel alert in the documentation viewer.
    SpecLoad,
    Input,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::FreeOrderAlreadyClaimed => ErrorKind::Business,
            AppError::Unauthorized(_) | AppError::Api { .. } | AppError::Network(_) => {
                ErrorKind::Network
            }
            AppError::SpecLoad(_) => ErrorKind::SpecLoad,
            AppError::InvalidInput(_) | AppError::InvalidTransition { .. } => ErrorKind::Input,
            AppError::Storage(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Per-field messages for validation errors, empty for everything else.
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        match self {
            AppError::Validation { errors, .. } => errors.clone(),
            _ => BTreeMap::new(),
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), vec![message.clone()]);
        AppError::Validation { message, errors }
    }

    /// Machine-readable error body, shaped like the backend's own error envelope.
    pub fn envelope(&self) -> serde_json::Value {
        let (error_type, code) = match self {
            AppError::Validation { .. } => ("invalid_request_error", "validation_failed"),
            AppError::FreeOrderAlreadyClaimed => ("business_error", "free_order_claimed"),
            AppError::Unauthorized(_) => ("authentication_error", "unauthenticated"),
            AppError::Api { .. } => ("api_error", "backend_error"),
            AppError::Network(_) => ("network_error", "request_failed"),
            AppError::SpecLoad(_) => ("spec_error", "spec_load_failed"),
            AppError::InvalidInput(_) => ("invalid_request_error", "invalid_input"),
            AppError::InvalidTransition { .. } => ("invalid_request_error", "invalid_transition"),
            AppError::Storage(_) => ("internal_error", "storage_failed"),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                ("internal_error", "internal_error")
            }
        };

        let mut body = json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
                "code": code,
            }
        });

        if let AppError::Validation { errors, .. } = self {
            body["error"]["fields"] = json!(errors);
        }

        body
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}
