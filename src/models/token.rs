use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Shortest token validity the backend sells.
pub const MIN_VALIDITY_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitType {
    RateLimit,
    TotalRequests,
}

impl std::str::FromStr for LimitType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ratelimit" => Ok(LimitType::RateLimit),
            "totalrequests" => Ok(LimitType::TotalRequests),
            other => Err(AppError::InvalidInput(format!(
                "unknown limit type '{}', expected rate-limit or total-requests",
                other
            ))),
        }
    }
}

/// What the user is buying. Built by the pricing calculator and handed to the
/// checkout flow, which never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    /// Validity in days.
    pub validity: u32,
    pub limit_type: LimitType,
    /// Requests per minute, used when `limit_type` is `RateLimit`.
    pub rate_limit: u32,
    /// Request quota over the token lifetime, used when `limit_type` is `TotalRequests`.
    pub total_requests: u32,
    /// API slugs the token grants access to.
    pub apis: BTreeSet<String>,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.validity < MIN_VALIDITY_DAYS {
            return Err(AppError::validation(
                "validity",
                format!("validity must be at least {} days", MIN_VALIDITY_DAYS),
            ));
        }
        if self.apis.is_empty() {
            return Err(AppError::validation("apis", "select at least one API"));
        }
        match self.limit_type {
            LimitType::RateLimit if self.rate_limit == 0 => Err(AppError::validation(
                "rate_limit",
                "rate limit must be greater than zero",
            )),
            LimitType::TotalRequests if self.total_requests == 0 => Err(AppError::validation(
                "total_requests",
                "total requests must be greater than zero",
            )),
            _ => Ok(()),
        }
    }
}

/// A token as returned by the backend. `token` carries the plaintext secret and
/// is only present in the creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "plain_text_token", alias = "plainTextToken")]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub limit_type: Option<LimitType>,
    #[serde(default)]
    pub rate_limit: Option<u32>,
    #[serde(default)]
    pub total_requests: Option<u32>,
    #[serde(default)]
    pub apis: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
