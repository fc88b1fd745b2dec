use std::collections::BTreeSet;

use crate::backend::Backend;
use crate::errors::AppError;
use crate::models::order::PriceQuote;
use crate::models::token::{LimitType, TokenConfig, MIN_VALIDITY_DAYS};

/// Editable calculator state. `build` freezes it into a `TokenConfig`.
#[derive(Debug, Clone)]
pub struct CalculatorState {
    pub validity: u32,
    pub limit_type: LimitType,
    pub rate_limit: u32,
    pub total_requests: u32,
    pub apis: BTreeSet<String>,
}

impl Default for CalculatorState {
    fn default() -> Self {
        Self {
            validity: MIN_VALIDITY_DAYS,
            limit_type: LimitType::RateLimit,
            rate_limit: 60,
            total_requests: 1000,
            apis: BTreeSet::new(),
        }
    }
}

impl CalculatorState {
    pub fn toggle_api(&mut self, slug: &str) {
        if !self.apis.remove(slug) {
            self.apis.insert(slug.to_string());
        }
    }

    pub fn build(&self) -> Result<TokenConfig, AppError> {
        let config = TokenConfig {
            validity: self.validity,
            limit_type: self.limit_type,
            rate_limit: self.rate_limit,
            total_requests: self.total_requests,
            apis: self.apis.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Price a configuration. Pricing itself is computed server-side.
pub async fn quote(backend: &dyn Backend, config: &TokenConfig) -> Result<PriceQuote, AppError> {
    config.validate()?;
    let quote = backend.calculate_price(config).await?;
    tracing::debug!(total = quote.total, currency = %quote.currency, free = quote.free, "price quote");
    Ok(quote)
}
