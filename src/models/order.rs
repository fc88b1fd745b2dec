use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: serde_json::Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Result of the backend price calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    #[serde(alias = "price")]
    pub total: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// The configuration qualifies for the one-per-user free order.
    #[serde(default, alias = "is_free")]
    pub free: bool,
}

fn default_currency() -> String {
    "BRL".to_string()
}
