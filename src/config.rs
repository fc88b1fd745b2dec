use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the PicNode REST backend, without trailing slash.
    pub api_url: String,
    /// Location of the OpenAPI document (URL or file path).
    pub openapi_url: String,
    /// JSON file standing in for browser local storage.
    pub storage_path: PathBuf,
    /// Default UI language until one is stored under `language`.
    pub locale: String,
    pub mock_delay: Duration,
    pub card_delay: Duration,
    pub pix_countdown_secs: u32,
    pub search_debounce: Duration,
    /// Unset by default: backend and playground calls have no timeout.
    pub http_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".into(),
            openapi_url: "http://localhost:8000/openapi.json".into(),
            storage_path: PathBuf::from(".picnode/storage.json"),
            locale: "en".into(),
            mock_delay: Duration::from_millis(600),
            card_delay: Duration::from_millis(2000),
            pix_countdown_secs: 10,
            search_debounce: Duration::from_millis(500),
            http_timeout: None,
        }
    }
}

impl Config {
    /// Config with every artificial delay set to zero.
    pub fn without_delays(mut self) -> Self {
        self.mock_delay = Duration::ZERO;
        self.card_delay = Duration::ZERO;
        self.pix_countdown_secs = 0;
        self.search_debounce = Duration::ZERO;
        self
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let defaults = Config::default();

    let api_url = std::env::var("PICNODE_API_URL")
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .unwrap_or(defaults.api_url);
    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        anyhow::bail!("PICNODE_API_URL must use http:// or https://, got '{}'", api_url);
    }

    Ok(Config {
        api_url,
        openapi_url: std::env::var("PICNODE_OPENAPI_URL").unwrap_or(defaults.openapi_url),
        storage_path: std::env::var("PICNODE_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_path),
        locale: std::env::var("PICNODE_LOCALE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.locale),
        mock_delay: env_millis("PICNODE_MOCK_DELAY_MS").unwrap_or(defaults.mock_delay),
        card_delay: env_millis("PICNODE_CARD_DELAY_MS").unwrap_or(defaults.card_delay),
        pix_countdown_secs: std::env::var("PICNODE_PIX_COUNTDOWN_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.pix_countdown_secs),
        search_debounce: env_millis("PICNODE_SEARCH_DEBOUNCE_MS")
            .unwrap_or(defaults.search_debounce),
        http_timeout: std::env::var("PICNODE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs),
    })
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

/// Shared reqwest client builder honoring the optional timeout.
pub fn http_client(cfg: &Config) -> Result<reqwest::Client, crate::errors::AppError> {
    let mut builder = reqwest::Client::builder().use_rustls_tls();
    if let Some(timeout) = cfg.http_timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| crate::errors::AppError::Internal(anyhow::anyhow!("failed to build HTTP client: {}", e)))
}
