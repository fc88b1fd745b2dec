//! API playground: executes an OpenAPI operation either against a live server
//! or by synthesising a response from the declared schema. Both paths produce
//! the same `ApiResponse`.

pub mod openapi;
pub mod request;
pub mod schema;
pub mod settings;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use openapi::{OpenApiDocument, Operation};
use request::{ParamValues, PreparedRequest, RequestContext};
use settings::PlaygroundSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Mock,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub data: Value,
    pub elapsed_ms: u64,
}

/// Status for a mock response: the numeric prefix of the first 2xx key, else 200.
/// Wildcard keys such as `2XX` have no usable code and also give 200.
pub fn mock_status(op: &Operation) -> u16 {
    op.success_response()
        .and_then(|(code, _)| {
            let digits: String = code.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u16>().ok().filter(|c| (200..300).contains(c))
        })
        .unwrap_or(200)
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}

pub struct Playground {
    http: reqwest::Client,
    settings: PlaygroundSettings,
    locale: String,
    mock_delay: Duration,
    last: Option<ApiResponse>,
}

impl Playground {
    pub fn new(
        http: reqwest::Client,
        settings: PlaygroundSettings,
        locale: impl Into<String>,
        mock_delay: Duration,
    ) -> Self {
        Self {
            http,
            settings,
            locale: locale.into(),
            mock_delay,
            last: None,
        }
    }

    pub fn settings(&self) -> &PlaygroundSettings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        if self.settings.live_mode() {
            Mode::Live
        } else {
            Mode::Mock
        }
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    /// Most recent response. Each execution replaces it; a failed one clears it.
    pub fn last_response(&self) -> Option<&ApiResponse> {
        self.last.as_ref()
    }

    /// Selected server URL, else the first server the document declares.
    pub fn resolve_server(&self, doc: &OpenApiDocument) -> String {
        let selected = self.settings.server_url();
        if !selected.trim().is_empty() {
            return selected;
        }
        doc.servers
            .first()
            .map(|s| s.url.trim_end_matches('/').to_string())
            .unwrap_or_default()
    }

    pub fn prepare(
        &self,
        doc: &OpenApiDocument,
        op: &Operation,
        values: &ParamValues,
        token_override: Option<&str>,
    ) -> PreparedRequest {
        let global = self.settings.token();
        let ctx = RequestContext {
            server_url: self.resolve_server(doc),
            locale: self.locale.clone(),
            token_override: token_override.map(String::from),
            global_token: Some(global).filter(|t| !t.is_empty()),
        };
        request::prepare(op, values, &ctx)
    }

    pub async fn execute(
        &mut self,
        doc: &OpenApiDocument,
        op: &Operation,
        values: &ParamValues,
        token_override: Option<&str>,
    ) -> Result<&ApiResponse, AppError> {
        self.last = None;
        let prepared = self.prepare(doc, op, values, token_override);

        let response = match self.mode() {
            Mode::Mock => self.simulate(op).await,
            Mode::Live => send_live(&self.http, &prepared).await?,
        };

        tracing::info!(
            method = %prepared.method,
            path = %prepared.path,
            mode = ?self.mode(),
            status = response.status,
            elapsed_ms = response.elapsed_ms,
            "playground request finished"
        );
        Ok(self.last.insert(response))
    }

    /// Mock mode: sample the first 2xx schema after the fixed delay.
    pub async fn simulate(&self, op: &Operation) -> ApiResponse {
        let started = Instant::now();
        tokio::time::sleep(self.mock_delay).await;

        let schema = op.success_response().and_then(|(_, r)| r.schema.as_ref());
        let status = mock_status(op);

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("x-mock-response".to_string(), "true".to_string());

        ApiResponse {
            status,
            status_text: status_text(status),
            headers,
            data: schema::mock_body(schema),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Live mode: send the prepared request and capture the exchange.
pub async fn send_live(
    http: &reqwest::Client,
    prepared: &PreparedRequest,
) -> Result<ApiResponse, AppError> {
    if prepared.server_url.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "no server URL selected and the document declares none".into(),
        ));
    }

    let method = Method::from_bytes(prepared.method.as_bytes())
        .map_err(|_| AppError::InvalidInput(format!("invalid HTTP method '{}'", prepared.method)))?;

    let mut req = http.request(method, prepared.url());
    for (name, value) in &prepared.headers {
        req = req.header(name.as_str(), value.as_str());
    }

    let started = Instant::now();
    let resp = req.send().await.map_err(|e| {
        tracing::warn!(error = %e, "live playground request failed");
        AppError::Network(e.to_string())
    })?;

    let status = resp.status();
    // Repeated headers are joined the way HTTP folds them.
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in resp.headers() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert(value);
    }
    let text = resp
        .text()
        .await
        .map_err(|e| AppError::Network(e.to_string()))?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let data = serde_json::from_str(&text).unwrap_or_else(|_| {
        json!({
            "message": "Response body is not valid JSON",
            "raw": text,
        })
    });

    Ok(ApiResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
        headers,
        data,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use openapi::ResponseSpec;

    fn op_with(codes: &[&str]) -> Operation {
        Operation {
            path: "/x".into(),
            method: "GET".into(),
            operation_id: None,
            summary: None,
            description: None,
            tags: vec![],
            parameters: vec![],
            responses: codes
                .iter()
                .map(|c| {
                    (
                        c.to_string(),
                        ResponseSpec {
                            description: None,
                            schema: None,
                        },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_mock_status_first_2xx() {
        assert_eq!(mock_status(&op_with(&["400", "201", "200"])), 201);
        assert_eq!(mock_status(&op_with(&["204"])), 204);
    }

    #[test]
    fn test_mock_status_defaults_to_200() {
        assert_eq!(mock_status(&op_with(&[])), 200);
        assert_eq!(mock_status(&op_with(&["404", "default"])), 200);
        assert_eq!(mock_status(&op_with(&["2XX"])), 200);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(201), "Created");
        assert_eq!(status_text(299), "");
    }
}
