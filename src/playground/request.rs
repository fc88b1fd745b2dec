use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::openapi::{Operation, ParamLocation};

static PATH_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("valid regex"));

/// Query parameter that receives the UI locale.
const LOCALE_PARAM: &str = "lang";

/// Values typed into the playground form, keyed by parameter name.
/// Blank values count as absent.
pub type ParamValues = BTreeMap<String, String>;

/// Ambient inputs the form does not own.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub server_url: String,
    pub locale: String,
    /// Token typed into this playground instance.
    pub token_override: Option<String>,
    /// Token shared by every playground on the page.
    pub global_token: Option<String>,
}

impl RequestContext {
    /// Per-request override first, then the shared token.
    pub fn bearer_token(&self) -> Option<&str> {
        [&self.token_override, &self.global_token]
            .into_iter()
            .flatten()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRequest {
    pub method: String,
    /// Path with parameters substituted.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub server_url: String,
}

impl PreparedRequest {
    /// Server URL + path + encoded query string.
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.server_url.trim_end_matches('/'), self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(&self.query));
        }
        url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn present<'a>(values: &'a ParamValues, name: &str) -> Option<&'a str> {
    values
        .get(name)
        .map(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
}

/// Replace `{name}` placeholders. Missing values keep the placeholder.
pub fn substitute_path(template: &str, values: &ParamValues) -> String {
    PATH_PARAM
        .replace_all(template, |caps: &regex::Captures| match present(values, &caps[1]) {
            Some(v) => urlencoding::encode(v).into_owned(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

pub fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Turn an operation plus form values into a concrete request.
pub fn prepare(op: &Operation, values: &ParamValues, ctx: &RequestContext) -> PreparedRequest {
    let mut query = Vec::new();
    let mut headers = vec![("Accept".to_string(), "application/json".to_string())];

    for param in &op.parameters {
        match param.location {
            ParamLocation::Query => {
                let value = match present(values, &param.name) {
                    Some(v) => Some(v.to_string()),
                    None if param.name == LOCALE_PARAM && !ctx.locale.is_empty() => {
                        Some(ctx.locale.clone())
                    }
                    None => None,
                };
                if let Some(v) = value {
                    query.push((param.name.clone(), v));
                }
            }
            ParamLocation::Header => {
                if let Some(v) = present(values, &param.name) {
                    headers.push((param.name.clone(), v.to_string()));
                }
            }
            ParamLocation::Path | ParamLocation::Cookie => {}
        }
    }

    if let Some(token) = ctx.bearer_token() {
        headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }

    PreparedRequest {
        method: op.method.clone(),
        path: substitute_path(&op.path, values),
        query,
        headers,
        server_url: ctx.server_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playground::openapi::Parameter;

    fn values(pairs: &[(&str, &str)]) -> ParamValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn param(name: &str, location: ParamLocation) -> Parameter {
        Parameter {
            name: name.into(),
            location,
            required: false,
            description: None,
            schema: None,
        }
    }

    fn op() -> Operation {
        Operation {
            path: "/places/{id}".into(),
            method: "GET".into(),
            operation_id: None,
            summary: None,
            description: None,
            tags: vec![],
            parameters: vec![
                param("id", ParamLocation::Path),
                param("search", ParamLocation::Query),
                param("lang", ParamLocation::Query),
                param("X-Trace", ParamLocation::Header),
            ],
            responses: vec![],
        }
    }

    #[test]
    fn test_path_param_substituted() {
        let path = substitute_path("/places/{id}", &values(&[("id", "42")]));
        assert_eq!(path, "/places/42");
        assert!(!path.contains("{id}"));
    }

    #[test]
    fn test_missing_path_param_keeps_placeholder() {
        let path = substitute_path("/clubs/{club}/players/{id}", &values(&[("id", "7")]));
        assert_eq!(path, "/clubs/{club}/players/7");
        let blank = substitute_path("/places/{id}", &values(&[("id", "  ")]));
        assert_eq!(blank, "/places/{id}");
    }

    #[test]
    fn test_path_values_are_encoded() {
        let path = substitute_path("/search/{q}", &values(&[("q", "são paulo")]));
        assert_eq!(path, "/search/s%C3%A3o%20paulo");
    }

    #[test]
    fn test_prepare_builds_full_request() {
        let ctx = RequestContext {
            server_url: "https://api.picnode.dev/".into(),
            locale: "pt".into(),
            token_override: None,
            global_token: Some("global-123".into()),
        };
        let req = prepare(&op(), &values(&[("id", "42"), ("search", "rio & co")]), &ctx);

        assert_eq!(req.path, "/places/42");
        assert_eq!(
            req.query,
            vec![
                ("search".to_string(), "rio & co".to_string()),
                ("lang".to_string(), "pt".to_string())
            ]
        );
        assert_eq!(
            req.url(),
            "https://api.picnode.dev/places/42?search=rio%20%26%20co&lang=pt"
        );
        assert_eq!(req.header("authorization"), Some("Bearer global-123"));
        assert!(req.header("X-Trace").is_none());
    }

    #[test]
    fn test_explicit_lang_wins_over_locale() {
        let ctx = RequestContext {
            locale: "pt".into(),
            ..Default::default()
        };
        let req = prepare(&op(), &values(&[("lang", "en")]), &ctx);
        assert_eq!(req.query, vec![("lang".to_string(), "en".to_string())]);
    }

    #[test]
    fn test_header_applied_only_with_value() {
        let req = prepare(
            &op(),
            &values(&[("X-Trace", "abc")]),
            &RequestContext::default(),
        );
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert!(req.header("Authorization").is_none());
    }

    #[test]
    fn test_token_override_beats_global() {
        let ctx = RequestContext {
            token_override: Some("mine".into()),
            global_token: Some("shared".into()),
            ..Default::default()
        };
        assert_eq!(ctx.bearer_token(), Some("mine"));

        let blank_override = RequestContext {
            token_override: Some("   ".into()),
            global_token: Some("shared".into()),
            ..Default::default()
        };
        assert_eq!(blank_override.bearer_token(), Some("shared"));
    }
}
