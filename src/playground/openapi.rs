//! OpenAPI document loading for the documentation browser and the playground.
//!
//! The document is fetched (or read from disk), parsed as JSON or YAML, and
//! every local `$ref` is inlined before operations are extracted.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::AppError;

const METHODS: [&str; 7] = ["get", "post", "put", "patch", "delete", "head", "options"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseSpec {
    pub description: Option<String>,
    /// JSON body schema, if the response declares one.
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub path: String,
    /// Upper-case HTTP method.
    pub method: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    /// Declared responses in document order, keyed by status code.
    pub responses: Vec<(String, ResponseSpec)>,
}

impl Operation {
    pub fn parameter(&self, name: &str, location: ParamLocation) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name == name && p.location == location)
    }

    /// First declared response whose status code starts with `2`.
    pub fn success_response(&self) -> Option<(&str, &ResponseSpec)> {
        self.responses
            .iter()
            .find(|(code, _)| code.starts_with('2'))
            .map(|(code, spec)| (code.as_str(), spec))
    }
}

#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub servers: Vec<Server>,
    pub operations: Vec<Operation>,
}

impl OpenApiDocument {
    /// Fetch from an http(s) URL or read from a local path.
    pub async fn load(source: &str, http: &reqwest::Client) -> Result<Self, AppError> {
        let raw = if source.starts_with("http://") || source.starts_with("https://") {
            let resp = http
                .get(source)
                .send()
                .await
                .map_err(|e| AppError::SpecLoad(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(AppError::SpecLoad(format!(
                    "{} returned {}",
                    source,
                    resp.status()
                )));
            }
            resp.text()
                .await
                .map_err(|e| AppError::SpecLoad(e.to_string()))?
        } else {
            tokio::fs::read_to_string(source)
                .await
                .map_err(|e| AppError::SpecLoad(format!("cannot read {}: {}", source, e)))?
        };

        let doc = Self::parse(&raw)?;
        tracing::info!(
            title = %doc.title,
            operations = doc.operations.len(),
            "loaded API documentation"
        );
        Ok(doc)
    }

    /// Parse a JSON or YAML document.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
                AppError::SpecLoad(format!(
                    "document is neither JSON ({}) nor YAML ({})",
                    json_err, yaml_err
                ))
            })?,
        };
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, AppError> {
        if !value.is_object() {
            return Err(AppError::SpecLoad("document root must be an object".into()));
        }
        let root = dereference(&value);

        let info = root.get("info");
        let text = |v: Option<&Value>, key: &str| {
            v.and_then(|i| i.get(key))
                .and_then(Value::as_str)
                .map(String::from)
        };

        let servers = root
            .get("servers")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|s| {
                        Some(Server {
                            url: s.get("url")?.as_str()?.to_string(),
                            description: text(Some(s), "description"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let paths = root
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| AppError::SpecLoad("document has no paths".into()))?;

        let mut operations = Vec::new();
        for (path, item) in paths {
            let shared = parse_parameters(item.get("parameters"));
            for method in METHODS {
                let Some(op) = item.get(method) else {
                    continue;
                };
                operations.push(parse_operation(path, method, op, &shared));
            }
        }

        Ok(Self {
            title: text(info, "title").unwrap_or_else(|| "API".into()),
            version: text(info, "version").unwrap_or_default(),
            description: text(info, "description"),
            servers,
            operations,
        })
    }

    pub fn find(&self, method: &str, path: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.method.eq_ignore_ascii_case(method) && op.path == path)
    }

    /// Operations grouped by first tag; untagged ones land under `default`.
    pub fn by_tag(&self) -> BTreeMap<String, Vec<&Operation>> {
        let mut groups: BTreeMap<String, Vec<&Operation>> = BTreeMap::new();
        for op in &self.operations {
            let tag = op.tags.first().cloned().unwrap_or_else(|| "default".into());
            groups.entry(tag).or_default().push(op);
        }
        groups
    }
}

fn parse_operation(path: &str, method: &str, op: &Value, shared: &[Parameter]) -> Operation {
    let own = parse_parameters(op.get("parameters"));

    // Operation-level parameters override path-level ones with the same name and location.
    let mut parameters: Vec<Parameter> = shared
        .iter()
        .filter(|p| {
            !own.iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .cloned()
        .collect();
    parameters.extend(own);

    let responses = op
        .get("responses")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(code, resp)| (code.clone(), parse_response(resp)))
                .collect()
        })
        .unwrap_or_default();

    let str_field = |key: &str| op.get(key).and_then(Value::as_str).map(String::from);

    Operation {
        path: path.to_string(),
        method: method.to_ascii_uppercase(),
        operation_id: str_field("operationId"),
        summary: str_field("summary"),
        description: str_field("description"),
        tags: op
            .get("tags")
            .and_then(Value::as_array)
            .map(|t| t.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default(),
        parameters,
        responses,
    }
}

fn parse_parameters(value: Option<&Value>) -> Vec<Parameter> {
    let Some(list) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|p| {
            let name = p.get("name")?.as_str()?.to_string();
            let location = ParamLocation::parse(p.get("in")?.as_str()?)?;
            Some(Parameter {
                required: location == ParamLocation::Path
                    || p.get("required").and_then(Value::as_bool).unwrap_or(false),
                description: p
                    .get("description")
                    .and_then(Value::as_str)
                    .map(String::from),
                schema: p.get("schema").cloned(),
                name,
                location,
            })
        })
        .collect()
}

fn parse_response(resp: &Value) -> ResponseSpec {
    let content = resp.get("content").and_then(Value::as_object);
    let schema = content.and_then(|c| {
        c.get("application/json")
            .or_else(|| c.iter().find(|(k, _)| k.contains("json")).map(|(_, v)| v))
            .and_then(|media| media.get("schema"))
            .cloned()
    });

    ResponseSpec {
        description: resp
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        schema,
    }
}

/// Inline every local `$ref` (`#/...`). References that are remote, dangling
/// or cyclic are left in place.
pub fn dereference(root: &Value) -> Value {
    let mut stack = Vec::new();
    resolve(root, root, &mut stack)
}

fn resolve(node: &Value, root: &Value, stack: &mut Vec<String>) -> Value {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                let Some(pointer) = reference.strip_prefix('#') else {
                    return node.clone();
                };
                if stack.iter().any(|r| r == reference) {
                    return node.clone();
                }
                let Some(target) = root.pointer(pointer) else {
                    tracing::warn!(reference, "dangling $ref in API document");
                    return node.clone();
                };
                stack.push(reference.to_string());
                let resolved = resolve(target, root, stack);
                stack.pop();
                return resolved;
            }

            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve(v, root, stack));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, root, stack)).collect()),
        other => other.clone(),
    }
}
