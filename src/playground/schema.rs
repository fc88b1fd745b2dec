//! Typed view over JSON Schema fragments and the mock sample policy:
//!
//! - string: first enum value, else today's date for `date` / `date-time`, else `"string"`
//! - number / integer: `0`
//! - boolean: `true`
//! - object: one sample per declared property
//! - array: two samples of the item schema
//! - null / anything unrecognised: `null`

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// Nesting beyond this depth samples as `null`.
const MAX_DEPTH: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Object(Vec<(String, Schema)>),
    Array(Option<Box<Schema>>),
    String {
        choices: Vec<Value>,
        format: Option<String>,
    },
    Number,
    Integer,
    Boolean,
    Null,
    /// Unresolved reference, empty schema, or unknown type.
    Any,
}

impl Schema {
    pub fn from_value(value: &Value) -> Self {
        Self::parse(value, 0)
    }

    fn parse(value: &Value, depth: usize) -> Self {
        let Some(obj) = value.as_object() else {
            return Schema::Any;
        };
        if depth > MAX_DEPTH || obj.contains_key("$ref") {
            return Schema::Any;
        }

        if let Some(parts) = obj.get("allOf").and_then(Value::as_array) {
            return merge_all_of(parts, depth);
        }
        for key in ["oneOf", "anyOf"] {
            if let Some(first) = obj.get(key).and_then(Value::as_array).and_then(|v| v.first()) {
                return Self::parse(first, depth + 1);
            }
        }

        let choices: Vec<Value> = obj
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        match declared_type(obj).as_deref() {
            Some("object") => Schema::Object(parse_properties(obj, depth)),
            Some("array") => Schema::Array(
                obj.get("items")
                    .map(|items| Box::new(Self::parse(items, depth + 1))),
            ),
            Some("string") => Schema::String {
                choices,
                format: obj.get("format").and_then(Value::as_str).map(String::from),
            },
            Some("number") => Schema::Number,
            Some("integer") => Schema::Integer,
            Some("boolean") => Schema::Boolean,
            Some("null") => Schema::Null,
            Some(_) => Schema::Any,
            None if obj.contains_key("properties") => Schema::Object(parse_properties(obj, depth)),
            None if obj.contains_key("items") => Schema::Array(
                obj.get("items")
                    .map(|items| Box::new(Self::parse(items, depth + 1))),
            ),
            None if !choices.is_empty() => Schema::String {
                choices,
                format: None,
            },
            None => Schema::Any,
        }
    }

    pub fn sample(&self) -> Value {
        match self {
            Schema::Object(props) => {
                let mut out = Map::with_capacity(props.len());
                for (name, schema) in props {
                    out.insert(name.clone(), schema.sample());
                }
                Value::Object(out)
            }
            Schema::Array(Some(items)) => json!([items.sample(), items.sample()]),
            Schema::Array(None) => json!([]),
            Schema::String { choices, format } => {
                if let Some(first) = choices.first() {
                    return first.clone();
                }
                match format.as_deref() {
                    Some("date") => json!(Utc::now().format("%Y-%m-%d").to_string()),
                    Some("date-time") => {
                        json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
                    }
                    _ => json!("string"),
                }
            }
            Schema::Number | Schema::Integer => json!(0),
            Schema::Boolean => json!(true),
            Schema::Null | Schema::Any => Value::Null,
        }
    }
}

/// Mock body for a response schema. `None` yields the generic placeholder.
pub fn mock_body(schema: Option<&Value>) -> Value {
    match schema {
        Some(s) => Schema::from_value(s).sample(),
        None => json!({ "message": "Mock response", "success": true }),
    }
}

/// `type` may be a string or, in OpenAPI 3.1, a list such as `["string", "null"]`.
fn declared_type(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("type")? {
        Value::String(t) => Some(t.clone()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .or(Some("null"))
            .map(String::from),
        _ => None,
    }
}

fn parse_properties(obj: &Map<String, Value>, depth: usize) -> Vec<(String, Schema)> {
    obj.get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| (k.clone(), Schema::parse(v, depth + 1)))
                .collect()
        })
        .unwrap_or_default()
}

fn merge_all_of(parts: &[Value], depth: usize) -> Schema {
    let mut merged: Vec<(String, Schema)> = Vec::new();
    let mut last_non_object = None;

    for part in parts {
        match Schema::parse(part, depth + 1) {
            Schema::Object(props) => {
                for (name, schema) in props {
                    match merged.iter_mut().find(|(n, _)| *n == name) {
                        Some(slot) => slot.1 = schema,
                        None => merged.push((name, schema)),
                    }
                }
            }
            Schema::Any => {}
            other => last_non_object = Some(other),
        }
    }

    match (merged.is_empty(), last_non_object) {
        (true, Some(other)) => other,
        _ => Schema::Object(merged),
    }
}
