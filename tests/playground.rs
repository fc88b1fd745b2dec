//! Playground execution in mock and live mode over a small OpenAPI document.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use picnode::playground::openapi::OpenApiDocument;
use picnode::playground::settings::PlaygroundSettings;
use picnode::playground::{Mode, Playground};
use picnode::store::{FileStore, MemoryStore};

fn document(server_url: &str) -> OpenApiDocument {
    OpenApiDocument::from_value(json!({
        "openapi": "3.0.3",
        "info": {"title": "PicNode API", "version": "1.0.0"},
        "servers": [{"url": server_url}],
        "paths": {
            "/places/{id}": {
                "parameters": [
                    {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                ],
                "get": {
                    "tags": ["Places"],
                    "summary": "Show a place",
                    "parameters": [
                        {"name": "lang", "in": "query", "schema": {"type": "string", "enum": ["en", "pt"]}}
                    ],
                    "responses": {
                        "404": {"description": "Not found"},
                        "200": {
                            "description": "A place",
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Place"}}}
                        }
                    }
                }
            },
            "/places": {
                "post": {
                    "tags": ["Places"],
                    "responses": {"201": {"description": "Created"}}
                }
            }
        },
        "components": {
            "schemas": {
                "Place": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "integer"},
                        "name": {"type": "string"},
                        "tags": {"type": "array", "items": {"type": "string"}}
                    }
                }
            }
        }
    }))
    .unwrap()
}

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn playground(settings: PlaygroundSettings, locale: &str) -> Playground {
    Playground::new(reqwest::Client::new(), settings, locale, Duration::ZERO)
}

#[tokio::test]
async fn test_mock_mode_samples_first_success_schema() {
    let doc = document("https://api.picnode.dev");
    let op = doc.find("GET", "/places/{id}").unwrap().clone();
    let settings = PlaygroundSettings::load(Arc::new(MemoryStore::new()));
    let mut pg = playground(settings, "en");
    assert_eq!(pg.mode(), Mode::Mock);

    let resp = pg.execute(&doc, &op, &values(&[("id", "42")]), None).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.status_text, "OK");
    assert_eq!(resp.headers["x-mock-response"], "true");
    assert_eq!(resp.data, json!({"id": 0, "name": "string", "tags": ["string", "string"]}));
    assert!(pg.last_response().is_some());
}

#[tokio::test]
async fn test_mock_mode_without_schema_uses_placeholder() {
    let doc = document("https://api.picnode.dev");
    let op = doc.find("POST", "/places").unwrap().clone();
    let mut pg = playground(PlaygroundSettings::load(Arc::new(MemoryStore::new())), "en");

    let resp = pg.execute(&doc, &op, &BTreeMap::new(), None).await.unwrap();
    assert_eq!(resp.status, 201);
    assert_eq!(resp.data["message"], "Mock response");
}

#[tokio::test]
async fn test_live_mode_sends_substituted_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/places/42"))
        .and(query_param("lang", "pt"))
        .and(header("Authorization", "Bearer global-tok"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "abc")
                .set_body_json(json!({"id": 42, "name": "Cristo Redentor"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let doc = document(&server.uri());
    let op = doc.find("GET", "/places/{id}").unwrap().clone();
    let settings = PlaygroundSettings::load(Arc::new(MemoryStore::new()));
    settings.set_token("global-tok").unwrap();
    settings.set_live_mode(true).unwrap();
    let mut pg = playground(settings, "pt");

    let resp = pg.execute(&doc, &op, &values(&[("id", "42")]), None).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.data["name"], "Cristo Redentor");
    assert_eq!(resp.headers["x-request-id"], "abc");
}

#[tokio::test]
async fn test_repeated_response_headers_are_joined() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/places/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2")
                .set_body_json(json!({"id": 3})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let doc = document(&server.uri());
    let op = doc.find("GET", "/places/{id}").unwrap().clone();
    let settings = PlaygroundSettings::load(Arc::new(MemoryStore::new()));
    settings.set_live_mode(true).unwrap();
    let mut pg = playground(settings, "en");

    let resp = pg.execute(&doc, &op, &values(&[("id", "3")]), None).await.unwrap();
    assert_eq!(resp.headers["set-cookie"], "a=1, b=2");
}

#[tokio::test]
async fn test_per_request_token_overrides_global() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/places/1"))
        .and(header("Authorization", "Bearer override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let doc = document(&server.uri());
    let op = doc.find("GET", "/places/{id}").unwrap().clone();
    let settings = PlaygroundSettings::load(Arc::new(MemoryStore::new()));
    settings.set_token("global-tok").unwrap();
    settings.set_live_mode(true).unwrap();
    let mut pg = playground(settings, "en");

    pg.execute(&doc, &op, &values(&[("id", "1")]), Some("override"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_live_non_json_body_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/places/7"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<h1>boom</h1>"))
        .mount(&server)
        .await;

    let doc = document(&server.uri());
    let op = doc.find("GET", "/places/{id}").unwrap().clone();
    let settings = PlaygroundSettings::load(Arc::new(MemoryStore::new()));
    settings.set_live_mode(true).unwrap();
    let mut pg = playground(settings, "en");

    let resp = pg.execute(&doc, &op, &values(&[("id", "7")]), None).await.unwrap();
    assert_eq!(resp.status, 500);
    assert_eq!(resp.status_text, "Internal Server Error");
    assert_eq!(resp.data["raw"], "<h1>boom</h1>");
}

#[tokio::test]
async fn test_failed_live_request_clears_last_response() {
    let doc = document("https://api.picnode.dev");
    let op = doc.find("GET", "/places/{id}").unwrap().clone();
    let settings = PlaygroundSettings::load(Arc::new(MemoryStore::new()));
    let mut pg = playground(settings.clone(), "en");

    pg.execute(&doc, &op, &values(&[("id", "1")]), None).await.unwrap();
    assert!(pg.last_response().is_some());

    let server = MockServer::start().await;
    let dead = server.uri();
    drop(server);
    settings.set_server_url(&dead).unwrap();
    settings.set_live_mode(true).unwrap();

    assert!(pg.execute(&doc, &op, &values(&[("id", "1")]), None).await.is_err());
    assert!(pg.last_response().is_none());
}

#[tokio::test]
async fn test_settings_shared_across_instances_and_restarts() {
    let path = std::env::temp_dir()
        .join(format!("picnode-playground-{}", uuid::Uuid::new_v4().simple()))
        .join("storage.json");

    let store = Arc::new(FileStore::open(&path).unwrap());
    let first = PlaygroundSettings::load(store.clone());
    let a = playground(first.clone(), "en");
    let b = playground(first.clone(), "en");

    first.set_live_mode(true).unwrap();
    assert_eq!(a.mode(), Mode::Live);
    assert_eq!(b.mode(), Mode::Live);

    let restarted = PlaygroundSettings::load(Arc::new(FileStore::open(&path).unwrap()));
    assert!(restarted.live_mode());
}
