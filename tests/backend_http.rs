//! BackendClient against a wiremock server: endpoint shapes and error mapping.

use std::collections::BTreeSet;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use picnode::backend::{Backend, BackendClient};
use picnode::errors::{AppError, ErrorKind};
use picnode::models::asset::Category;
use picnode::models::token::{LimitType, TokenConfig};
use picnode::models::user::Credentials;

fn client(server: &MockServer) -> BackendClient {
    BackendClient::with_base_url(format!("{}/api", server.uri())).unwrap()
}

fn token_config() -> TokenConfig {
    TokenConfig {
        validity: 30,
        limit_type: LimitType::TotalRequests,
        rate_limit: 60,
        total_requests: 5000,
        apis: BTreeSet::from(["companies".to_string(), "places".to_string()]),
    }
}

#[tokio::test]
async fn test_login_returns_token_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"email": "ana@example.com", "password": "secret123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "user": {"id": 1, "name": "Ana", "email": "ana@example.com", "email_verified_at": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = assert_ok!(
        client(&server)
            .login(&Credentials {
                email: "ana@example.com".into(),
                password: "secret123".into(),
            })
            .await
    );
    assert_eq!(resp.token, "tok-1");
    assert!(!resp.user.is_verified());
}

#[tokio::test]
async fn test_validation_errors_keep_field_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "These credentials do not match our records.",
            "errors": {"email": ["These credentials do not match our records."]}
        })))
        .mount(&server)
        .await;

    let err = assert_err!(
        client(&server)
            .login(&Credentials {
                email: "ana@example.com".into(),
                password: "wrong".into(),
            })
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.field_errors()["email"].len(), 1);
    assert_eq!(err.envelope()["error"]["code"], "validation_failed");
}

#[tokio::test]
async fn test_create_token_sends_idempotency_key_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .and(header("Idempotency-Key", "key-123"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": 9, "plain_text_token": "pn_live_xyz", "apis": ["companies", "places"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client(&server)
        .create_token("tok-1", &token_config(), "key-123")
        .await
        .unwrap();
    assert_eq!(token.token.as_deref(), Some("pn_live_xyz"));
    assert_eq!(token.apis, vec!["companies", "places"]);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["limitType"], "totalRequests");
    assert_eq!(body["totalRequests"], 5000);
}

#[tokio::test]
async fn test_second_free_order_is_a_business_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"message": "You have already claimed a free order."})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .create_token("tok-1", &token_config(), "key-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FreeOrderAlreadyClaimed));
    assert_eq!(err.kind(), ErrorKind::Business);
}

#[tokio::test]
async fn test_expired_session_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
        .mount(&server)
        .await;

    let err = client(&server).current_user("old").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_list_resources_sends_page_and_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/football-clubs"))
        .and(query_param("page", "2"))
        .and(query_param("search", "flamengo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "name": "Flamengo", "logo_url": "https://cdn/fla.png"}],
            "meta": {"current_page": 2, "last_page": 2, "per_page": 20, "total": 21}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_resources(Category::FootballClubs, 2, Some(" flamengo "))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert!(!page.meta.has_more());
}

#[tokio::test]
async fn test_price_quote_accepts_backend_aliases() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/calculate-price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"price": 0, "is_free": true})))
        .mount(&server)
        .await;

    let quote = client(&server).calculate_price(&token_config()).await.unwrap();
    assert_eq!(quote.total, 0.0);
    assert!(quote.free);
    assert_eq!(quote.currency, "BRL");
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let err = BackendClient::with_base_url(uri)
        .unwrap()
        .list_orders("tok")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}
