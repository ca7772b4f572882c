//! Tests for the error envelope returned over HTTP
//!
//! These tests verify that:
//! - Every error category maps to its status code and error code
//! - Error responses carry `success: false` and no data
//! - Storage failures are reported generically, never with backend detail

mod common;

use axum::http::StatusCode;
use cms_builder::core::error::UPSTREAM_PUBLIC_MESSAGE;
use cms_builder::core::service::{Table, Window};
use cms_builder::prelude::*;
use common::*;
use serde_json::{Map, Value, json};

const SECRET_DETAIL: &str = "password=hunter2 host=10.0.0.7";

/// A backend whose every call fails with connection detail that must not leak
struct BrokenStorage;

#[async_trait]
impl StorageBackend for BrokenStorage {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn find_one(&self, _: &Table, _: &Predicate) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Connection(SECRET_DETAIL.to_string()))
    }

    async fn find_many(
        &self,
        _: &Table,
        _: &Predicate,
        _: Option<Window>,
    ) -> Result<Vec<Value>, StorageError> {
        Err(StorageError::Connection(SECRET_DETAIL.to_string()))
    }

    async fn count(&self, _: &Table, _: &Predicate) -> Result<usize, StorageError> {
        Err(StorageError::Connection(SECRET_DETAIL.to_string()))
    }

    async fn insert(&self, _: &Table, _: Map<String, Value>) -> Result<Value, StorageError> {
        Err(StorageError::Connection(SECRET_DETAIL.to_string()))
    }

    async fn update(
        &self,
        _: &Table,
        _: &str,
        _: Map<String, Value>,
    ) -> Result<Value, StorageError> {
        Err(StorageError::Connection(SECRET_DETAIL.to_string()))
    }

    async fn delete(&self, _: &Table, _: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection(SECRET_DETAIL.to_string()))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Err(StorageError::Connection(SECRET_DETAIL.to_string()))
    }
}

fn assert_failure(body: &Value, code: &str) {
    assert_eq!(body["success"], false, "{body}");
    assert_eq!(body["code"], code, "{body}");
    assert!(body["data"].is_null());
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

// =============================================================================
// Client errors
// =============================================================================

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = app();
    let response = app.server.get("/nothing/here").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_failure(&body, "NOT_FOUND");
    assert_eq!(body["message"], "route not found");
}

#[tokio::test]
async fn test_wrong_method_returns_405() {
    let app = app();
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let response = app
        .server
        .put("/notes")
        .add_header("authorization", ann.header.as_str())
        .json(&json!({"title": "x"}))
        .await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_failure(&response.json(), "METHOD_NOT_ALLOWED");

    let allow = response
        .headers()
        .get("allow")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(allow.contains("GET"));
    assert!(allow.contains("POST"));
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let app = app();
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let response = app
        .server
        .post("/notes")
        .add_header("authorization", ann.header.as_str())
        .add_header("content-type", "application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_failure(&response.json(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_required_field_returns_400() {
    let app = app();
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let response = app
        .server
        .post("/notes")
        .add_header("authorization", ann.header.as_str())
        .json(&json!({"body": "no title"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let all = app.store.list::<Note>(Predicate::All, None).await.unwrap();
    assert_eq!(all.total, 0);
}

#[tokio::test]
async fn test_non_uuid_id_returns_400() {
    let app = app();
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let response = app
        .server
        .get("/notes/42")
        .add_header("authorization", ann.header.as_str())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_failure(&response.json(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_zero_page_returns_400() {
    let app = app();
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let response = app
        .server
        .get("/notes?page=0")
        .add_header("authorization", ann.header.as_str())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_beyond_addressable_range_returns_400() {
    let app = app();
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let response = app
        .server
        .get("/notes?page=18446744073709551615&limit=10")
        .add_header("authorization", ann.header.as_str())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_failure(&body, "VALIDATION_ERROR");
    assert_eq!(body["message"], "page is out of range");

    let response = app
        .server
        .get("/articles?page=9223372036854775807&limit=100")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_failure(&response.json(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_record_returns_404() {
    let app = app();
    let ann = app.sign_up("Ann", "ann@x.com").await;

    let response = app
        .server
        .get(&format!("/notes/{}", Uuid::new_v4()))
        .add_header("authorization", ann.header.as_str())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_failure(&body, "NOT_FOUND");
    assert_eq!(body["message"], "note not found");
}

#[tokio::test]
async fn test_anonymous_returns_401() {
    let app = app();
    let response = app.server.get("/notes").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_failure(&body, "UNAUTHENTICATED");
    assert_eq!(body["message"], "authentication required");
}

#[tokio::test]
async fn test_admin_only_writes_return_403_for_users() {
    let app = app_with(test_config(), |builder| {
        builder
            .register_resource::<Announcement>(ResourceOptions::default().admin_writes())
            .unwrap()
    });
    let ann = app.sign_up("Ann", "ann@x.com").await;
    let admin = app.sign_up("Root", ADMIN_EMAIL).await;

    let response = app
        .server
        .post("/announcements")
        .add_header("authorization", ann.header.as_str())
        .json(&json!({"text": "hello"}))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_failure(&response.json(), "UNAUTHORIZED");

    app.server
        .post("/announcements")
        .add_header("authorization", admin.header.as_str())
        .json(&json!({"text": "hello"}))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_oversized_body_returns_400() {
    let mut config = test_config();
    config.server.body_limit = 64;
    let app = app_with(config, |builder| builder);
    let ann = app.sign_up("Ann", "a@x.com").await;

    let response = app
        .server
        .post("/notes")
        .add_header("authorization", ann.header.as_str())
        .json(&json!({"title": "x".repeat(1024)}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_failure(&response.json(), "VALIDATION_ERROR");
}

// =============================================================================
// Upstream failures
// =============================================================================

fn broken_app() -> axum_test::TestServer {
    let mut server = ServerBuilder::new()
        .with_storage(BrokenStorage)
        .register_resource::<Note>(ResourceOptions::default().public())
        .unwrap()
        .build()
        .unwrap();
    axum_test::TestServer::new(server.router().unwrap())
}

#[tokio::test]
async fn test_storage_failure_returns_502_without_detail() {
    let server = broken_app();

    let response = server.get("/notes").await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let text = response.text();
    assert!(!text.contains("hunter2"));
    assert!(!text.contains("10.0.0.7"));

    let body: Value = response.json();
    assert_failure(&body, "UPSTREAM_ERROR");
    assert_eq!(body["message"], UPSTREAM_PUBLIC_MESSAGE);
}

#[tokio::test]
async fn test_health_reports_storage_failure() {
    let server = broken_app();

    let response = server.get("/health").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    assert!(!response.text().contains("hunter2"));
    assert_eq!(response.json::<Value>()["message"], UPSTREAM_PUBLIC_MESSAGE);
}

/// Only administrators may publish announcements
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Announcement {
    id: Uuid,
    owner_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Record for Announcement {
    fn resource_name() -> &'static str {
        "announcement"
    }

    fn writable_fields() -> &'static [&'static str] {
        &["text"]
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}
