//! Shared fixtures for the HTTP-level tests
//!
//! Every test builds its own application over a fresh in-memory store and
//! in-memory identity provider, then drives it through `axum_test`.

#![allow(dead_code)]

use axum_test::TestServer;
use cms_builder::prelude::*;
use serde_json::{Value, json};

pub const ADMIN_EMAIL: &str = "admin@x.com";

/// A private record type: every user sees only their own notes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Note {
    fn resource_name() -> &'static str {
        "note"
    }

    fn writable_fields() -> &'static [&'static str] {
        &["title", "body"]
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// A publicly readable record type with a custom owner field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub author_id: Uuid,
    pub headline: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Article {
    fn resource_name() -> &'static str {
        "article"
    }

    fn owner_field() -> &'static str {
        "author_id"
    }

    fn writable_fields() -> &'static [&'static str] {
        &["headline"]
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub provider: Arc<InMemoryIdentityProvider>,
    pub store: EntityStore,
}

/// A registered user and a session token for them
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub header: String,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.admin_emails = vec![ADMIN_EMAIL.to_string()];
    config
}

/// Notes (private) and articles (public reads) over a fresh store
pub fn app() -> TestApp {
    app_with(test_config(), |builder| builder)
}

pub fn app_with(config: AppConfig, customize: impl FnOnce(ServerBuilder) -> ServerBuilder) -> TestApp {
    let provider = Arc::new(InMemoryIdentityProvider::new());
    let store = EntityStore::new(InMemoryStorage::new());

    let builder = ServerBuilder::new()
        .with_config(config)
        .with_store(store.clone())
        .with_identity_provider(provider.clone())
        .register_resource::<Note>(ResourceOptions::default())
        .unwrap()
        .register_resource::<Article>(ResourceOptions::default().public())
        .unwrap();

    let mut server = customize(builder).build().unwrap();
    let server = TestServer::new(server.router().unwrap());

    TestApp {
        server,
        provider,
        store,
    }
}

impl TestApp {
    /// `POST /auth/register` and return the response body
    pub async fn register_raw(&self, name: &str, email: &str, password: &str) -> Value {
        self.server
            .post("/auth/register")
            .json(&json!({"name": name, "email": email, "password": password}))
            .await
            .json()
    }

    /// Register a user and log them in
    pub async fn sign_up(&self, name: &str, email: &str) -> Session {
        let body = self.register_raw(name, email, "secret").await;
        assert_eq!(body["success"], true, "registration failed: {body}");
        let id = Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap();

        let token = self.provider.login(email, "secret").await.unwrap();
        Session {
            id,
            header: format!("Bearer {token}"),
            token,
        }
    }

    /// Create a note as `session` and return its id
    pub async fn create_note(&self, session: &Session, title: &str) -> Uuid {
        let body: Value = self
            .server
            .post("/notes")
            .add_header("authorization", session.header.as_str())
            .json(&json!({"title": title}))
            .await
            .json();
        assert_eq!(body["success"], true, "create failed: {body}");
        Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap()
    }
}
