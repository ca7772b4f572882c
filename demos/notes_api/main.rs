//! Notes API example
//!
//! This example demonstrates:
//! - Loading configuration from the environment
//! - Binding a record type as an owner-scoped REST resource
//! - A publicly readable resource next to a private one
//! - The in-memory identity provider with registration at `/auth/register`
//!
//! Run with `cargo run --example notes_api`, then:
//!
//! ```text
//! curl -X POST localhost:8080/auth/register \
//!   -H 'content-type: application/json' \
//!   -d '{"name":"Ann","email":"ann@x.com","password":"p@ss"}'
//! ```

use cms_builder::config::DatabaseConfig;
use cms_builder::prelude::*;
use cms_builder::telemetry;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    #[serde(default)]
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Category {
    id: Uuid,
    owner_id: Uuid,
    label: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Record for Category {
    fn resource_name() -> &'static str {
        "category"
    }

    fn writable_fields() -> &'static [&'static str] {
        &["label"]
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;
    if config.database.is_none() {
        config.database = Some(DatabaseConfig::new("memory://"));
    }
    telemetry::init(&config.logging)?;

    let server = ServerBuilder::from_config(config)
        .await?
        .with_identity_provider(Arc::new(InMemoryIdentityProvider::new()))
        .register_resource::<Note>(ResourceOptions::default())?
        .register_resource::<Category>(ResourceOptions::default().public().admin_writes())?
        .build()?;

    server.run().await?;
    Ok(())
}
