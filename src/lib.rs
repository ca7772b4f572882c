//! # cms-builder
//!
//! A framework for exposing data-model types as authenticated, paginated REST
//! resources.
//!
//! ## Features
//!
//! - **Resource binding**: one `register_resource::<T>()` call generates list, get, create,
//!   update and delete routes for a record type
//! - **Ownership scoping**: every lookup and listing is filtered by owner inside the query;
//!   administrators see everything
//! - **Route registry**: named, method-scoped routes with path parameters and a catch-all,
//!   frozen before serving
//! - **Middleware chain**: request logging and bearer authentication, outermost first
//! - **Pluggable storage**: in-memory by default, PostgreSQL behind the `postgres` feature
//! - **Uniform envelope**: `{ "success", "message", "data" }` on every response
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cms_builder::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Note {
//!     id: Uuid,
//!     owner_id: Uuid,
//!     title: String,
//!     created_at: DateTime<Utc>,
//!     updated_at: DateTime<Utc>,
//! }
//!
//! impl Record for Note {
//!     fn resource_name() -> &'static str { "note" }
//!     fn writable_fields() -> &'static [&'static str] { &["title"] }
//!     fn id(&self) -> Uuid { self.id }
//!     fn owner_id(&self) -> Uuid { self.owner_id }
//! }
//!
//! let server = ServerBuilder::from_config(AppConfig::from_env()?)
//!     .await?
//!     .with_identity_provider(Arc::new(InMemoryIdentityProvider::new()))
//!     .register_resource::<Note>(ResourceOptions::default())?
//!     .build()?;
//!
//! server.run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod resources;
pub mod server;
pub mod storage;
pub mod telemetry;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthContext, AuthPolicy},
        entity::Record,
        error::{ApiError, ApiResult, IdentityError, StorageError},
        pluralize::Pluralizer,
        predicate::Predicate,
        query::{Pagination, PaginationMeta, QueryParams},
        response::{Envelope, Reply},
        service::StorageBackend,
        store::{EntityStore, Listing},
    };

    // === Identity ===
    pub use crate::auth::{AuthMiddleware, IdentityProvider, InMemoryIdentityProvider};

    // === Resources ===
    pub use crate::resources::{
        LocalUser, Operation, Resource, ResourceDescriptor, ResourceOptions, StaticFiles, Upload,
        UserDirectory,
    };

    // === Storage ===
    pub use crate::storage::InMemoryStorage;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStorage;

    // === Config ===
    pub use crate::config::{AppConfig, UploadConfig};

    // === Server ===
    pub use crate::server::{
        Handler, LoggingMiddleware, Middleware, Next, RequestContext, RouteRegistry, Server,
        ServerBuilder, handler_fn,
    };

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use uuid::Uuid;

    // === Axum ===
    pub use axum::http::Method;
    pub use axum::response::{IntoResponse, Response};
}
