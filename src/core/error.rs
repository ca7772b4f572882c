//! Typed error handling for cms-builder
//!
//! Every failure that can reach a client is one of the [`ApiError`] variants.
//! Subsystems keep their own error types ([`StorageError`], [`IdentityError`])
//! and each call site maps them into the taxonomy before a response is built,
//! so no backend error ever escapes uninterpreted.
//!
//! # Example
//!
//! ```rust,ignore
//! use cms_builder::prelude::*;
//!
//! async fn load(store: &EntityStore, id: Uuid, owner: Uuid) -> Result<Note, ApiError> {
//!     store.get::<Note>(id, owner, false).await
//! }
//!
//! match load(&store, id, owner).await {
//!     Ok(note) => println!("{}", note.title),
//!     Err(ApiError::NotFound { resource }) => println!("no such {resource}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use super::response::Envelope;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message shown to clients instead of upstream failure detail
pub const UPSTREAM_PUBLIC_MESSAGE: &str = "internal error, please try again later";

/// The error taxonomy exposed by every generated handler
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or inconsistent startup configuration. Fatal before serving.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Record absent, or present but not visible to the actor
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Malformed request body, query or path
    #[error("{0}")]
    Validation(String),

    /// The route requires an identity and none was resolved
    #[error("authentication required")]
    Unauthenticated,

    /// Identity resolved but not allowed to act
    #[error("not allowed: {0}")]
    Unauthorized(String),

    /// Identity provider or storage backend failure
    #[error("{service} failure: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ApiError::Configuration(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        ApiError::Upstream {
            service,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Configuration(_) => "CONFIGURATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Upstream { .. } => "UPSTREAM_ERROR",
        }
    }

    /// The message placed in the response envelope
    ///
    /// Upstream failures are replaced with a generic message; the detail only
    /// goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Upstream { .. } | ApiError::Configuration(_) => {
                UPSTREAM_PUBLIC_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Emit the error at the level its category calls for
    pub fn log(&self) {
        match self {
            ApiError::Unauthenticated | ApiError::NotFound { .. } | ApiError::Validation(_) => {
                tracing::debug!(code = self.error_code(), "{}", self)
            }
            ApiError::Unauthorized(_) => tracing::info!(code = self.error_code(), "{}", self),
            ApiError::Upstream { .. } | ApiError::Configuration(_) => {
                tracing::error!(code = self.error_code(), error = %self, "request failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let body = Envelope::<()>::failure(self.public_message()).with_code(self.error_code());
        (status, Json(body)).into_response()
    }
}

/// Result alias used across the crate
pub type ApiResult<T> = std::result::Result<T, ApiError>;

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("row could not be (de)serialized: {0}")]
    Serialization(String),

    #[error("{table} row {id} already exists")]
    Conflict { table: String, id: String },

    #[error("{table} row {id} does not exist")]
    Missing { table: String, id: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connection(err.to_string())
            }
            other => StorageError::Query(other.to_string()),
        }
    }
}

impl StorageError {
    /// Interpret a storage failure for a given resource
    ///
    /// A missing row becomes a not-found, a duplicate becomes a validation
    /// error and everything else is an upstream failure.
    pub fn into_api(self, resource: &str) -> ApiError {
        match self {
            StorageError::Missing { .. } => ApiError::not_found(resource),
            StorageError::Conflict { .. } => {
                ApiError::validation(format!("{resource} already exists"))
            }
            other => ApiError::upstream("storage", other.to_string()),
        }
    }
}

// =============================================================================
// Identity Errors
// =============================================================================

/// Errors raised by an identity provider
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("credential rejected")]
    InvalidCredential,

    #[error("{0} is already registered")]
    AlreadyRegistered(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredential => ApiError::Unauthenticated,
            IdentityError::AlreadyRegistered(email) => {
                ApiError::validation(format!("{email} is already registered"))
            }
            other => ApiError::upstream("identity provider", other.to_string()),
        }
    }
}
