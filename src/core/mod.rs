//! Core module containing fundamental traits and types for the framework

pub mod auth;
pub mod entity;
pub mod error;
pub mod pluralize;
pub mod predicate;
pub mod query;
pub mod response;
pub mod service;
pub mod store;

pub use auth::{AuthContext, AuthPolicy};
pub use entity::Record;
pub use error::{ApiError, ApiResult, IdentityError, StorageError};
pub use pluralize::Pluralizer;
pub use predicate::Predicate;
pub use query::{Pagination, PaginationMeta, QueryParams};
pub use response::{Envelope, Reply};
pub use service::{StorageBackend, Table, Window};
pub use store::{EntityStore, Listing};
