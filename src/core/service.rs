//! The storage seam the entity store is built on
//!
//! Backends work on JSON object rows addressed by a [`Table`] and filtered by
//! [`Predicate`]s, which keeps the trait object-safe and independent of the
//! record types bound on top of it.

use super::entity::Record;
use super::error::{ApiError, ApiResult, StorageError};
use super::predicate::{Predicate, validate_identifier};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A table (or collection) reference with its primary key column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub id_column: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> ApiResult<Self> {
        let name = name.into();
        validate_identifier(&name).map_err(|_| {
            ApiError::configuration(format!("'{name}' is not a valid table name"))
        })?;
        Ok(Self {
            name,
            id_column: "id".to_string(),
        })
    }

    /// The table backing a record type
    pub fn for_record<T: Record>() -> ApiResult<Self> {
        Self::new(T::table_name())
    }
}

/// A slice of an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

/// Storage backend trait
///
/// Implementations must return rows in a stable order so that consecutive
/// windows over the same predicate partition the result set.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// First row matching the predicate
    async fn find_one(
        &self,
        table: &Table,
        predicate: &Predicate,
    ) -> Result<Option<Value>, StorageError>;

    /// Rows matching the predicate, optionally restricted to a window
    async fn find_many(
        &self,
        table: &Table,
        predicate: &Predicate,
        window: Option<Window>,
    ) -> Result<Vec<Value>, StorageError>;

    /// Number of rows matching the predicate
    async fn count(&self, table: &Table, predicate: &Predicate) -> Result<usize, StorageError>;

    /// Insert a row and return it as stored
    async fn insert(&self, table: &Table, row: Map<String, Value>) -> Result<Value, StorageError>;

    /// Replace the row with the given id and return it as stored
    async fn update(
        &self,
        table: &Table,
        id: &str,
        row: Map<String, Value>,
    ) -> Result<Value, StorageError>;

    /// Delete the row with the given id
    async fn delete(&self, table: &Table, id: &str) -> Result<(), StorageError>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
