//! In-memory storage backend for testing and development

use crate::core::error::StorageError;
use crate::core::predicate::Predicate;
use crate::core::service::{StorageBackend, Table, Window};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Rows = IndexMap<String, Value>;

/// In-memory storage backend
///
/// Tables are created on first insert and keep rows in insertion order, which
/// is the order listings are returned in. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<HashMap<String, Rows>>>,
}

impl InMemoryStorage {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

fn row_id(table: &Table, row: &Map<String, Value>) -> Result<String, StorageError> {
    match row.get(&table.id_column) {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(StorageError::Serialization(format!(
            "{} row has no '{}' value",
            table.name, table.id_column
        ))),
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_one(
        &self,
        table: &Table,
        predicate: &Predicate,
    ) -> Result<Option<Value>, StorageError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Query(format!("Failed to acquire read lock: {}", e)))?;

        Ok(tables
            .get(&table.name)
            .and_then(|rows| rows.values().find(|row| predicate.matches(row)))
            .cloned())
    }

    async fn find_many(
        &self,
        table: &Table,
        predicate: &Predicate,
        window: Option<Window>,
    ) -> Result<Vec<Value>, StorageError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Query(format!("Failed to acquire read lock: {}", e)))?;

        let Some(rows) = tables.get(&table.name) else {
            return Ok(Vec::new());
        };

        let matching = rows.values().filter(|row| predicate.matches(row));
        let selected: Vec<Value> = match window {
            Some(Window { offset, limit }) => matching.skip(offset).take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };

        Ok(selected)
    }

    async fn count(&self, table: &Table, predicate: &Predicate) -> Result<usize, StorageError> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Query(format!("Failed to acquire read lock: {}", e)))?;

        Ok(tables
            .get(&table.name)
            .map(|rows| rows.values().filter(|row| predicate.matches(row)).count())
            .unwrap_or(0))
    }

    async fn insert(&self, table: &Table, row: Map<String, Value>) -> Result<Value, StorageError> {
        let id = row_id(table, &row)?;
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::Query(format!("Failed to acquire write lock: {}", e)))?;

        let rows = tables.entry(table.name.clone()).or_default();
        if rows.contains_key(&id) {
            return Err(StorageError::Conflict {
                table: table.name.clone(),
                id,
            });
        }

        let row = Value::Object(row);
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &Table,
        id: &str,
        row: Map<String, Value>,
    ) -> Result<Value, StorageError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::Query(format!("Failed to acquire write lock: {}", e)))?;

        let slot = tables
            .get_mut(&table.name)
            .and_then(|rows| rows.get_mut(id))
            .ok_or_else(|| StorageError::Missing {
                table: table.name.clone(),
                id: id.to_string(),
            })?;

        *slot = Value::Object(row);
        Ok(slot.clone())
    }

    async fn delete(&self, table: &Table, id: &str) -> Result<(), StorageError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::Query(format!("Failed to acquire write lock: {}", e)))?;

        tables
            .get_mut(&table.name)
            .and_then(|rows| rows.shift_remove(id))
            .map(|_| ())
            .ok_or_else(|| StorageError::Missing {
                table: table.name.clone(),
                id: id.to_string(),
            })
    }
}
