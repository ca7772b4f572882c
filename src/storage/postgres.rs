//! PostgreSQL storage backend using sqlx.
//!
//! Rows travel as JSON: reads select `to_jsonb(table.*)` and writes go through
//! `jsonb_populate_record`, so any table whose columns match a record's
//! serialized fields can be bound without per-type SQL. The schema itself is
//! managed by migrations outside this crate.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! cms-builder = { version = "0.1", features = ["postgres"] }
//! ```

use crate::core::error::StorageError;
use crate::core::predicate::{Predicate, QueryBuf, quoted, validate_identifier};
use crate::core::service::{StorageBackend, Table, Window};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

/// Unique violation SQLSTATE
const UNIQUE_VIOLATION: &str = "23505";

/// Storage backend backed by a PostgreSQL connection pool.
#[derive(Clone, Debug)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Create a new `PostgresStorage` with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self::new(pool))
    }

    async fn fetch_rows(&self, q: QueryBuf) -> Result<Vec<Value>, StorageError> {
        let QueryBuf { sql, params } = q;
        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for param in params {
            query = query.bind(param);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}

fn select(table: &Table, predicate: &Predicate) -> QueryBuf {
    let name = quoted(&table.name);
    let mut q = QueryBuf::new(format!("SELECT to_jsonb({name}.*) FROM {name}"));
    predicate.push_where(&mut q);
    q
}

fn write_error(table: &Table, id: &str, err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StorageError::Conflict {
                table: table.name.clone(),
                id: id.to_string(),
            }
        }
        _ => err.into(),
    }
}

#[async_trait]
impl StorageBackend for PostgresStorage {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn find_one(
        &self,
        table: &Table,
        predicate: &Predicate,
    ) -> Result<Option<Value>, StorageError> {
        let mut q = select(table, predicate);
        q.push_str(" LIMIT 1");
        Ok(self.fetch_rows(q).await?.into_iter().next())
    }

    async fn find_many(
        &self,
        table: &Table,
        predicate: &Predicate,
        window: Option<Window>,
    ) -> Result<Vec<Value>, StorageError> {
        let mut q = select(table, predicate);
        q.push_str(&format!(" ORDER BY {}", quoted(&table.id_column)));
        if let Some(Window { offset, limit }) = window {
            q.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        self.fetch_rows(q).await
    }

    async fn count(&self, table: &Table, predicate: &Predicate) -> Result<usize, StorageError> {
        let mut q = QueryBuf::new(format!("SELECT COUNT(*) FROM {}", quoted(&table.name)));
        predicate.push_where(&mut q);

        let QueryBuf { sql, params } = q;
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            query = query.bind(param);
        }

        let total = query.fetch_one(&self.pool).await?;
        Ok(usize::try_from(total).unwrap_or_default())
    }

    async fn insert(&self, table: &Table, row: Map<String, Value>) -> Result<Value, StorageError> {
        let id = row
            .get(&table.id_column)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        let name = quoted(&table.name);
        let sql = format!(
            "INSERT INTO {name} SELECT * FROM jsonb_populate_record(NULL::{name}, $1) \
             RETURNING to_jsonb({name}.*)"
        );

        sqlx::query_scalar::<_, Value>(&sql)
            .bind(Json(Value::Object(row)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(table, &id, e))
    }

    async fn update(
        &self,
        table: &Table,
        id: &str,
        row: Map<String, Value>,
    ) -> Result<Value, StorageError> {
        let mut assignments = Vec::new();
        for column in row.keys().filter(|c| **c != table.id_column) {
            validate_identifier(column)
                .map_err(|_| StorageError::Serialization(format!("invalid column '{column}'")))?;
            let column = quoted(column);
            assignments.push(format!("{column} = r.{column}"));
        }
        if assignments.is_empty() {
            return Err(StorageError::Serialization(format!(
                "{} update has no columns",
                table.name
            )));
        }

        let name = quoted(&table.name);
        let sql = format!(
            "UPDATE {name} SET {} FROM jsonb_populate_record(NULL::{name}, $1) AS r \
             WHERE {name}.{}::text = $2 RETURNING to_jsonb({name}.*)",
            assignments.join(", "),
            quoted(&table.id_column),
        );

        sqlx::query_scalar::<_, Value>(&sql)
            .bind(Json(Value::Object(row)))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(table, id, e))?
            .ok_or_else(|| StorageError::Missing {
                table: table.name.clone(),
                id: id.to_string(),
            })
    }

    async fn delete(&self, table: &Table, id: &str) -> Result<(), StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE {}::text = $1",
            quoted(&table.name),
            quoted(&table.id_column)
        );

        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Missing {
                table: table.name.clone(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}
