//! Ownership-scoped data access over a storage backend
//!
//! [`EntityStore`] is the typed face of a [`StorageBackend`]. Ownership is
//! always expressed as part of the query predicate, so a page and the total
//! reported next to it are computed over exactly the same rows.

use super::entity::{Record, to_object};
use super::error::{ApiError, ApiResult};
use super::predicate::Predicate;
use super::query::Pagination;
use super::service::{StorageBackend, Table, Window};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// A page (or the whole set) of records plus the total matching count
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Typed, ownership-aware access to records
///
/// Cloning is cheap; every clone shares the same backend.
#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn StorageBackend>,
}

impl EntityStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Fetch one record by id
    ///
    /// Unless `skip_owner_check` is set, the lookup is restricted to records
    /// owned by `owner_id`. A record owned by someone else is reported exactly
    /// like a missing one.
    pub async fn get<T: Record>(
        &self,
        id: Uuid,
        owner_id: Uuid,
        skip_owner_check: bool,
    ) -> ApiResult<T> {
        let mut predicate = Predicate::eq_uuid("id", id)?;
        if !skip_owner_check {
            predicate = predicate.and(owner_predicate::<T>(owner_id)?);
        }

        self.find_one::<T>(&predicate)
            .await?
            .ok_or_else(|| ApiError::not_found(T::resource_name()))
    }

    /// First record matching an arbitrary predicate
    pub async fn find_one<T: Record>(&self, predicate: &Predicate) -> ApiResult<Option<T>> {
        let table = Table::for_record::<T>()?;
        let row = self
            .backend
            .find_one(&table, predicate)
            .await
            .map_err(|e| e.into_api(T::resource_name()))?;

        row.map(decode::<T>).transpose()
    }

    /// List records matching `predicate`
    ///
    /// With pagination the total is counted under the same predicate and only
    /// the requested page is fetched; without it every match is returned.
    pub async fn list<T: Record>(
        &self,
        predicate: Predicate,
        pagination: Option<Pagination>,
    ) -> ApiResult<Listing<T>> {
        let table = Table::for_record::<T>()?;

        let (rows, total) = match pagination {
            Some(page) => {
                let total = self
                    .backend
                    .count(&table, &predicate)
                    .await
                    .map_err(|e| e.into_api(T::resource_name()))?;
                let window = Window {
                    offset: page.offset(),
                    limit: page.limit(),
                };
                let rows = self
                    .backend
                    .find_many(&table, &predicate, Some(window))
                    .await
                    .map_err(|e| e.into_api(T::resource_name()))?;
                (rows, total)
            }
            None => {
                let rows = self
                    .backend
                    .find_many(&table, &predicate, None)
                    .await
                    .map_err(|e| e.into_api(T::resource_name()))?;
                let total = rows.len();
                (rows, total)
            }
        };

        let items = rows
            .into_iter()
            .map(decode::<T>)
            .collect::<ApiResult<Vec<T>>>()?;

        Ok(Listing { items, total })
    }

    /// List the records owned by `owner_id`
    pub async fn list_by_owner<T: Record>(
        &self,
        owner_id: Uuid,
        pagination: Option<Pagination>,
    ) -> ApiResult<Listing<T>> {
        self.list(owner_predicate::<T>(owner_id)?, pagination).await
    }

    /// Persist a new record
    ///
    /// No ownership check happens here; the caller decides who may write.
    pub async fn create<T: Record>(&self, record: &T) -> ApiResult<T> {
        let table = Table::for_record::<T>()?;
        let row = self
            .backend
            .insert(&table, to_object(record)?)
            .await
            .map_err(|e| e.into_api(T::resource_name()))?;

        tracing::debug!(resource = T::resource_name(), id = %record.id(), "record created");
        decode(row)
    }

    /// Save an existing record
    pub async fn update<T: Record>(&self, record: &T) -> ApiResult<T> {
        let table = Table::for_record::<T>()?;
        let row = self
            .backend
            .update(&table, &record.id().to_string(), to_object(record)?)
            .await
            .map_err(|e| e.into_api(T::resource_name()))?;

        tracing::debug!(resource = T::resource_name(), id = %record.id(), "record updated");
        decode(row)
    }

    /// Remove a record
    pub async fn delete<T: Record>(&self, record: &T) -> ApiResult<()> {
        let table = Table::for_record::<T>()?;
        self.backend
            .delete(&table, &record.id().to_string())
            .await
            .map_err(|e| e.into_api(T::resource_name()))?;

        tracing::debug!(resource = T::resource_name(), id = %record.id(), "record deleted");
        Ok(())
    }

    /// Check the backend is reachable
    pub async fn ping(&self) -> ApiResult<()> {
        self.backend
            .ping()
            .await
            .map_err(|e| ApiError::upstream("storage", e.to_string()))
    }
}

fn owner_predicate<T: Record>(owner_id: Uuid) -> ApiResult<Predicate> {
    Predicate::eq_uuid(T::owner_field(), owner_id)
}

fn decode<T: Record>(row: Value) -> ApiResult<T> {
    serde_json::from_value(row).map_err(|e| {
        ApiError::upstream(
            "storage",
            format!("stored {} row is unreadable: {}", T::resource_name(), e),
        )
    })
}
