//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStorage;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStorage;

use crate::config::{DatabaseConfig, DatabaseTarget};
use crate::core::error::{ApiError, ApiResult};
use crate::core::service::StorageBackend;
use std::sync::Arc;

/// Open the backend selected by the database configuration
pub async fn connect(config: &DatabaseConfig) -> ApiResult<Arc<dyn StorageBackend>> {
    match config.target()? {
        DatabaseTarget::Memory => {
            tracing::info!("using in-memory storage");
            Ok(Arc::new(InMemoryStorage::new()))
        }
        #[cfg(feature = "postgres")]
        DatabaseTarget::Postgres(url) => {
            let storage = PostgresStorage::connect(&url, config.max_connections)
                .await
                .map_err(|e| ApiError::configuration(format!("cannot reach database: {e}")))?;
            tracing::info!("connected to postgres");
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "postgres"))]
        DatabaseTarget::Postgres(_) => Err(ApiError::configuration(
            "postgres database configured but the `postgres` feature is disabled",
        )),
    }
}
