//! File uploads
//!
//! `POST /uploads` takes a `multipart/form-data` body with a `file` field,
//! writes the file below the upload directory and stores an [`Upload`]
//! record owned by the uploader. The files are served back through a
//! [`StaticFiles`] mount, and `DELETE /uploads/{id}` removes both the record
//! and the file. Listing and reading records goes through the regular
//! resource binder.

use super::descriptor::ResourceOptions;
use super::static_files::StaticFiles;
use crate::config::UploadConfig;
use crate::core::entity::Record;
use crate::core::error::{ApiError, ApiResult};
use crate::core::response::Reply;
use crate::core::store::EntityStore;
use crate::server::handler::{Handler, RequestContext};
use crate::server::registry::RouteRegistry;
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "file";

const MAX_STORED_NAME: usize = 100;

/// A stored file and who uploaded it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub owner_id: Uuid,

    /// Name the client sent
    pub file_name: String,

    /// Location below the upload directory
    pub file_path: String,

    /// Where the file is served
    pub url: String,

    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Upload {
    fn resource_name() -> &'static str {
        "upload"
    }

    fn writable_fields() -> &'static [&'static str] {
        &[]
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Options the builder binds the `uploads` resource with
///
/// Creating and deleting go through [`Uploads`], so only reads are generated.
pub fn uploads_resource_options() -> ResourceOptions {
    ResourceOptions::default().read_only()
}

/// Writes, serves and removes uploaded files
pub struct Uploads {
    store: EntityStore,
    dir: PathBuf,
    url_prefix: String,
    max_file_size: usize,
}

impl Uploads {
    pub fn new(store: EntityStore, dir: impl Into<PathBuf>, config: &UploadConfig) -> Self {
        Self {
            store,
            dir: dir.into(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_file_size: config.max_file_size,
        }
    }

    /// Register `POST /uploads`, `DELETE /uploads/{id}` and the file mount
    pub fn register_routes(self, registry: &mut RouteRegistry) -> ApiResult<()> {
        let plural = Upload::resource_plural();
        let static_pattern = StaticFiles::pattern(&self.url_prefix);
        let files = StaticFiles::new(self.dir.clone());
        let uploads = Arc::new(self);

        registry.add_route(
            &format!("/{plural}"),
            Method::POST,
            UploadHandler::Create(uploads.clone()),
            &format!("{plural}.create"),
            true,
        )?;
        registry.add_route(
            &format!("/{plural}/{{id}}"),
            Method::DELETE,
            UploadHandler::Delete(uploads),
            &format!("{plural}.delete"),
            true,
        )?;
        registry.add_route(
            &static_pattern,
            Method::GET,
            files,
            &format!("{plural}.files"),
            false,
        )
    }

    async fn create(&self, req: &RequestContext) -> ApiResult<Reply<Upload>> {
        let owner = req.auth.require_user()?;
        let (file_name, data) = read_file_field(req).await?;
        if data.len() > self.max_file_size {
            return Err(ApiError::validation(format!(
                "file is larger than {} bytes",
                self.max_file_size
            )));
        }

        let id = Uuid::new_v4();
        let stored = stored_name(id, &file_name);
        let path = self.dir.join(&stored);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ApiError::upstream("uploads", e.to_string()))?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ApiError::upstream("uploads", e.to_string()))?;

        let now = Utc::now();
        let upload = Upload {
            id,
            owner_id: owner,
            file_name,
            url: format!("{}/{stored}", self.url_prefix),
            file_path: stored,
            size: data.len() as u64,
            created_at: now,
            updated_at: now,
        };

        match self.store.create(&upload).await {
            Ok(created) => {
                tracing::info!(id = %created.id, %owner, size = created.size, "file uploaded");
                Ok(Reply::created("upload created", created))
            }
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %e, "orphaned upload left on disk");
                }
                Err(err)
            }
        }
    }

    async fn delete(&self, req: &RequestContext) -> ApiResult<Reply<()>> {
        let actor = req.auth.require_user()?;
        let id = req.param_uuid("id")?;
        let upload = self
            .store
            .get::<Upload>(id, actor, req.auth.is_admin())
            .await?;
        self.store.delete(&upload).await?;

        match self.locate(&upload.file_path) {
            Some(path) => {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %e, "upload file could not be removed");
                }
            }
            None => tracing::warn!(id = %upload.id, path = %upload.file_path, "upload path escapes the upload directory"),
        }

        tracing::info!(id = %upload.id, "upload deleted");
        Ok(Reply::ok("upload deleted", ()))
    }

    /// Stored paths are single file names; anything else is never touched
    fn locate(&self, file_path: &str) -> Option<PathBuf> {
        let mut components = Path::new(file_path).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.dir.join(file_path)),
            _ => None,
        }
    }
}

/// Extract the `file` field of a multipart body
async fn read_file_field(req: &RequestContext) -> ApiResult<(String, Bytes)> {
    let mut request = Request::new(Body::from(req.body.clone()));
    *request.headers_mut() = req.headers.clone();

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::validation("the file field has no file name"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        return Ok((file_name, data));
    }

    Err(ApiError::validation(format!(
        "multipart field '{FILE_FIELD}' is missing"
    )))
}

/// `<id>-<sanitized name>`, a flat file name that cannot leave the directory
fn stored_name(id: Uuid, file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STORED_NAME)
        .collect();

    let clean = clean.trim_start_matches('.');
    if clean.is_empty() {
        id.to_string()
    } else {
        format!("{id}-{clean}")
    }
}

enum UploadHandler {
    Create(Arc<Uploads>),
    Delete(Arc<Uploads>),
}

#[async_trait]
impl Handler for UploadHandler {
    async fn call(&self, req: RequestContext) -> Response {
        match self {
            UploadHandler::Create(uploads) => uploads.create(&req).await.into_response(),
            UploadHandler::Delete(uploads) => uploads.delete(&req).await.into_response(),
        }
    }
}
