//! Serves files from a directory through a catch-all route

use crate::core::error::{ApiError, ApiResult};
use crate::server::handler::{Handler, RequestContext};
use async_trait::async_trait;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::path::{Component, Path, PathBuf};

/// Name of the catch-all parameter the route pattern must declare
pub const PATH_PARAM: &str = "path";

/// Files below `root`, addressed by the `{*path}` parameter
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Route pattern for serving under `prefix`, e.g. `/static/{*path}`
    pub fn pattern(prefix: &str) -> String {
        format!("{}/{{*{PATH_PARAM}}}", prefix.trim_end_matches('/'))
    }

    /// Resolve a request path below the root; anything escaping it is not found
    fn locate(&self, requested: &str) -> ApiResult<PathBuf> {
        let relative = Path::new(requested);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(ApiError::not_found("file"));
        }
        Ok(self.root.join(relative))
    }

    async fn serve(&self, req: &RequestContext) -> ApiResult<Response> {
        let path = self.locate(req.param(PATH_PARAM)?)?;
        let contents = tokio::fs::read(&path).await.map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "static file unavailable");
            ApiError::not_found("file")
        })?;

        Ok(([(header::CONTENT_TYPE, content_type(&path))], contents).into_response())
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn call(&self, req: RequestContext) -> Response {
        match self.serve(&req).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern() {
        assert_eq!(StaticFiles::pattern("/static"), "/static/{*path}");
        assert_eq!(StaticFiles::pattern("/assets/"), "/assets/{*path}");
    }

    #[test]
    fn test_locate_rejects_escapes() {
        let files = StaticFiles::new("/srv/www");
        assert_eq!(
            files.locate("css/site.css").unwrap(),
            PathBuf::from("/srv/www/css/site.css")
        );
        assert!(files.locate("../etc/passwd").is_err());
        assert!(files.locate("css/../../secret").is_err());
        assert!(files.locate("/etc/passwd").is_err());
        assert!(files.locate("./index.html").is_err());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("a/index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.png")), "image/png");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
