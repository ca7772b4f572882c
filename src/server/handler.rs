//! Route handlers and the per-request context they receive

use super::pattern::PathParams;
use crate::core::auth::AuthContext;
use crate::core::error::{ApiError, ApiResult};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a handler gets to see about a dispatched request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub params: PathParams,
    pub body: Bytes,

    /// Identity resolved by the auth middleware, `Anonymous` otherwise
    pub auth: AuthContext,

    /// Name of the matched route
    pub route_name: String,
}

impl RequestContext {
    /// A path parameter captured by the route pattern
    pub fn param(&self, name: &str) -> ApiResult<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::validation(format!("missing path parameter '{name}'")))
    }

    /// A path parameter parsed as a UUID
    pub fn param_uuid(&self, name: &str) -> ApiResult<Uuid> {
        let raw = self.param(name)?;
        Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("'{raw}' is not a valid id")))
    }

    /// Deserialize the query string
    pub fn query<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Query::<T>::try_from_uri(&self.uri)
            .map(|Query(value)| value)
            .map_err(|e| ApiError::validation(format!("malformed query: {}", e.body_text())))
    }

    /// Deserialize the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        if self.body.is_empty() {
            return Err(ApiError::validation("request body is empty"));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::validation(format!("malformed JSON body: {e}")))
    }
}

/// A route handler
///
/// Handlers turn every failure into a response themselves, normally by
/// returning an [`ApiError`] through `IntoResponse`.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, ctx: RequestContext) -> Response;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, ctx: RequestContext) -> Response {
        (**self).call(ctx).await
    }
}

/// Handler backed by an async function or closure
pub struct FnHandler<F>(F);

/// Wrap an async function as a [`Handler`]
///
/// ```rust,ignore
/// registry.add_route(
///     "/ping",
///     Method::GET,
///     handler_fn(|_ctx| async { "pong".into_response() }),
///     "ping",
///     false,
/// )?;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn call(&self, ctx: RequestContext) -> Response {
        (self.0)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn context(uri: &str, body: &str) -> RequestContext {
        RequestContext {
            method: Method::GET,
            uri: uri.parse().unwrap(),
            headers: HeaderMap::new(),
            params: PathParams::from([("id".to_string(), "not-a-uuid".to_string())]),
            body: Bytes::from(body.to_string()),
            auth: AuthContext::Anonymous,
            route_name: "test".to_string(),
        }
    }

    #[derive(Deserialize)]
    struct Paging {
        page: Option<usize>,
    }

    #[test]
    fn test_query_parsing() {
        let ctx = context("/notes?page=3", "");
        assert_eq!(ctx.query::<Paging>().unwrap().page, Some(3));

        let ctx = context("/notes?page=three", "");
        assert!(matches!(ctx.query::<Paging>(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_param_uuid_validation() {
        let ctx = context("/notes/x", "");
        assert!(matches!(ctx.param_uuid("id"), Err(ApiError::Validation(_))));
        assert!(ctx.param("missing").is_err());
    }

    #[test]
    fn test_json_body() {
        let ctx = context("/", "{\"a\":1}");
        let value: serde_json::Value = ctx.json().unwrap();
        assert_eq!(value["a"], 1);

        assert!(context("/", "").json::<serde_json::Value>().is_err());
        assert!(context("/", "{oops").json::<serde_json::Value>().is_err());
    }
}
