//! Request interceptors composed around the dispatcher
//!
//! Middleware runs in registration order: the first one registered is the
//! outermost, sees the request first and the response last. Each middleware
//! decides whether to continue by calling [`Next::run`].

use super::registry::RouteTable;
use async_trait::async_trait;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the id assigned to each request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A request interceptor
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response;
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        (**self).handle(req, next).await
    }
}

/// The rest of the chain after the current middleware
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    table: &'a RouteTable,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], table: &'a RouteTable) -> Self {
        Self { chain, table }
    }

    /// Pass the request to the next middleware, or to the dispatcher
    pub async fn run(self, req: Request) -> Response {
        match self.chain.split_first() {
            Some((current, rest)) => current.handle(req, Next::new(rest, self.table)).await,
            None => self.table.dispatch(req).await,
        }
    }
}

/// Logs every request inside a span carrying a fresh request id
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        let started = Instant::now();
        let mut response = next.run(req).instrument(span.clone()).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        span.in_scope(|| {
            tracing::info!(status = response.status().as_u16(), latency_ms, "request completed")
        });

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}
