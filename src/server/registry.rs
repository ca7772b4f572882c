//! Route registry and dispatcher
//!
//! A [`RouteRegistry`] starts out *building*: routes and middleware can be
//! added. [`RouteRegistry::freeze`] moves it to *serving* and hands out the
//! immutable [`RouteTable`] that dispatches requests; from then on every
//! mutation fails. The table is shared read-only between all request tasks.

use super::handler::{Handler, RequestContext};
use super::middleware::{Middleware, Next};
use super::pattern::{PathParams, PathPattern};
use crate::core::auth::AuthContext;
use crate::core::error::{ApiError, ApiResult};
use crate::core::response::Envelope;
use axum::Json;
use axum::extract::Request;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Default cap on request bodies read by the dispatcher
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// One registered route
pub struct RouteEntry {
    pub pattern: PathPattern,
    pub method: Method,
    pub handler: Arc<dyn Handler>,
    pub name: String,
    pub requires_auth: bool,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern.as_str())
            .field("method", &self.method)
            .field("name", &self.name)
            .field("requires_auth", &self.requires_auth)
            .finish()
    }
}

/// Outcome of resolving a request against the table
#[derive(Debug)]
pub enum Resolution<'a> {
    /// First registered route matching method and path
    Matched(&'a RouteEntry, PathParams),
    /// The path exists, but not for this method
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

enum RegistryState {
    Building {
        routes: Vec<RouteEntry>,
        middleware: Vec<Arc<dyn Middleware>>,
    },
    Serving(Arc<RouteTable>),
}

/// Registry of routes and middleware
pub struct RouteRegistry {
    state: RegistryState,
    body_limit: usize,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            state: RegistryState::Building {
                routes: Vec::new(),
                middleware: Vec::new(),
            },
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Set the largest request body the dispatcher will read
    pub fn set_body_limit(&mut self, limit: usize) {
        self.body_limit = limit;
    }

    pub fn is_serving(&self) -> bool {
        matches!(self.state, RegistryState::Serving(_))
    }

    /// Register a route
    ///
    /// Fails when the registry is already serving, when the pattern is
    /// malformed, when an identical pattern exists for the same method, or
    /// when the name is taken.
    pub fn add_route(
        &mut self,
        pattern: &str,
        method: Method,
        handler: impl Handler,
        name: &str,
        requires_auth: bool,
    ) -> ApiResult<()> {
        let routes = match &mut self.state {
            RegistryState::Building { routes, .. } => routes,
            RegistryState::Serving(_) => {
                return Err(ApiError::configuration(format!(
                    "cannot add route '{name}': the route table is frozen"
                )));
            }
        };

        let pattern = PathPattern::parse(pattern)?;
        if name.is_empty() {
            return Err(ApiError::configuration(format!(
                "route {method} {pattern} needs a name"
            )));
        }
        if let Some(existing) = routes
            .iter()
            .find(|r| r.method == method && r.pattern.collides_with(&pattern))
        {
            return Err(ApiError::configuration(format!(
                "route {method} {pattern} collides with '{}' ({})",
                existing.name, existing.pattern
            )));
        }
        if routes.iter().any(|r| r.name == name) {
            return Err(ApiError::configuration(format!(
                "route name '{name}' is already registered"
            )));
        }

        tracing::debug!(%method, %pattern, name, requires_auth, "route registered");
        routes.push(RouteEntry {
            pattern,
            method,
            handler: Arc::new(handler),
            name: name.to_string(),
            requires_auth,
        });
        Ok(())
    }

    /// Append a middleware; the first one added is the outermost
    pub fn add_middleware(&mut self, middleware: impl Middleware) -> ApiResult<()> {
        match &mut self.state {
            RegistryState::Building { middleware: chain, .. } => {
                chain.push(Arc::new(middleware));
                Ok(())
            }
            RegistryState::Serving(_) => Err(ApiError::configuration(
                "cannot add middleware: the route table is frozen",
            )),
        }
    }

    /// Freeze the registry and return the table that serves requests
    ///
    /// Freezing again returns the same table.
    pub fn freeze(&mut self) -> ApiResult<Arc<RouteTable>> {
        let table = match &mut self.state {
            RegistryState::Serving(table) => return Ok(table.clone()),
            RegistryState::Building { routes, middleware } => Arc::new(RouteTable {
                routes: std::mem::take(routes),
                middleware: std::mem::take(middleware),
                body_limit: self.body_limit,
            }),
        };

        tracing::info!(routes = table.routes.len(), "route table frozen");
        self.state = RegistryState::Serving(table.clone());
        Ok(table)
    }

    /// Registered routes in registration order
    pub fn routes(&self) -> &[RouteEntry] {
        match &self.state {
            RegistryState::Building { routes, .. } => routes,
            RegistryState::Serving(table) => &table.routes,
        }
    }
}

/// The frozen, shareable route table
pub struct RouteTable {
    routes: Vec<RouteEntry>,
    middleware: Vec<Arc<dyn Middleware>>,
    body_limit: usize,
}

impl RouteTable {
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Find the route for a request
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let mut allowed = Vec::new();
        for entry in &self.routes {
            if let Some(params) = entry.pattern.matches(path) {
                if entry.method == *method {
                    return Resolution::Matched(entry, params);
                }
                if !allowed.contains(&entry.method) {
                    allowed.push(entry.method.clone());
                }
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed(allowed)
        }
    }

    /// Build the path of a named route
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        self.routes
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.pattern.render(params))
    }

    /// Run a request through the middleware chain and dispatch it
    pub async fn handle(&self, req: Request) -> Response {
        Next::new(&self.middleware, self).run(req).await
    }

    /// Terminal step of the chain: resolve, check authentication, call the handler
    pub(crate) async fn dispatch(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();

        let (entry, params) = match self.resolve(&parts.method, parts.uri.path()) {
            Resolution::Matched(entry, params) => (entry, params),
            Resolution::MethodNotAllowed(allowed) => return method_not_allowed(&allowed),
            Resolution::NotFound => return ApiError::not_found("route").into_response(),
        };

        let auth = parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .unwrap_or_default();
        if entry.requires_auth && !auth.is_authenticated() {
            return ApiError::Unauthenticated.into_response();
        }

        let body = match axum::body::to_bytes(body, self.body_limit).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return ApiError::validation(format!(
                    "request body is unreadable or larger than {} bytes",
                    self.body_limit
                ))
                .into_response();
            }
        };

        let ctx = RequestContext {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            params,
            body,
            auth,
            route_name: entry.name.clone(),
        };
        entry.handler.call(ctx).await
    }
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let body = Envelope::<()>::failure("method not allowed").with_code("METHOD_NOT_ALLOWED");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allow)],
        Json(body),
    )
        .into_response()
}
