//! ServerBuilder for fluent API to build HTTP servers

use super::handler::{Handler, RequestContext, handler_fn};
use super::host::Server;
use super::middleware::{LoggingMiddleware, Middleware};
use super::registry::RouteRegistry;
use crate::auth::{AuthMiddleware, IdentityProvider};
use crate::config::AppConfig;
use crate::core::entity::Record;
use crate::core::error::{ApiError, ApiResult};
use crate::core::response::Reply;
use crate::core::service::StorageBackend;
use crate::core::store::EntityStore;
use crate::resources::uploads::{Upload, Uploads, uploads_resource_options};
use crate::resources::users::{MeHandler, RegisterHandler, users_resource_options};
use crate::resources::{
    LocalUser, Resource, ResourceContext, ResourceDescriptor, ResourceOptions, ResourceRegistry,
    StaticFiles, UserDirectory,
};
use axum::http::Method;
use axum::response::IntoResponse;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

struct PendingRoute {
    pattern: String,
    method: Method,
    handler: Arc<dyn Handler>,
    name: String,
    requires_auth: bool,
}

/// Builder for a [`Server`] with generated resource routes
///
/// `build()` registers, in order: the logging middleware, the auth
/// middleware (when an identity provider is set), custom middleware,
/// `GET /health`, the registration endpoints and the `users` resource (with
/// an identity provider), every registered resource, the upload routes (with
/// an upload directory), custom routes and static file mounts.
///
/// # Example
///
/// ```ignore
/// let server = ServerBuilder::new()
///     .with_storage(InMemoryStorage::new())
///     .with_identity_provider(Arc::new(InMemoryIdentityProvider::new()))
///     .register_resource::<Note>(ResourceOptions::default())?
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    store: Option<EntityStore>,
    identity: Option<Arc<dyn IdentityProvider>>,
    middleware: Vec<Arc<dyn Middleware>>,
    routes: Vec<PendingRoute>,
    resources: ResourceRegistry,
    static_mounts: Vec<(String, PathBuf)>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            store: None,
            identity: None,
            middleware: Vec::new(),
            routes: Vec::new(),
            resources: ResourceRegistry::new(),
            static_mounts: Vec::new(),
        }
    }

    /// Validate `config` and open the storage backend it names
    pub async fn from_config(config: AppConfig) -> ApiResult<Self> {
        config.validate()?;
        let backend = crate::storage::connect(config.database()?).await?;
        Ok(Self::new()
            .with_config(config)
            .with_store(EntityStore::from_backend(backend)))
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `backend` for every resource
    pub fn with_storage(self, backend: impl StorageBackend + 'static) -> Self {
        self.with_store(EntityStore::new(backend))
    }

    /// Share an existing store
    pub fn with_store(mut self, store: EntityStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Enable bearer authentication and the registration endpoints
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    /// Add a middleware after the built-in ones
    pub fn with_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Add a route that doesn't fit the CRUD pattern
    pub fn with_route(
        mut self,
        pattern: &str,
        method: Method,
        handler: impl Handler,
        name: &str,
        requires_auth: bool,
    ) -> Self {
        self.routes.push(PendingRoute {
            pattern: pattern.to_string(),
            method,
            handler: Arc::new(handler),
            name: name.to_string(),
            requires_auth,
        });
        self
    }

    /// Serve the files below `root` under `prefix`
    pub fn with_static_files(mut self, prefix: &str, root: impl Into<PathBuf>) -> Self {
        self.static_mounts.push((prefix.to_string(), root.into()));
        self
    }

    /// Accept multipart uploads stored below `dir`
    ///
    /// Adds `POST /uploads`, `DELETE /uploads/{id}`, the read routes of the
    /// `uploads` resource and a file mount at `uploads.url_prefix`.
    pub fn with_uploads(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.uploads.dir = Some(dir.into());
        self
    }

    /// Bind a record type as a REST resource
    pub fn register_resource<T: Record>(mut self, options: ResourceOptions) -> ApiResult<Self> {
        self.resources
            .register(Box::new(Resource::<T>::new(options)))?;
        Ok(self)
    }

    /// Register a custom resource descriptor
    pub fn register_descriptor(mut self, descriptor: Box<dyn ResourceDescriptor>) -> ApiResult<Self> {
        self.resources.register(descriptor)?;
        Ok(self)
    }

    /// Assemble the route registry
    pub fn build(self) -> ApiResult<Server> {
        self.config.validate_settings()?;
        let store = self.store.ok_or_else(|| {
            ApiError::configuration("no storage configured; call with_storage or from_config")
        })?;

        let mut registry = RouteRegistry::new();
        registry.set_body_limit(self.config.server.body_limit);
        registry.add_middleware(LoggingMiddleware)?;

        let users = UserDirectory::new(store.clone());
        if let Some(provider) = &self.identity {
            registry.add_middleware(AuthMiddleware::new(provider.clone(), users.clone()))?;
        }
        for middleware in self.middleware {
            registry.add_middleware(middleware)?;
        }

        let health_store = store.clone();
        registry.add_route(
            "/health",
            Method::GET,
            handler_fn(move |_req: RequestContext| {
                let store = health_store.clone();
                async move {
                    store
                        .ping()
                        .await
                        .map(|()| {
                            Reply::ok(
                                "healthy",
                                json!({"status": "ok", "storage": store.backend_name()}),
                            )
                        })
                        .into_response()
                }
            }),
            "health",
            false,
        )?;

        let mut resources = ResourceRegistry::new();
        if let Some(provider) = &self.identity {
            registry.add_route(
                "/auth/register",
                Method::POST,
                RegisterHandler::new(provider.clone(), users.clone(), self.config.auth.clone()),
                "register",
                false,
            )?;
            registry.add_route(
                "/auth/me",
                Method::GET,
                MeHandler::new(users.clone()),
                "me",
                true,
            )?;
            resources.register(Box::new(Resource::<LocalUser>::new(
                users_resource_options(),
            )))?;
        }
        for descriptor in self.resources.into_descriptors() {
            resources.register(descriptor)?;
        }
        let uploads = match &self.config.uploads.dir {
            Some(dir) => {
                resources.register(Box::new(Resource::<Upload>::new(
                    uploads_resource_options(),
                )))?;
                Some(Uploads::new(store.clone(), dir.clone(), &self.config.uploads))
            }
            None => None,
        };

        let ctx = ResourceContext::new(store, self.config.pagination.clone());
        resources.bind_all(&mut registry, &ctx)?;
        if let Some(uploads) = uploads {
            uploads.register_routes(&mut registry)?;
        }

        for route in self.routes {
            registry.add_route(
                &route.pattern,
                route.method,
                route.handler,
                &route.name,
                route.requires_auth,
            )?;
        }

        for (i, (prefix, root)) in self.static_mounts.into_iter().enumerate() {
            let name = if i == 0 {
                "static".to_string()
            } else {
                format!("static.{i}")
            };
            registry.add_route(
                &StaticFiles::pattern(&prefix),
                Method::GET,
                StaticFiles::new(root),
                &name,
                false,
            )?;
        }

        tracing::info!(
            routes = registry.routes().len(),
            resources = ?resources.names(),
            "server built"
        );
        Ok(Server::new(registry, self.config.server))
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
