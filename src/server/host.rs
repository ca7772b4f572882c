//! The serving side: turns a frozen route table into an axum application

use super::registry::{RouteRegistry, RouteTable};
use crate::config::ServerConfig;
use crate::core::error::{ApiError, ApiResult};
use axum::Router;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::response::Response;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// A configured server, ready to freeze its routes and serve
///
/// # Example
///
/// ```rust,ignore
/// let server = ServerBuilder::from_config(AppConfig::from_env()?)
///     .await?
///     .register_resource::<Note>(ResourceOptions::default())?
///     .build()?;
///
/// server.run().await?;
/// ```
pub struct Server {
    registry: RouteRegistry,
    config: ServerConfig,
}

impl Server {
    pub fn new(registry: RouteRegistry, config: ServerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Freeze the route table and return it
    pub fn table(&mut self) -> ApiResult<Arc<RouteTable>> {
        self.registry.freeze()
    }

    /// Freeze the route table and build the axum application around it
    pub fn router(&mut self) -> ApiResult<Router> {
        let table = self.table()?;
        let mut router = Router::new().fallback(dispatch).with_state(table);

        if !self.config.cors_origins.is_empty() {
            router = router.layer(cors_layer(&self.config.cors_origins)?);
        }
        Ok(router)
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(mut self) -> ApiResult<()> {
        let app = self.router()?;
        let address = self.config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ApiError::configuration(format!("cannot bind {address}: {e}")))?;

        tracing::info!("Server listening on {}", address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::upstream("listener", e.to_string()))?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

async fn dispatch(State(table): State<Arc<RouteTable>>, req: Request) -> Response {
    table.handle(req).await
}

fn cors_layer(origins: &[String]) -> ApiResult<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| ApiError::configuration(format!("invalid CORS origin '{o}'")))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
