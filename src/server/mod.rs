//! Route registry, dispatcher and HTTP host
//!
//! Routes and middleware are collected in a [`RouteRegistry`] while the
//! application is being assembled (usually through [`ServerBuilder`]). The
//! [`Server`] freezes the registry into a read-only [`RouteTable`] and serves
//! it through axum.

pub mod builder;
pub mod handler;
pub mod host;
pub mod middleware;
pub mod pattern;
pub mod registry;

pub use builder::ServerBuilder;
pub use handler::{FnHandler, Handler, RequestContext, handler_fn};
pub use host::Server;
pub use middleware::{LoggingMiddleware, Middleware, Next, REQUEST_ID_HEADER};
pub use pattern::{PathParams, PathPattern};
pub use registry::{Resolution, RouteEntry, RouteRegistry, RouteTable};
