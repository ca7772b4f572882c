//! Turns a record type into CRUD routes
//!
//! | Operation | Method        | Path               | Route name          |
//! |-----------|---------------|--------------------|---------------------|
//! | List      | `GET`         | `/{plural}`        | `{plural}.list`     |
//! | Get       | `GET`         | `/{plural}/{id}`   | `{plural}.get`      |
//! | Create    | `POST`        | `/{plural}`        | `{plural}.create`   |
//! | Update    | `PUT`/`PATCH` | `/{plural}/{id}`   | `{plural}.update`, `{plural}.patch` |
//! | Delete    | `DELETE`      | `/{plural}/{id}`   | `{plural}.delete`   |

use super::descriptor::{Operation, ResourceOptions};
use super::handlers::CrudHandler;
use crate::config::PaginationConfig;
use crate::core::entity::Record;
use crate::core::error::ApiResult;
use crate::core::store::EntityStore;
use crate::server::registry::RouteRegistry;
use axum::http::Method;

/// Shared state handed to every generated handler
#[derive(Clone)]
pub struct ResourceContext {
    pub store: EntityStore,
    pub pagination: PaginationConfig,
}

impl ResourceContext {
    pub fn new(store: EntityStore, pagination: PaginationConfig) -> Self {
        Self { store, pagination }
    }
}

/// Register the enabled operations of `T`
pub fn bind<T: Record>(
    registry: &mut RouteRegistry,
    ctx: &ResourceContext,
    options: &ResourceOptions,
) -> ApiResult<()> {
    let plural = T::resource_plural();
    let collection = format!("/{plural}");
    let member = format!("/{plural}/{{id}}");

    for operation in options.operations() {
        let policy = options.policy(operation);
        let handler = || CrudHandler::<T>::new(operation, policy, ctx.clone());
        let requires_auth = policy.requires_auth();

        match operation {
            Operation::List => registry.add_route(
                &collection,
                Method::GET,
                handler(),
                &format!("{plural}.list"),
                requires_auth,
            )?,
            Operation::Get => registry.add_route(
                &member,
                Method::GET,
                handler(),
                &format!("{plural}.get"),
                requires_auth,
            )?,
            Operation::Create => registry.add_route(
                &collection,
                Method::POST,
                handler(),
                &format!("{plural}.create"),
                requires_auth,
            )?,
            Operation::Update => {
                registry.add_route(
                    &member,
                    Method::PUT,
                    handler(),
                    &format!("{plural}.update"),
                    requires_auth,
                )?;
                registry.add_route(
                    &member,
                    Method::PATCH,
                    handler(),
                    &format!("{plural}.patch"),
                    requires_auth,
                )?;
            }
            Operation::Delete => registry.add_route(
                &member,
                Method::DELETE,
                handler(),
                &format!("{plural}.delete"),
                requires_auth,
            )?,
        }
    }

    Ok(())
}
