//! Generated CRUD handlers

use super::binder::ResourceContext;
use super::descriptor::Operation;
use crate::core::auth::{AuthContext, AuthPolicy};
use crate::core::entity::{Record, apply_changes, new_record, writable_subset};
use crate::core::error::ApiResult;
use crate::core::predicate::Predicate;
use crate::core::query::QueryParams;
use crate::core::response::Reply;
use crate::server::handler::{Handler, RequestContext};
use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::marker::PhantomData;
use uuid::Uuid;

/// One generated operation on records of type `T`
pub struct CrudHandler<T> {
    operation: Operation,
    policy: AuthPolicy,
    ctx: ResourceContext,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> CrudHandler<T> {
    pub fn new(operation: Operation, policy: AuthPolicy, ctx: ResourceContext) -> Self {
        Self {
            operation,
            policy,
            ctx,
            _record: PhantomData,
        }
    }

    /// Administrators and public resources are not scoped to an owner
    fn unscoped(&self, auth: &AuthContext) -> bool {
        auth.is_admin() || self.policy == AuthPolicy::Public
    }

    async fn list(&self, req: &RequestContext) -> ApiResult<Reply<Vec<T>>> {
        let params: QueryParams = req.query()?;
        let pagination = params.pagination(
            self.ctx.pagination.default_limit,
            self.ctx.pagination.max_limit,
        )?;

        let listing = if self.unscoped(&req.auth) {
            self.ctx.store.list::<T>(Predicate::All, Some(pagination)).await?
        } else {
            let owner = req.auth.require_user()?;
            self.ctx.store.list_by_owner::<T>(owner, Some(pagination)).await?
        };

        Ok(
            Reply::ok(format!("{} retrieved", T::resource_plural()), listing.items)
                .with_pagination(pagination.meta(listing.total)),
        )
    }

    async fn get(&self, req: &RequestContext) -> ApiResult<Reply<T>> {
        let id = req.param_uuid("id")?;
        let owner = req.auth.user_id().unwrap_or(Uuid::nil());
        let record = self
            .ctx
            .store
            .get::<T>(id, owner, self.unscoped(&req.auth))
            .await?;

        Ok(Reply::ok(format!("{} retrieved", T::resource_name()), record))
    }

    async fn create(&self, req: &RequestContext) -> ApiResult<Reply<T>> {
        let owner = req.auth.require_user()?;
        let payload: Value = req.json()?;
        let record = new_record::<T>(writable_subset::<T>(&payload)?, owner)?;
        record.validate_fields()?;
        let created = self.ctx.store.create(&record).await?;

        tracing::info!(resource = T::resource_name(), id = %created.id(), %owner, "record created");
        Ok(Reply::created(format!("{} created", T::resource_name()), created))
    }

    /// Load a record the caller may modify; someone else's record is not found
    async fn load_for_write(&self, req: &RequestContext) -> ApiResult<T> {
        let actor = req.auth.require_user()?;
        let id = req.param_uuid("id")?;
        self.ctx.store.get::<T>(id, actor, req.auth.is_admin()).await
    }

    async fn update(&self, req: &RequestContext) -> ApiResult<Reply<T>> {
        let existing = self.load_for_write(req).await?;
        let payload: Value = req.json()?;
        let changed = apply_changes(&existing, writable_subset::<T>(&payload)?)?;
        changed.validate_fields()?;
        let saved = self.ctx.store.update(&changed).await?;

        Ok(Reply::ok(format!("{} updated", T::resource_name()), saved))
    }

    async fn delete(&self, req: &RequestContext) -> ApiResult<Reply<()>> {
        let existing = self.load_for_write(req).await?;
        self.ctx.store.delete(&existing).await?;

        tracing::info!(resource = T::resource_name(), id = %existing.id(), "record deleted");
        Ok(Reply::ok(format!("{} deleted", T::resource_name()), ()))
    }
}

#[async_trait]
impl<T: Record> Handler for CrudHandler<T> {
    async fn call(&self, req: RequestContext) -> Response {
        if let Err(e) = self.policy.enforce(&req.auth) {
            return e.into_response();
        }

        match self.operation {
            Operation::List => self.list(&req).await.into_response(),
            Operation::Get => self.get(&req).await.into_response(),
            Operation::Create => self.create(&req).await.into_response(),
            Operation::Update => self.update(&req).await.into_response(),
            Operation::Delete => self.delete(&req).await.into_response(),
        }
    }
}
