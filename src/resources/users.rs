//! Local users, the user directory and the registration endpoints

use super::descriptor::{Operation, ResourceOptions};
use crate::auth::IdentityProvider;
use crate::config::AuthConfig;
use crate::core::entity::Record;
use crate::core::error::{ApiError, ApiResult};
use crate::core::predicate::Predicate;
use crate::core::response::Reply;
use crate::core::store::EntityStore;
use crate::server::handler::{Handler, RequestContext};
use async_trait::async_trait;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Local identity record, one per external subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocalUser {
    pub id: Uuid,

    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[validate(email(message = "email is not valid"))]
    pub email: String,

    /// Subject assigned by the identity provider
    pub external_id: String,

    #[serde(default)]
    pub is_admin: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalUser {
    pub fn new(name: &str, email: &str, external_id: &str, is_admin: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            external_id: external_id.to_string(),
            is_admin,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for LocalUser {
    fn resource_name() -> &'static str {
        "user"
    }

    /// A user owns their own record
    fn owner_field() -> &'static str {
        "id"
    }

    fn writable_fields() -> &'static [&'static str] {
        &["name"]
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.id
    }

    fn validate_fields(&self) -> ApiResult<()> {
        self.validate().map_err(|e| ApiError::validation(e.to_string()))
    }
}

/// Options the builder binds the `users` resource with
pub fn users_resource_options() -> ResourceOptions {
    ResourceOptions::default()
        .without(Operation::Create)
        .without(Operation::Delete)
}

/// Maps identity-provider subjects to local users
#[derive(Clone)]
pub struct UserDirectory {
    store: EntityStore,
}

impl UserDirectory {
    pub fn new(store: EntityStore) -> Self {
        Self { store }
    }

    pub async fn find_by_subject(&self, subject: &str) -> ApiResult<Option<LocalUser>> {
        self.store
            .find_one(&Predicate::eq("external_id", subject)?)
            .await
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<LocalUser> {
        self.store.get(id, id, false).await
    }

    /// Insert a user; a subject can only ever be registered once
    pub async fn create(&self, user: &LocalUser) -> ApiResult<LocalUser> {
        if self.find_by_subject(&user.external_id).await?.is_some() {
            return Err(ApiError::validation("user is already registered"));
        }
        self.store.create(user).await
    }
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUserInput {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[validate(email(message = "email is not valid"))]
    pub email: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Creates the external identity, then the local user
pub struct RegisterHandler {
    provider: Arc<dyn IdentityProvider>,
    users: UserDirectory,
    auth: AuthConfig,
}

impl RegisterHandler {
    pub fn new(provider: Arc<dyn IdentityProvider>, users: UserDirectory, auth: AuthConfig) -> Self {
        Self {
            provider,
            users,
            auth,
        }
    }

    async fn register(&self, req: RequestContext) -> ApiResult<Reply<LocalUser>> {
        let input: RegisterUserInput = req.json()?;
        input
            .validate()
            .map_err(|e| ApiError::validation(e.to_string()))?;

        let email = input.email.trim().to_lowercase();
        let subject = self
            .provider
            .register(input.name.trim(), &email, &input.password)
            .await?;

        let user = LocalUser::new(
            input.name.trim(),
            &email,
            &subject,
            self.auth.is_admin_email(&email),
        );

        match self.users.create(&user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, admin = user.is_admin, "user registered");
                Ok(Reply::created("user registered", user))
            }
            Err(err) => {
                if let Err(rollback) = self.provider.rollback_registration(&subject).await {
                    tracing::error!(%subject, error = %rollback, "registration rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl Handler for RegisterHandler {
    async fn call(&self, req: RequestContext) -> Response {
        self.register(req).await.into_response()
    }
}

/// `GET /auth/me`
pub struct MeHandler {
    users: UserDirectory,
}

impl MeHandler {
    pub fn new(users: UserDirectory) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Handler for MeHandler {
    async fn call(&self, req: RequestContext) -> Response {
        let result = match req.auth.require_user() {
            Ok(id) => self
                .users
                .get(id)
                .await
                .map(|user| Reply::ok("user retrieved", user)),
            Err(e) => Err(e),
        };
        result.into_response()
    }
}
