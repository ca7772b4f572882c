//! Bearer-token middleware
//!
//! The middleware never rejects a request. Missing, malformed and unknown
//! credentials all leave the request anonymous; routes that need an identity
//! reject it at dispatch time.

use super::IdentityProvider;
use crate::core::auth::AuthContext;
use crate::core::error::IdentityError;
use crate::resources::users::UserDirectory;
use crate::server::middleware::{Middleware, Next};
use async_trait::async_trait;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::Response;
use std::sync::Arc;

/// What the `Authorization` header carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    Missing,
    /// Present but not `Bearer <token>`
    Malformed,
    Bearer(&'a str),
}

/// Extract the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Credential<'_> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Credential::Missing;
    };
    let Ok(value) = value.to_str() else {
        return Credential::Malformed;
    };

    let mut parts = value.trim().splitn(2, ' ');
    match (parts.next(), parts.next().map(str::trim)) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Credential::Bearer(token)
        }
        _ => Credential::Malformed,
    }
}

/// Resolves `Authorization: Bearer` credentials to a local user
pub struct AuthMiddleware {
    provider: Arc<dyn IdentityProvider>,
    users: UserDirectory,
}

impl AuthMiddleware {
    pub fn new(provider: Arc<dyn IdentityProvider>, users: UserDirectory) -> Self {
        Self { provider, users }
    }

    /// Identity for a set of request headers, `Anonymous` on any failure
    pub async fn resolve(&self, headers: &HeaderMap) -> AuthContext {
        let token = match bearer_token(headers) {
            Credential::Missing => return AuthContext::Anonymous,
            Credential::Malformed => {
                tracing::debug!("malformed authorization header, continuing anonymously");
                return AuthContext::Anonymous;
            }
            Credential::Bearer(token) => token,
        };

        let subject = match self.provider.verify(token).await {
            Ok(subject) => subject,
            Err(IdentityError::InvalidCredential) => {
                tracing::debug!(provider = self.provider.name(), "credential rejected");
                return AuthContext::Anonymous;
            }
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "identity provider failed");
                return AuthContext::Anonymous;
            }
        };

        match self.users.find_by_subject(&subject).await {
            Ok(Some(user)) => AuthContext::for_user(user.id, user.is_admin),
            Ok(None) => {
                tracing::debug!(%subject, "no local user for subject");
                AuthContext::Anonymous
            }
            Err(e) => {
                tracing::warn!(error = %e, "local user lookup failed");
                AuthContext::Anonymous
            }
        }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, mut req: Request, next: Next<'_>) -> Response {
        let auth = self.resolve(req.headers()).await;
        req.extensions_mut().insert(auth);
        next.run(req).await
    }
}
