//! Identity resolution
//!
//! An [`IdentityProvider`] owns credentials: it turns a bearer token into a
//! stable subject identifier and creates new identities at registration. The
//! [`AuthMiddleware`] combines it with the local user directory to attach an
//! [`AuthContext`](crate::core::auth::AuthContext) to every request.

pub mod memory;
pub mod middleware;

pub use memory::InMemoryIdentityProvider;
pub use middleware::{AuthMiddleware, Credential, bearer_token};

use crate::core::error::IdentityError;
use async_trait::async_trait;

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Verify an opaque credential and return the subject it belongs to
    async fn verify(&self, token: &str) -> Result<String, IdentityError>;

    /// Create a new identity and return its subject
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, IdentityError>;

    /// Undo a registration whose local user could not be created
    async fn rollback_registration(&self, subject: &str) -> Result<(), IdentityError>;
}
