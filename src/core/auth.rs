//! Request identity and access policies
//!
//! The auth middleware resolves a bearer credential to an [`AuthContext`] and
//! stores it in the request extensions. Handlers read it back and check it
//! against the [`AuthPolicy`] of the operation being performed.

use super::error::{ApiError, ApiResult};
use uuid::Uuid;

/// Identity attached to a single in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthContext {
    /// Authenticated local user
    User { user_id: Uuid },

    /// Local user exempt from ownership scoping
    Admin { user_id: Uuid },

    /// No credential, or one that could not be resolved
    #[default]
    Anonymous,
}

impl AuthContext {
    /// Context for a resolved local user
    pub fn for_user(user_id: Uuid, is_admin: bool) -> Self {
        if is_admin {
            AuthContext::Admin { user_id }
        } else {
            AuthContext::User { user_id }
        }
    }

    /// Check if context represents an admin
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthContext::Admin { .. })
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthContext::Anonymous)
    }

    /// Get user_id if available
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id } | AuthContext::Admin { user_id } => Some(*user_id),
            AuthContext::Anonymous => None,
        }
    }

    /// The acting user's id, or `Unauthenticated`
    pub fn require_user(&self) -> ApiResult<Uuid> {
        self.user_id().ok_or(ApiError::Unauthenticated)
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Anonymous callers allowed
    Public,

    /// Any resolved identity
    Authenticated,

    /// Administrators only
    AdminOnly,
}

impl AuthPolicy {
    /// Whether the route carrying this policy needs a resolved identity
    pub fn requires_auth(&self) -> bool {
        !matches!(self, AuthPolicy::Public)
    }

    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,
            AuthPolicy::Authenticated => context.is_authenticated(),
            AuthPolicy::AdminOnly => context.is_admin(),
        }
    }

    /// Like [`check`](Self::check) but yields the matching taxonomy error
    pub fn enforce(&self, context: &AuthContext) -> ApiResult<()> {
        if self.check(context) {
            Ok(())
        } else if !context.is_authenticated() {
            Err(ApiError::Unauthenticated)
        } else {
            Err(ApiError::unauthorized("administrator access required"))
        }
    }
}
