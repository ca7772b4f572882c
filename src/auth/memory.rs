//! In-process identity provider for development and tests

use super::IdentityProvider;
use crate::core::error::IdentityError;
use anyhow::anyhow;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Account {
    subject: String,
    password_hash: String,
}

/// Identity provider keeping accounts and session tokens in memory
///
/// Passwords are stored as argon2 hashes. [`login`](Self::login) issues an
/// opaque token that [`verify`](IdentityProvider::verify) resolves until it
/// is revoked.
pub struct InMemoryIdentityProvider {
    /// Accounts keyed by lowercase email
    accounts: RwLock<HashMap<String, Account>>,

    /// Session token -> subject
    sessions: RwLock<HashMap<String, String>>,

    hasher: Argon2<'static>,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        // Light cost parameters; this provider is not meant for production traffic
        let params = Params::new(8 * 1024, 1, 1, None).unwrap_or_default();
        Self {
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Exchange email and password for a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        let account = {
            let accounts = self.accounts.read().map_err(poisoned)?;
            accounts.get(&email.trim().to_lowercase()).cloned()
        };

        let account = account.ok_or(IdentityError::InvalidCredential)?;
        if !self.verify_password(&account.password_hash, password) {
            return Err(IdentityError::InvalidCredential);
        }

        let token = Uuid::new_v4().simple().to_string();
        self.sessions
            .write()
            .map_err(poisoned)?
            .insert(token.clone(), account.subject);
        Ok(token)
    }

    /// Invalidate a session token; returns whether it existed
    pub fn revoke(&self, token: &str) -> Result<bool, IdentityError> {
        Ok(self.sessions.write().map_err(poisoned)?.remove(token).is_some())
    }

    fn hash_password(&self, password: &str) -> Result<String, IdentityError> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(|e| anyhow!("{e}"))?;
        let phc = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("{e}"))?
            .to_string();
        Ok(phc)
    }

    fn verify_password(&self, hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> IdentityError {
    IdentityError::Unavailable("identity store lock poisoned".to_string())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn verify(&self, token: &str) -> Result<String, IdentityError> {
        self.sessions
            .read()
            .map_err(poisoned)?
            .get(token)
            .cloned()
            .ok_or(IdentityError::InvalidCredential)
    }

    async fn register(
        &self,
        _name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, IdentityError> {
        let email = email.trim().to_lowercase();
        let password_hash = self.hash_password(password)?;
        let subject = Uuid::new_v4().to_string();

        let mut accounts = self.accounts.write().map_err(poisoned)?;
        if accounts.contains_key(&email) {
            return Err(IdentityError::AlreadyRegistered(email));
        }
        accounts.insert(
            email,
            Account {
                subject: subject.clone(),
                password_hash,
            },
        );
        Ok(subject)
    }

    async fn rollback_registration(&self, subject: &str) -> Result<(), IdentityError> {
        self.accounts
            .write()
            .map_err(poisoned)?
            .retain(|_, account| account.subject != subject);
        self.sessions
            .write()
            .map_err(poisoned)?
            .retain(|_, owner| owner != subject);
        Ok(())
    }
}
