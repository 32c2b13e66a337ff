//! Session gate
//!
//! Couples the configured [`CredentialStore`] with a client session. A
//! successful login stores the identity under
//! [`warden_core::SESSION_AUTH_KEY`]; every later request only checks that
//! marker and never calls the store again.

use std::sync::Arc;
use tracing::{error, info};
use warden_core::SESSION_AUTH_KEY;

use crate::error::StoreResult;
use crate::store::{CredentialStore, Credentials, FailureReason, ValidationOutcome};

/// Per-client session storage, provided by the web layer
pub trait SessionState: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn delete(&mut self, key: &str);
    /// End the session now instead of at the idle timeout
    fn expire(&mut self);
}

/// Result of an explicit login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    Success(String),
    Failure(FailureReason),
}

/// Request-level verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Granted(String),
    Denied,
}

impl AuthDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthDecision::Granted(_))
    }
}

#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn CredentialStore>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Validate `credentials` and mark the session on success
    ///
    /// A refused login leaves the session untouched.
    pub async fn login(
        &self,
        session: &mut dyn SessionState,
        credentials: &Credentials,
    ) -> StoreResult<LoginResult> {
        let outcome = self
            .store
            .validate(&credentials.username, &credentials.password)
            .await
            .map_err(|e| {
                error!(
                    "{} backend failed while validating {}: {}",
                    self.store.name(),
                    credentials.username,
                    e
                );
                e
            })?;

        match outcome {
            ValidationOutcome::Success(identity) => {
                let identity = if identity.is_empty() {
                    credentials.username.clone()
                } else {
                    identity
                };
                session.set(SESSION_AUTH_KEY, identity.clone());
                info!("Authenticated as {}", identity);
                Ok(LoginResult::Success(identity))
            }
            ValidationOutcome::Failure(reason) => {
                info!("Login failed for {}: {}", credentials.username, reason);
                Ok(LoginResult::Failure(reason))
            }
        }
    }

    /// Identity stored by an earlier login
    pub fn identity(&self, session: &dyn SessionState) -> Option<String> {
        session.get(SESSION_AUTH_KEY)
    }

    pub fn is_authenticated(&self, session: &dyn SessionState) -> bool {
        self.identity(session).is_some()
    }

    pub fn logout(&self, session: &mut dyn SessionState) {
        if let Some(identity) = self.identity(session) {
            info!("Logged out {}", identity);
        }
        session.delete(SESSION_AUTH_KEY);
        session.expire();
    }

    /// Log in when credentials were submitted, otherwise check the marker
    ///
    /// Submitted credentials decide on their own: a refused login is denied
    /// even when the session was already logged in.
    pub async fn authorize(
        &self,
        session: &mut dyn SessionState,
        credentials: Option<&Credentials>,
    ) -> StoreResult<AuthDecision> {
        if let Some(credentials) = credentials {
            return Ok(match self.login(session, credentials).await? {
                LoginResult::Success(identity) => AuthDecision::Granted(identity),
                LoginResult::Failure(_) => AuthDecision::Denied,
            });
        }

        Ok(match self.identity(session) {
            Some(identity) => AuthDecision::Granted(identity),
            None => AuthDecision::Denied,
        })
    }
}
