//! Credential store contract

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use warden_core::WardenConfig;

use crate::error::StoreResult;

/// Username and password submitted with a login form
///
/// Never stored; dropped after a single validation.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Why a login was refused
///
/// The end user only ever sees a generic failure; the reason goes to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Not present in the local account database
    UnknownUser,
    /// Password field holds a locked-account marker
    AccountDisabled,
    /// Wrong password
    InvalidCredentials,
    /// Neither in the directory group nor in the whitelist
    NotAuthorized,
    /// Authorized, but the directory search found no entry
    UserNotFound,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::UnknownUser => "user does not exist",
            FailureReason::AccountDisabled => "account disabled",
            FailureReason::InvalidCredentials => "invalid credentials",
            FailureReason::NotAuthorized => "not authorized",
            FailureReason::UserNotFound => "user not found",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of a single validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Credentials accepted; carries the displayable identity
    Success(String),
    /// Credentials refused
    Failure(FailureReason),
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success(_))
    }

    pub fn identity(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Success(identity) => Some(identity),
            ValidationOutcome::Failure(_) => None,
        }
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            ValidationOutcome::Success(_) => None,
            ValidationOutcome::Failure(reason) => Some(*reason),
        }
    }
}

/// A configured credential source
///
/// Implementations are immutable after construction and shared between
/// requests. `validate` may block on I/O internally but never mutates the
/// backend. Infrastructure faults are returned as `Err`, refused credentials
/// as `Ok(ValidationOutcome::Failure(_))`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Registry key of this backend
    fn name(&self) -> &'static str;

    /// Validate the login of a user with the given password
    async fn validate(&self, username: &str, password: &str) -> StoreResult<ValidationOutcome>;
}

/// Everything a store factory may consult while constructing a backend
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Process-wide debug flag
    pub debug: bool,
    pub config: Arc<WardenConfig>,
}

impl StoreContext {
    pub fn new(config: WardenConfig, debug: bool) -> Self {
        Self {
            debug,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "hunter2");
        let rendered = format!("{:?}", creds);

        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = ValidationOutcome::Success("Alice Example".to_string());
        assert!(ok.is_success());
        assert_eq!(ok.identity(), Some("Alice Example"));
        assert_eq!(ok.reason(), None);

        let failed = ValidationOutcome::Failure(FailureReason::AccountDisabled);
        assert!(!failed.is_success());
        assert_eq!(failed.identity(), None);
        assert_eq!(failed.reason(), Some(FailureReason::AccountDisabled));
        assert_eq!(FailureReason::AccountDisabled.to_string(), "account disabled");
    }
}
