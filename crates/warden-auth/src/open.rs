//! Open authentication which accepts all user/password combinations
//!
//! Only to be used in debugging environments.

use async_trait::async_trait;
use tracing::warn;
use warden_core::{Error, Result};

use crate::error::StoreResult;
use crate::store::{CredentialStore, StoreContext, ValidationOutcome};

#[derive(Debug)]
pub struct OpenStore {
    _debug_only: (),
}

impl OpenStore {
    /// Create the store; refused unless the process runs in debug mode
    pub fn new(ctx: &StoreContext) -> Result<Self> {
        if !ctx.debug {
            return Err(Error::DebugOnly { backend: "open" });
        }

        warn!("Open authentication enabled: every login is accepted");
        Ok(Self { _debug_only: () })
    }
}

#[async_trait]
impl CredentialStore for OpenStore {
    fn name(&self) -> &'static str {
        "open"
    }

    async fn validate(&self, username: &str, _password: &str) -> StoreResult<ValidationOutcome> {
        Ok(ValidationOutcome::Success(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::WardenConfig;

    #[test]
    fn test_requires_debug() {
        let mut config = WardenConfig::default();
        for backend in ["open", "ldap", "pwd"] {
            config.auth.backend = backend.to_string();
            let ctx = StoreContext::new(config.clone(), false);
            let err = OpenStore::new(&ctx).unwrap_err();
            assert!(matches!(err, Error::DebugOnly { backend: "open" }));
        }
    }

    #[tokio::test]
    async fn test_accepts_everything() {
        let ctx = StoreContext::new(WardenConfig::default(), true);
        let store = OpenStore::new(&ctx).unwrap();

        let outcome = store.validate("alice", "").await.unwrap();
        assert_eq!(outcome, ValidationOutcome::Success("alice".to_string()));

        let outcome = store.validate("bob", "anything").await.unwrap();
        assert_eq!(outcome.identity(), Some("bob"));
    }
}
