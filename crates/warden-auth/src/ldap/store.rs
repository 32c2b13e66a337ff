//! LDAP group-based credential store
//!
//! Two bind identities are involved: the manager account, used for the group
//! fetch and user searches, and the user's own credentials, used only for
//! the final verification bind.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_core::config::LdapConfigSection;
use warden_core::{Error, Result};

use crate::error::{StoreError, StoreResult};
use crate::ldap::client::{DirectoryConnector, DirectorySession, Ldap3Connector};
use crate::ldap::types::{
    is_credential_rejection, DirectorySettings, GroupMembership, SearchScope, RC_SUCCESS,
};
use crate::store::{CredentialStore, FailureReason, ValidationOutcome};

pub struct DirectoryStore {
    settings: DirectorySettings,
    connector: Arc<dyn DirectoryConnector>,
    membership: GroupMembership,
}

impl DirectoryStore {
    /// Build the store against the configured server
    pub async fn connect(config: &LdapConfigSection) -> Result<Self> {
        let settings = DirectorySettings::from_config(config)?;
        let connector = Arc::new(Ldap3Connector::new(&settings));
        Self::with_connector(settings, connector).await
    }

    /// Build the store and cache the group membership
    ///
    /// Fails when the group cannot be fetched.
    pub async fn with_connector(
        settings: DirectorySettings,
        connector: Arc<dyn DirectoryConnector>,
    ) -> Result<Self> {
        info!("Retrieving LDAP group list using manager DN...");

        let members = fetch_group_members(&settings, connector.as_ref())
            .await
            .map_err(|e| Error::BackendInit(format!("LDAP group retrieval failed: {}", e)))?;

        let membership = GroupMembership::new(members, settings.whitelist.iter().cloned());
        info!(
            members = membership.member_count(),
            whitelisted = membership.whitelist_count(),
            "LDAP group membership cached"
        );

        Ok(Self {
            settings,
            connector,
            membership,
        })
    }

    pub fn membership(&self) -> &GroupMembership {
        &self.membership
    }

    /// DN and display name of `username`, via a manager search
    async fn resolve_user(&self, username: &str) -> StoreResult<Option<(String, String)>> {
        let mut session = self.connector.connect().await?;
        let result = self.lookup_user(session.as_mut(), username).await;
        release(session).await;
        result
    }

    async fn lookup_user(
        &self,
        session: &mut dyn DirectorySession,
        username: &str,
    ) -> StoreResult<Option<(String, String)>> {
        manager_bind(&self.settings, session).await?;

        let filter = self.settings.user_filter(username);
        let entries = session
            .search(
                &self.settings.root_dn,
                SearchScope::Subtree,
                &filter,
                &[self.settings.display_name.as_str()],
            )
            .await?;

        Ok(entries.into_iter().next().map(|entry| {
            let display_name = entry
                .first(&self.settings.display_name)
                .filter(|name| !name.is_empty())
                .unwrap_or(username)
                .to_string();
            (entry.dn, display_name)
        }))
    }

    /// Bind as the user; `Ok(false)` when the directory rejects the password
    async fn verify_bind(&self, user_dn: &str, password: &str) -> StoreResult<bool> {
        let mut session = self.connector.connect().await?;
        let result = session.simple_bind(user_dn, password).await;
        release(session).await;

        match result? {
            RC_SUCCESS => Ok(true),
            rc if is_credential_rejection(rc) => {
                debug!("User bind for {} rejected with code: {}", user_dn, rc);
                Ok(false)
            }
            rc => Err(StoreError::Directory(format!(
                "User bind failed with code: {}",
                rc
            ))),
        }
    }
}

#[async_trait]
impl CredentialStore for DirectoryStore {
    fn name(&self) -> &'static str {
        "ldap"
    }

    async fn validate(&self, username: &str, password: &str) -> StoreResult<ValidationOutcome> {
        if !self.membership.permits(username) {
            debug!("User {} not in group", username);
            return Ok(ValidationOutcome::Failure(FailureReason::NotAuthorized));
        }

        let (user_dn, display_name) = match self.resolve_user(username).await? {
            Some(found) => found,
            None => return Ok(ValidationOutcome::Failure(FailureReason::UserNotFound)),
        };

        debug!("Found user DN: {}", user_dn);

        // An empty simple bind is an anonymous bind and would always succeed
        if password.is_empty() {
            return Ok(ValidationOutcome::Failure(FailureReason::InvalidCredentials));
        }

        if self.verify_bind(&user_dn, password).await? {
            Ok(ValidationOutcome::Success(display_name))
        } else {
            Ok(ValidationOutcome::Failure(FailureReason::InvalidCredentials))
        }
    }
}

async fn manager_bind(
    settings: &DirectorySettings,
    session: &mut dyn DirectorySession,
) -> StoreResult<()> {
    let rc = session
        .simple_bind(&settings.manager_dn, &settings.manager_password)
        .await?;

    if rc != RC_SUCCESS {
        return Err(StoreError::Directory(format!(
            "Manager bind failed with code: {}",
            rc
        )));
    }
    Ok(())
}

async fn fetch_group_members(
    settings: &DirectorySettings,
    connector: &dyn DirectoryConnector,
) -> StoreResult<Vec<String>> {
    let mut session = connector.connect().await?;
    let result = read_group(settings, session.as_mut()).await;
    release(session).await;
    result
}

async fn read_group(
    settings: &DirectorySettings,
    session: &mut dyn DirectorySession,
) -> StoreResult<Vec<String>> {
    manager_bind(settings, session).await?;

    let (base, scope, filter) = settings.group_search();
    let entries = session
        .search(base, scope, filter, &[settings.group_attr.as_str()])
        .await?;

    let group = entries.into_iter().next().ok_or_else(|| {
        StoreError::Directory(format!("Group {} not found under {}", filter, base))
    })?;

    // A directory never returns an attribute without values, so an empty
    // list means the group entry lacks the attribute altogether
    let members = group.values(&settings.group_attr);
    if members.is_empty() {
        return Err(StoreError::Directory(format!(
            "Group {} has no attribute {}",
            group.dn, settings.group_attr
        )));
    }

    Ok(members.to_vec())
}

async fn release(mut session: Box<dyn DirectorySession>) {
    if let Err(e) = session.unbind().await {
        warn!("Failed to unbind LDAP connection: {}", e);
    }
}
