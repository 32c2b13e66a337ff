//! LDAP connections
//!
//! The store talks to the directory through [`DirectoryConnector`] and
//! [`DirectorySession`]; [`Ldap3Connector`] is the production implementation
//! on top of `ldap3`. Every network step is bounded by the configured timeout.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::ldap::types::{DirectoryEntry, DirectorySettings, SearchScope};

/// Opens directory connections
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(&self) -> StoreResult<Box<dyn DirectorySession>>;
}

/// One open directory connection
///
/// Callers must `unbind` every session they open, on every exit path.
#[async_trait]
pub trait DirectorySession: Send {
    /// Simple bind; returns the LDAP result code
    async fn simple_bind(&mut self, dn: &str, password: &str) -> StoreResult<u32>;

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> StoreResult<Vec<DirectoryEntry>>;

    async fn unbind(&mut self) -> StoreResult<()>;
}

/// Run `fut`, turning an elapsed `timeout` into [`StoreError::Timeout`]
pub async fn bounded<T, F>(operation: &'static str, timeout: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            seconds: timeout.as_secs(),
        }),
    }
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// Connector backed by `ldap3`
#[derive(Debug, Clone)]
pub struct Ldap3Connector {
    url: String,
    timeout: Duration,
    start_tls: bool,
}

impl Ldap3Connector {
    pub fn new(settings: &DirectorySettings) -> Self {
        Self {
            url: settings.server.clone(),
            timeout: settings.timeout,
            start_tls: settings.start_tls,
        }
    }
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(&self) -> StoreResult<Box<dyn DirectorySession>> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.start_tls);

        debug!("Connecting to LDAP server: {}", self.url);

        let (conn, ldap) = bounded("connect", self.timeout, async {
            LdapConnAsync::with_settings(settings, &self.url)
                .await
                .map_err(|e| StoreError::Directory(format!("Failed to connect to LDAP server: {}", e)))
        })
        .await?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection error: {}", e);
            }
        });

        Ok(Box::new(Ldap3Session {
            ldap,
            timeout: self.timeout,
        }))
    }
}

struct Ldap3Session {
    ldap: Ldap,
    timeout: Duration,
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> StoreResult<u32> {
        let ldap = &mut self.ldap;

        // ldap3 sends both values as UTF-8 octet strings
        bounded("bind", self.timeout, async move {
            ldap.simple_bind(dn, password)
                .await
                .map(|result| result.rc)
                .map_err(|e| StoreError::Directory(format!("Bind failed: {}", e)))
        })
        .await
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[&str],
    ) -> StoreResult<Vec<DirectoryEntry>> {
        let ldap = &mut self.ldap;
        let attrs = attrs.to_vec();

        debug!("Searching {} with filter: {}", base, filter);

        let (rs, _res) = bounded("search", self.timeout, async move {
            ldap.search(base, scope.into(), filter, attrs)
                .await
                .map_err(|e| StoreError::Directory(format!("Search failed: {}", e)))?
                .success()
                .map_err(|e| StoreError::Directory(format!("Search error: {}", e)))
        })
        .await?;

        Ok(rs
            .into_iter()
            .map(|result| {
                let entry = SearchEntry::construct(result);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }

    async fn unbind(&mut self) -> StoreResult<()> {
        let ldap = &mut self.ldap;

        bounded("unbind", self.timeout, async move {
            ldap.unbind()
                .await
                .map_err(|e| StoreError::Directory(format!("Unbind failed: {}", e)))
        })
        .await
    }
}
