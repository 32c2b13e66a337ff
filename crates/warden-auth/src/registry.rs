//! Credential store registry
//!
//! Maps the configuration key of each backend to its constructor. The set is
//! filled once by [`StoreRegistry::builtin`]; looking up an unknown key is a
//! startup error.

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use warden_core::{Error, Result};

use crate::ldap::DirectoryStore;
use crate::open::OpenStore;
use crate::store::{CredentialStore, StoreContext};
use crate::unix::{PasswordFileStore, ShadowFileStore};

/// Builds one backend from the startup context
pub type StoreFactory = fn(StoreContext) -> BoxFuture<'static, Result<Arc<dyn CredentialStore>>>;

#[derive(Clone)]
pub struct StoreRegistry {
    factories: BTreeMap<&'static str, StoreFactory>,
}

impl StoreRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every backend shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("open", build_open);
        registry.register("pwd", build_pwd);
        registry.register("spwd", build_spwd);
        registry.register("ldap", build_ldap);
        registry
    }

    pub fn register(&mut self, key: &'static str, factory: StoreFactory) {
        self.factories.insert(key, factory);
    }

    /// Factory registered for `key`
    pub fn get(&self, key: &str) -> Result<StoreFactory> {
        self.factories
            .get(key)
            .copied()
            .ok_or_else(|| Error::unknown_backend(key, self.list_keys()))
    }

    /// Registered keys in sorted order
    pub fn list_keys(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Construct the backend registered for `key`
    pub async fn build(&self, key: &str, ctx: StoreContext) -> Result<Arc<dyn CredentialStore>> {
        let factory = self.get(key)?;
        let store = factory(ctx).await?;
        info!("Authentication backend {} ready", store.name());
        Ok(store)
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn build_open(ctx: StoreContext) -> BoxFuture<'static, Result<Arc<dyn CredentialStore>>> {
    Box::pin(async move {
        let store: Arc<dyn CredentialStore> = Arc::new(OpenStore::new(&ctx)?);
        Ok(store)
    })
}

fn build_pwd(_ctx: StoreContext) -> BoxFuture<'static, Result<Arc<dyn CredentialStore>>> {
    Box::pin(async move {
        let store: Arc<dyn CredentialStore> = Arc::new(PasswordFileStore::system()?);
        Ok(store)
    })
}

fn build_spwd(ctx: StoreContext) -> BoxFuture<'static, Result<Arc<dyn CredentialStore>>> {
    Box::pin(async move {
        let store: Arc<dyn CredentialStore> =
            Arc::new(ShadowFileStore::system(&ctx.config.unix.shadow_path)?);
        Ok(store)
    })
}

fn build_ldap(ctx: StoreContext) -> BoxFuture<'static, Result<Arc<dyn CredentialStore>>> {
    Box::pin(async move {
        let store: Arc<dyn CredentialStore> =
            Arc::new(DirectoryStore::connect(&ctx.config.ldap).await?);
        Ok(store)
    })
}
