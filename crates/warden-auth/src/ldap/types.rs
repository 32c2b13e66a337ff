//! LDAP settings and group membership
//!
//! Settings are checked once when the store is built; a missing entry is a
//! startup error, not a login failure.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use warden_core::config::LdapConfigSection;
use warden_core::{Error, Result};

/// Placeholder substituted with the (escaped) username in `search_filter`
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// LDAP result code: success
pub const RC_SUCCESS: u32 = 0;
/// LDAP result code: invalidCredentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: insufficientAccessRights
pub const RC_INSUFFICIENT_ACCESS: u32 = 50;
/// LDAP result code: unwillingToPerform
pub const RC_UNWILLING_TO_PERFORM: u32 = 53;

/// Bind result codes that mean "these credentials may not log in"
pub fn is_credential_rejection(rc: u32) -> bool {
    matches!(
        rc,
        RC_INVALID_CREDENTIALS | RC_INSUFFICIENT_ACCESS | RC_UNWILLING_TO_PERFORM
    )
}

/// Search scope used by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    Subtree,
}

/// One search result: DN plus the requested attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// All values of `attr`; attribute names compare case-insensitively
    pub fn values(&self, attr: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attr))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, attr: &str) -> Option<&str> {
        self.values(attr).first().map(String::as_str)
    }
}

/// Validated `[ldap]` configuration
#[derive(Clone)]
pub struct DirectorySettings {
    pub server: String,
    pub manager_dn: String,
    pub manager_password: String,
    pub root_dn: String,
    pub group_dn: String,
    pub group_attr: String,
    pub search_filter: String,
    pub display_name: String,
    pub whitelist: Vec<String>,
    pub timeout: Duration,
    pub start_tls: bool,
}

impl fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("server", &self.server)
            .field("manager_dn", &self.manager_dn)
            .field("root_dn", &self.root_dn)
            .field("group_dn", &self.group_dn)
            .field("group_attr", &self.group_attr)
            .field("search_filter", &self.search_filter)
            .field("display_name", &self.display_name)
            .field("whitelist", &self.whitelist)
            .field("timeout", &self.timeout)
            .field("start_tls", &self.start_tls)
            .finish_non_exhaustive()
    }
}

fn required(value: &str, key: &'static str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(Error::MissingSetting {
            section: "ldap",
            key,
        });
    }
    Ok(value.to_string())
}

impl DirectorySettings {
    pub fn from_config(config: &LdapConfigSection) -> Result<Self> {
        let server = required(&config.server, "server")?;
        if !server.starts_with("ldap://")
            && !server.starts_with("ldaps://")
            && !server.starts_with("ldapi://")
        {
            return Err(Error::InvalidSetting(format!(
                "LDAP server URL must start with ldap://, ldaps:// or ldapi://: {}",
                server
            )));
        }

        let search_filter = required(&config.search_filter, "search_filter")?;
        if !search_filter.contains(USERNAME_PLACEHOLDER) {
            return Err(Error::InvalidSetting(format!(
                "LDAP search_filter must contain the {} placeholder",
                USERNAME_PLACEHOLDER
            )));
        }

        if config.timeout_seconds == 0 {
            return Err(Error::InvalidSetting(
                "LDAP timeout_seconds must be positive".to_string(),
            ));
        }

        Ok(Self {
            server,
            manager_dn: required(&config.manager_dn, "manager_dn")?,
            manager_password: required(&config.manager_password, "manager_password")?,
            root_dn: required(&config.root_dn, "root_dn")?,
            group_dn: required(&config.group_dn, "group_dn")?,
            group_attr: required(&config.group_attr, "group_attr")?,
            search_filter,
            display_name: required(&config.display_name, "display_name")?,
            whitelist: config
                .whitelist
                .as_deref()
                .map(parse_whitelist)
                .unwrap_or_default(),
            timeout: Duration::from_secs(config.timeout_seconds),
            start_tls: config.start_tls,
        })
    }

    /// Search filter for one user, with the username escaped per RFC 4515
    pub fn user_filter(&self, username: &str) -> String {
        self.search_filter
            .replace(USERNAME_PLACEHOLDER, &ldap3::ldap_escape(username))
    }

    /// Where to look for the group entry
    ///
    /// A `group_dn` written as a filter is searched below `root_dn`; anything
    /// else is read directly as the group's DN.
    pub fn group_search(&self) -> (&str, SearchScope, &str) {
        if self.group_dn.trim_start().starts_with('(') {
            (&self.root_dn, SearchScope::Subtree, &self.group_dn)
        } else {
            (&self.group_dn, SearchScope::Base, "(objectClass=*)")
        }
    }
}

/// Split a comma-separated whitelist; `\,` is a literal comma
pub fn parse_whitelist(raw: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&',') => {
                chars.next();
                current.push(',');
            }
            ',' => entries.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    entries.push(current);

    entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Users allowed to log in through the directory
///
/// Fetched once when the store is built and never refreshed: directory
/// changes take effect after a restart.
#[derive(Debug, Clone, Default)]
pub struct GroupMembership {
    members: HashSet<String>,
    whitelist: HashSet<String>,
}

impl GroupMembership {
    pub fn new(
        members: impl IntoIterator<Item = String>,
        whitelist: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            members: members.into_iter().collect(),
            whitelist: whitelist.into_iter().collect(),
        }
    }

    pub fn permits(&self, username: &str) -> bool {
        self.members.contains(username) || self.whitelist.contains(username)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn whitelist_count(&self) -> usize {
        self.whitelist.len()
    }
}
