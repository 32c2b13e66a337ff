//! Configuration for Warden
//!
//! Example:
//! ```toml
//! [server]
//! port = 8080
//! domain = "login.example.com"
//!
//! [auth]
//! backend = "ldap"
//!
//! [ldap]
//! server = "ldap://ldap.example.com:389"
//! manager_dn = "cn=manager,dc=example,dc=com"
//! manager_password = "secret"
//! root_dn = "dc=example,dc=com"
//! group_dn = "(cn=developers)"
//! group_attr = "memberUid"
//! search_filter = "(uid={username})"
//! display_name = "cn"
//! whitelist = "alice, bob"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub unix: UnixConfig,

    #[serde(default)]
    pub ldap: LdapConfigSection,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::ConfigRead(format!("{}: {}", path, e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::ConfigParse(e.to_string()))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override settings from `WARDEN_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("WARDEN_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Ok(port) = std::env::var("WARDEN_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(domain) = std::env::var("WARDEN_DOMAIN") {
            self.server.domain = Some(domain);
        }
        if let Ok(backend) = std::env::var("WARDEN_AUTH") {
            self.auth.backend = backend;
        }
        if let Ok(level) = std::env::var("WARDEN_LOG_LEVEL") {
            self.logging.level = level;
        }

        // Directory credentials usually come from the environment
        if let Ok(server) = std::env::var("WARDEN_LDAP_SERVER") {
            self.ldap.server = server;
        }
        if let Ok(dn) = std::env::var("WARDEN_LDAP_MANAGER_DN") {
            self.ldap.manager_dn = dn;
        }
        if let Ok(password) = std::env::var("WARDEN_LDAP_MANAGER_PASSWORD") {
            self.ldap.manager_password = password;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Expected `Host` header; requests for other hosts are refused
    pub domain: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            domain: None,
        }
    }
}

impl ServerConfig {
    /// Host header value that requests must carry, if host validation is on
    pub fn expected_host(&self) -> Option<String> {
        let domain = self.domain.as_ref()?;

        if !domain.contains(':') && self.port != 80 {
            Some(format!("{}:{}", domain, self.port))
        } else {
            Some(domain.clone())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Registry key of the credential store
    pub backend: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            backend: crate::DEFAULT_BACKEND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnixConfig {
    /// Shadow-format password file
    pub shadow_path: PathBuf,
}

impl Default for UnixConfig {
    fn default() -> Self {
        Self {
            shadow_path: PathBuf::from("/etc/shadow"),
        }
    }
}

/// LDAP group-gated authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfigSection {
    /// LDAP server URL (ldap:// or ldaps://)
    #[serde(default)]
    pub server: String,

    /// Service account used for searches
    #[serde(default)]
    pub manager_dn: String,

    #[serde(default)]
    pub manager_password: String,

    /// Base DN for user and group searches
    #[serde(default)]
    pub root_dn: String,

    /// Group filter such as `(cn=developers)`, or the DN of the group entry
    #[serde(default)]
    pub group_dn: String,

    /// Attribute of the group entry listing its members
    #[serde(default)]
    pub group_attr: String,

    /// User search filter, `{username}` is substituted
    #[serde(default = "default_search_filter")]
    pub search_filter: String,

    /// Attribute holding the user's display name
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Comma-separated usernames allowed in addition to the group; `\,` escapes a comma
    #[serde(default)]
    pub whitelist: Option<String>,

    /// Timeout for each directory operation in seconds
    #[serde(default = "default_ldap_timeout")]
    pub timeout_seconds: u64,

    /// Use STARTTLS
    #[serde(default)]
    pub start_tls: bool,
}

fn default_search_filter() -> String {
    "(uid={username})".to_string()
}

fn default_display_name() -> String {
    "cn".to_string()
}

fn default_ldap_timeout() -> u64 {
    10
}

impl Default for LdapConfigSection {
    fn default() -> Self {
        Self {
            server: String::new(),
            manager_dn: String::new(),
            manager_password: String::new(),
            root_dn: String::new(),
            group_dn: String::new(),
            group_attr: String::new(),
            search_filter: default_search_filter(),
            display_name: default_display_name(),
            whitelist: None,
            timeout_seconds: default_ldap_timeout(),
            start_tls: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Idle time after which a session is discarded
    pub timeout_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "warden_session".to_string(),
            timeout_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WardenConfig::default();

        assert_eq!(config.auth.backend, "ldap");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.unix.shadow_path, PathBuf::from("/etc/shadow"));
        assert_eq!(config.ldap.search_filter, "(uid={username})");
        assert_eq!(config.ldap.timeout_seconds, 10);
        assert!(config.ldap.whitelist.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = WardenConfig::from_toml(
            r#"
            [auth]
            backend = "pwd"

            [ldap]
            server = "ldap://localhost:389"
            group_attr = "memberUid"
            whitelist = "alice, bob"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.backend, "pwd");
        assert_eq!(config.ldap.server, "ldap://localhost:389");
        assert_eq!(config.ldap.group_attr, "memberUid");
        assert_eq!(config.ldap.whitelist.as_deref(), Some("alice, bob"));
        // Untouched fields keep their defaults
        assert_eq!(config.ldap.display_name, "cn");
        assert_eq!(config.session.cookie_name, "warden_session");
    }

    #[test]
    fn test_parse_error() {
        let err = WardenConfig::from_toml("[server]\nport = \"eighty\"").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }

    #[test]
    fn test_expected_host() {
        let mut server = ServerConfig::default();
        assert_eq!(server.expected_host(), None);

        server.domain = Some("login.example.com".to_string());
        assert_eq!(server.expected_host().as_deref(), Some("login.example.com:8080"));

        server.port = 80;
        assert_eq!(server.expected_host().as_deref(), Some("login.example.com"));

        server.port = 8080;
        server.domain = Some("login.example.com:443".to_string());
        assert_eq!(server.expected_host().as_deref(), Some("login.example.com:443"));
    }
}
