//! Unix account databases
//!
//! The stores never touch the OS directly; they receive a [`UserDatabase`] at
//! construction so a host without the database fails at startup rather than
//! on the first login.

use std::path::PathBuf;
use warden_core::{Error, Result};

use crate::error::{StoreError, StoreResult};

/// Password database record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    /// crypt(3) string including algorithm and salt, or a lock marker
    pub crypted_password: String,
    /// GECOS field, when the database carries one
    pub gecos: Option<String>,
}

/// Read-only lookup of one account by name
pub trait UserDatabase: Send + Sync {
    fn lookup(&self, username: &str) -> StoreResult<Option<UserEntry>>;
}

/// The general-purpose user database (`getpwnam`)
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct SystemPasswd;

#[cfg(unix)]
impl SystemPasswd {
    pub fn open() -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(unix)]
impl UserDatabase for SystemPasswd {
    fn lookup(&self, username: &str) -> StoreResult<Option<UserEntry>> {
        if username.is_empty() {
            return Ok(None);
        }

        match nix::unistd::User::from_name(username) {
            Ok(Some(user)) => Ok(Some(UserEntry {
                crypted_password: user.passwd.to_string_lossy().into_owned(),
                gecos: Some(user.gecos.to_string_lossy().into_owned()),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Database(format!("getpwnam({}) failed: {}", username, e))),
        }
    }
}

/// Shadow-format password file, re-read on every lookup
#[derive(Debug, Clone)]
pub struct ShadowFile {
    path: PathBuf,
}

impl ShadowFile {
    /// Bind to `path`; fails when the file cannot be opened for reading
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        std::fs::File::open(&path).map_err(|e| {
            Error::PlatformUnsupported(format!(
                "shadow database {} is not readable: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self { path })
    }
}

impl UserDatabase for ShadowFile {
    fn lookup(&self, username: &str) -> StoreResult<Option<UserEntry>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            StoreError::Database(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        Ok(find_shadow_entry(&content, username))
    }
}

/// Find `username` in shadow(5) content (`name:password:lastchg:...`)
fn find_shadow_entry(content: &str, username: &str) -> Option<UserEntry> {
    if username.is_empty() {
        return None;
    }

    content
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('+') && !line.starts_with('-'))
        .find_map(|line| {
            let mut fields = line.splitn(3, ':');
            let name = fields.next()?;
            let password = fields.next()?;

            (name == username).then(|| UserEntry {
                crypted_password: password.to_string(),
                gecos: None,
            })
        })
}
