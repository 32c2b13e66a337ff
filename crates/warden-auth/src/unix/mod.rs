//! Authentication based on Unix password databases
//!
//! Both stores run the same check, see [`check_login`]:
//! 1. fetch the crypted password (`pwd` from passwd, `spwd` from shadow)
//! 2. refuse lock markers without hashing
//! 3. crypt the submitted password with the stored salt and compare
//! 4. resolve a display name from the passwd GECOS field

mod crypt;
mod database;

pub use database::{ShadowFile, UserDatabase, UserEntry};

#[cfg(unix)]
pub use database::SystemPasswd;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use warden_core::Result;

use crate::error::StoreResult;
use crate::store::{CredentialStore, FailureReason, ValidationOutcome};

/// Password fields that mark an account as unable to log in with a password
pub const DISABLED_PASSWORDS: [&str; 4] = ["", "x", "*", "********"];

/// Whether the stored value is a lock marker rather than a hash
pub fn is_disabled(crypted_password: &str) -> bool {
    // shadow(5) locks an account by prefixing its hash with '!'
    DISABLED_PASSWORDS.contains(&crypted_password) || crypted_password.starts_with('!')
}

/// Compare `password` against a stored crypt(3) value
pub fn verify_crypted(
    username: &str,
    password: &str,
    crypted_password: &str,
) -> std::result::Result<(), FailureReason> {
    if is_disabled(crypted_password) {
        debug!("Password is disabled for {}", username);
        return Err(FailureReason::AccountDisabled);
    }

    let hashed = if pwhash_supports(crypted_password) {
        pwhash::unix::crypt(password, crypted_password).ok()
    } else {
        crypt::host_crypt(password, crypted_password)
    };

    match hashed {
        Some(hash) if hash == crypted_password => Ok(()),
        Some(_) => Err(FailureReason::InvalidCredentials),
        None => {
            warn!("Stored password of {} has an unsupported format", username);
            Err(FailureReason::InvalidCredentials)
        }
    }
}

/// Formats `pwhash` implements itself; everything else goes to the host
fn pwhash_supports(crypted_password: &str) -> bool {
    const PREFIXES: [&str; 9] = [
        "$1$", "$2a$", "$2b$", "$2y$", "$5$", "$6$", "$sha1$", "$md5", "_",
    ];

    PREFIXES.iter().any(|p| crypted_password.starts_with(p))
        || (crypted_password.len() == 13 && !crypted_password.starts_with('$'))
}

/// Display name from the GECOS field, up to the first comma
///
/// Falls back to the username when the account has no usable full name.
pub fn display_name(accounts: &dyn UserDatabase, username: &str) -> String {
    let gecos = match accounts.lookup(username) {
        Ok(Some(entry)) => entry.gecos,
        Ok(None) => None,
        Err(e) => {
            debug!("No display name for {}: {}", username, e);
            None
        }
    };

    gecos
        .as_deref()
        .and_then(|g| g.split(',').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| username.to_string())
}

/// Shared validation for the Unix stores
fn check_login(
    passwords: &dyn UserDatabase,
    accounts: &dyn UserDatabase,
    username: &str,
    password: &str,
) -> StoreResult<ValidationOutcome> {
    let entry = match passwords.lookup(username)? {
        Some(entry) => entry,
        None => {
            debug!("User {} does not exist", username);
            return Ok(ValidationOutcome::Failure(FailureReason::UnknownUser));
        }
    };

    if let Err(reason) = verify_crypted(username, password, &entry.crypted_password) {
        return Ok(ValidationOutcome::Failure(reason));
    }

    Ok(ValidationOutcome::Success(display_name(accounts, username)))
}

/// Run [`check_login`] on the blocking pool
async fn check_login_blocking(
    passwords: Arc<dyn UserDatabase>,
    accounts: Arc<dyn UserDatabase>,
    username: &str,
    password: &str,
) -> StoreResult<ValidationOutcome> {
    let username = username.to_string();
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        check_login(passwords.as_ref(), accounts.as_ref(), &username, &password)
    })
    .await?
}

/// Authentication using the `/etc/passwd` database
pub struct PasswordFileStore {
    accounts: Arc<dyn UserDatabase>,
}

impl PasswordFileStore {
    pub fn new(accounts: Arc<dyn UserDatabase>) -> Self {
        Self { accounts }
    }

    /// Store backed by the host's passwd database
    #[cfg(unix)]
    pub fn system() -> Result<Self> {
        Ok(Self::new(Arc::new(SystemPasswd::open()?)))
    }

    #[cfg(not(unix))]
    pub fn system() -> Result<Self> {
        Err(warden_core::Error::PlatformUnsupported(
            "pwd not available on this platform".to_string(),
        ))
    }
}

#[async_trait]
impl CredentialStore for PasswordFileStore {
    fn name(&self) -> &'static str {
        "pwd"
    }

    async fn validate(&self, username: &str, password: &str) -> StoreResult<ValidationOutcome> {
        check_login_blocking(self.accounts.clone(), self.accounts.clone(), username, password)
            .await
    }
}

/// Authentication using the `/etc/shadow` privileged database
pub struct ShadowFileStore {
    shadow: Arc<dyn UserDatabase>,
    accounts: Arc<dyn UserDatabase>,
}

impl ShadowFileStore {
    /// `shadow` supplies the hashes, `accounts` the display names
    pub fn new(shadow: Arc<dyn UserDatabase>, accounts: Arc<dyn UserDatabase>) -> Self {
        Self { shadow, accounts }
    }

    /// Store backed by the host's shadow file and passwd database
    #[cfg(unix)]
    pub fn system(shadow_path: &Path) -> Result<Self> {
        let shadow = ShadowFile::open(shadow_path)?;
        Ok(Self::new(Arc::new(shadow), Arc::new(SystemPasswd::open()?)))
    }

    #[cfg(not(unix))]
    pub fn system(_shadow_path: &Path) -> Result<Self> {
        Err(warden_core::Error::PlatformUnsupported(
            "spwd not available on this platform".to_string(),
        ))
    }
}

#[async_trait]
impl CredentialStore for ShadowFileStore {
    fn name(&self) -> &'static str {
        "spwd"
    }

    async fn validate(&self, username: &str, password: &str) -> StoreResult<ValidationOutcome> {
        check_login_blocking(self.shadow.clone(), self.accounts.clone(), username, password)
            .await
    }
}
