//! Authentication for Warden
//!
//! Credential stores share one contract ([`CredentialStore`]) so the web layer
//! can validate a login without knowing where accounts live:
//!
//! - `open`: accepts everything, debug builds of the configuration only
//! - `pwd`: the Unix password database
//! - `spwd`: the Unix shadow database
//! - `ldap`: group-gated directory lookup with a manager bind
//!
//! The backend is chosen once at startup through the [`StoreRegistry`] and the
//! [`SessionGate`] records the result in the client's session.

pub mod error;
pub mod gate;
pub mod ldap;
pub mod open;
pub mod registry;
pub mod store;
pub mod unix;

pub use error::{StoreError, StoreResult};
pub use gate::{AuthDecision, LoginResult, SessionGate, SessionState};
pub use ldap::{DirectoryConnector, DirectorySession, DirectoryStore, Ldap3Connector};
pub use open::OpenStore;
pub use registry::{StoreFactory, StoreRegistry};
pub use store::{CredentialStore, Credentials, FailureReason, StoreContext, ValidationOutcome};
pub use unix::{PasswordFileStore, ShadowFileStore, ShadowFile, UserDatabase, UserEntry};

#[cfg(unix)]
pub use unix::SystemPasswd;
