//! LDAP group-gated authentication
//!
//! Login flow:
//! - pre-check against the cached group members and the whitelist
//! - manager bind and search for the user's DN and display name
//! - bind as the user to verify the password

mod client;
mod store;
mod types;

pub use client::{bounded, DirectoryConnector, DirectorySession, Ldap3Connector};
pub use store::DirectoryStore;
pub use types::*;
