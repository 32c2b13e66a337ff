//! Warden Core Library
//!
//! Configuration model and startup error types shared by the Warden crates.

pub mod config;
pub mod error;

pub use config::WardenConfig;
pub use error::{Error, Result};

/// Warden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend selected when neither the command line nor the configuration names one
pub const DEFAULT_BACKEND: &str = "ldap";

/// Session key holding the authenticated identity
pub const SESSION_AUTH_KEY: &str = "authenticated";
