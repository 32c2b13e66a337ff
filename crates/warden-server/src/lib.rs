//! Web front end for Warden
//!
//! Serves the login form, records successful logins in a cookie-backed
//! session and only lets logged-in sessions reach the registered pages.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod session;
pub mod template;

pub use error::WebError;
pub use server::{create_router, AppState, WardenServer};
pub use session::{Session, SessionStore};
