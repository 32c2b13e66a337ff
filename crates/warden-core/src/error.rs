//! Error types for Warden
//!
//! Everything in here is a startup (configuration) error: the process must
//! not start serving when one of these is returned.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication type {key} is not supported (supported: {supported})")]
    UnknownBackend { key: String, supported: String },

    #[error("Missing required setting {key} in [{section}]")]
    MissingSetting {
        section: &'static str,
        key: &'static str,
    },

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("{backend} authentication must not be used outside debug environment")]
    DebugOnly { backend: &'static str },

    #[error("Not available on this platform: {0}")]
    PlatformUnsupported(String),

    #[error("Backend initialization failed: {0}")]
    BackendInit(String),

    #[error("Failed to read config: {0}")]
    ConfigRead(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an `UnknownBackend` error listing the supported keys
    pub fn unknown_backend<I, S>(key: impl Into<String>, supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let supported = supported
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Error::UnknownBackend {
            key: key.into(),
            supported,
        }
    }
}
