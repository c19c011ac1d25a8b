//! Error types for Wasit

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Session Errors
    #[error("The session is closed")]
    InvalidSession,

    // Backend Errors
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown backend kind: {0}")]
    UnknownBackendKind(String),

    #[error("Duplicate backend name: {0}")]
    DuplicateBackend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Stable identifier for monitoring and client-facing error mapping
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidSession => "InvalidSession",
            Error::Backend(_) => "BackendError",
            Error::BackendUnavailable(_) => "BackendUnavailable",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::UnknownBackendKind(_) => "UnknownBackendKind",
            Error::DuplicateBackend(_) => "DuplicateBackend",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }
}
