//! Error types for SuperAI automation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credentials not found: {0}")]
    CredentialMissing(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Control not found: {0}")]
    ControlNotFound(String),

    #[error("No such thread: {0}")]
    NoSuchThread(String),

    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    #[error("Invalid option key '{key}'. Available options: {available}")]
    UnknownModel { key: String, available: String },

    #[error("Option not found: {0}")]
    OptionNotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("No new responses found")]
    NoNewContent,

    #[error("AI model could not be identified")]
    ModelUnidentified,

    #[error("Unexpected fault: {0}")]
    Unexpected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Taxonomy bucket reported to callers in the envelope.
    pub fn kind(&self) -> FaultKind {
        match self {
            Error::CredentialMissing(_) => FaultKind::CredentialMissing,
            Error::AuthenticationFailed(_) => FaultKind::AuthenticationFailed,
            Error::ControlNotFound(_) => FaultKind::ControlNotFound,
            Error::NoSuchThread(_) => FaultKind::NoSuchThread,
            Error::InvalidChoice(_) => FaultKind::InvalidChoice,
            Error::UnknownModel { .. } => FaultKind::UnknownModel,
            Error::OptionNotFound(_) => FaultKind::OptionNotFound,
            Error::Timeout(_) => FaultKind::Timeout,
            Error::NoNewContent => FaultKind::NoNewContent,
            Error::ModelUnidentified => FaultKind::ModelUnidentified,
            Error::Unexpected(_) | Error::Io(_) | Error::Json(_) | Error::Config(_) => {
                FaultKind::UnexpectedFault
            }
        }
    }
}

/// Serializable fault classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    CredentialMissing,
    AuthenticationFailed,
    ControlNotFound,
    NoSuchThread,
    InvalidChoice,
    UnknownModel,
    OptionNotFound,
    Timeout,
    NoNewContent,
    ModelUnidentified,
    UnexpectedFault,
}

pub type Result<T> = std::result::Result<T, Error>;
