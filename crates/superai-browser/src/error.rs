//! Faults raised by a browsing context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    /// The element was removed from the render tree between lookup and use.
    #[error("Node is detached from document: {0}")]
    StaleElement(String),

    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    #[error("No element matches '{0}'")]
    NotFound(String),

    #[error("CDP error: {0}")]
    Protocol(String),

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Browsing context is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Protocol messages Chrome returns when a remote object no longer resolves.
const DETACHED_MESSAGES: &[&str] = &[
    "Could not find object with given id",
    "Cannot find context with specified id",
    "Node is detached from document",
];

impl BrowserError {
    pub fn is_stale(&self) -> bool {
        matches!(self, BrowserError::StaleElement(_))
    }

    /// Classify a protocol failure; lost object references become `StaleElement`.
    pub fn from_protocol(message: String) -> Self {
        if DETACHED_MESSAGES.iter().any(|m| message.contains(m)) {
            BrowserError::StaleElement(message)
        } else {
            BrowserError::Protocol(message)
        }
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::from_protocol(err.to_string())
    }
}

pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

impl From<BrowserError> for superai_core::Error {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::StaleElement(_) | BrowserError::NotFound(_) => {
                superai_core::Error::ControlNotFound(err.to_string())
            }
            BrowserError::Timeout { .. } => superai_core::Error::Timeout(err.to_string()),
            BrowserError::Io(e) => superai_core::Error::Io(e),
            BrowserError::Json(e) => superai_core::Error::Json(e),
            other => superai_core::Error::Unexpected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superai_core::FaultKind;

    #[test]
    fn test_conversion_into_taxonomy() {
        let stale: superai_core::Error = BrowserError::StaleElement("trigger".into()).into();
        assert_eq!(stale.kind(), FaultKind::ControlNotFound);

        let timeout: superai_core::Error = BrowserError::Timeout {
            what: "button".into(),
            ms: 5000,
        }
        .into();
        assert_eq!(timeout.kind(), FaultKind::Timeout);
        assert_eq!(
            timeout.to_string(),
            "Timed out: Timed out after 5000ms waiting for button"
        );

        let closed: superai_core::Error = BrowserError::Closed.into();
        assert_eq!(closed.kind(), FaultKind::UnexpectedFault);
    }

    #[test]
    fn test_lost_remote_object_is_stale() {
        let err = BrowserError::from_protocol(
            "Error -32000: Could not find object with given id".into(),
        );
        assert!(err.is_stale());
        let err = BrowserError::from_protocol("Target closed".into());
        assert!(matches!(err, BrowserError::Protocol(_)));
    }
}
