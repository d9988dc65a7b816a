//! SuperAI Core: configuration, error taxonomy, response envelope, fault log.

pub mod config;
pub mod envelope;
pub mod error;
pub mod error_log;

pub use config::{AutomationConfig, BrowserOptions, CredentialSource, Selectors, Separator, Timeouts};
pub use envelope::{Envelope, ReplyData};
pub use error::{Error, FaultKind, Result};
pub use error_log::ErrorLog;
