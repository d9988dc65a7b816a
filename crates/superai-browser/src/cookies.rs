//! Credential store: a JSON file holding a list of cookie records.

use std::path::Path;

use superai_core::{Error, Result};
use tracing::debug;

use crate::types::CookieRecord;

/// Read the stored cookie list from `path`.
///
/// A missing file, or one that is not a cookie list, is `CredentialMissing`.
pub fn load_cookies(path: &Path) -> Result<Vec<CookieRecord>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::CredentialMissing(format!(
                "Cookies file not found at {}. Please log in manually to save cookies.",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let cookies: Vec<CookieRecord> = serde_json::from_str(&raw).map_err(|e| {
        Error::CredentialMissing(format!(
            "Cookies file at {} is not a cookie list: {}",
            path.display(),
            e
        ))
    })?;

    debug!("Loaded {} cookies from {}", cookies.len(), path.display());
    Ok(cookies)
}
