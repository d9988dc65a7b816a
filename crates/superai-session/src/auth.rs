//! Authenticator: opens the browsing context and proves the stored cookies
//! still log us in.

use std::sync::Arc;

use superai_browser::{load_cookies, BrowserLauncher, Page};
use superai_core::{AutomationConfig, CredentialSource, Envelope, Error, ErrorLog, Result};
use tracing::{debug, info};

const COMPONENT: &str = "init";

pub struct Authenticator {
    config: Arc<AutomationConfig>,
    launcher: Arc<dyn BrowserLauncher>,
    log: ErrorLog,
}

impl Authenticator {
    pub fn new(config: Arc<AutomationConfig>, launcher: Arc<dyn BrowserLauncher>, log: ErrorLog) -> Self {
        Self {
            config,
            launcher,
            log,
        }
    }

    /// Acquire a fresh browsing context. The caller owns its teardown.
    pub async fn open_context(&self) -> Result<Box<dyn Page>> {
        let page = self.launcher.launch().await.map_err(|e| {
            self.log.record(COMPONENT, &e.to_string(), None);
            Error::from(e)
        })?;
        debug!("Browsing context opened");
        Ok(page)
    }

    /// Inject credentials from `source`, load the target and verify login.
    pub async fn initialize(&self, page: &dyn Page, source: &CredentialSource) -> Envelope {
        match self.try_initialize(page, source).await {
            Ok(()) => {
                info!("Logged in to {}", self.config.url);
                Envelope::ok("Initialization successful")
            }
            Err(e) => {
                self.log.record(COMPONENT, &e.to_string(), Some(&format!("{:?}", e)));
                Envelope::from_error(None, &e)
            }
        }
    }

    async fn try_initialize(&self, page: &dyn Page, source: &CredentialSource) -> Result<()> {
        let cookies = load_cookies(&source.path())?;
        page.set_cookies(&cookies)
            .await
            .map_err(|e| Error::AuthenticationFailed(format!("cookie injection failed: {}", e)))?;

        page.goto(&self.config.url, self.config.timeouts.navigation())
            .await
            .map_err(|e| Error::AuthenticationFailed(format!("navigation failed: {}", e)))?;

        let sign_in = page
            .query(&self.config.selectors.login_button)
            .await
            .map_err(|e| Error::AuthenticationFailed(e.to_string()))?;
        if sign_in.is_some() {
            return Err(Error::AuthenticationFailed(
                "Login failed. Invalid cookies or session expired.".into(),
            ));
        }
        Ok(())
    }
}
