//! Model Switcher: picks a model from the dynamic dropdown.
//!
//! The trigger and the option panel are re-rendered by the remote app at will,
//! so both clicks go through [`retry_once_on_stale`]: a detached handle is
//! re-located once, anything else is fatal.

use std::sync::Arc;

use superai_browser::{retry_once_on_stale, scoped, Attempt, BrowserError, Page};
use superai_core::{AutomationConfig, Envelope, Error, ErrorLog, Result};
use tracing::{debug, info};

const COMPONENT: &str = "selectDropdownOption";

#[derive(Clone)]
pub struct ModelSwitcher {
    config: Arc<AutomationConfig>,
    log: ErrorLog,
}

impl ModelSwitcher {
    pub fn new(config: Arc<AutomationConfig>, log: ErrorLog) -> Self {
        Self { config, log }
    }

    /// Select the model configured under `key` (case-insensitive).
    pub async fn select_model(&self, page: &dyn Page, key: &str) -> Envelope {
        let result = match self.config.model_label(key) {
            Some(label) => self.try_select(page, label).await,
            None => Err(Error::UnknownModel {
                key: key.to_string(),
                available: self.config.model_keys(),
            }),
        };
        match result {
            Ok(message) => {
                info!("{}", message);
                Envelope::ok(message).with_prompt(key)
            }
            Err(e) => {
                self.log.record(COMPONENT, &e.to_string(), Some(&format!("{:?}", e)));
                Envelope::from_error(Some("Error selecting dropdown option"), &e).with_prompt(key)
            }
        }
    }

    /// Cycle through every other model, then settle on `key`.
    pub async fn prime(&self, page: &dyn Page, key: &str) -> Envelope {
        if self.config.model_label(key).is_none() {
            return self.select_model(page, key).await;
        }
        let target = key.to_lowercase();
        for other in self.config.models.keys().filter(|k| **k != target) {
            let env = self.select_model(page, other).await;
            if !env.success {
                return env;
            }
            tokio::time::sleep(self.config.timeouts.prime_pause()).await;
        }
        self.select_model(page, key).await
    }

    async fn try_select(&self, page: &dyn Page, label: &str) -> Result<String> {
        let sel = &self.config.selectors;
        let ui = self.config.timeouts.ui();

        let trigger = page.wait_for(&sel.model_trigger, ui).await?;
        let trigger = &trigger;
        retry_once_on_stale("dropdown button", |attempt| async move {
            let el = match attempt {
                Attempt::First => trigger.clone(),
                Attempt::Retry => page
                    .query(&sel.model_trigger)
                    .await?
                    .ok_or_else(|| BrowserError::NotFound(sel.model_trigger.clone()))?,
            };
            page.focus(&el).await?;
            page.click(&el).await
        })
        .await
        .map_err(|e| match e {
            BrowserError::NotFound(_) => Error::ControlNotFound(
                "Dropdown button was removed and could not be re-queried.".into(),
            ),
            other => other.into(),
        })?;

        page.wait_for(&sel.model_panel, ui).await?;
        let option_sel = scoped(&sel.model_panel, &sel.model_option);
        let options = page.query_all(&option_sel).await?;
        if options.is_empty() {
            return Err(Error::OptionNotFound("Dropdown options not found".into()));
        }

        for option in &options {
            let text = page.inner_text(option).await?;
            if !text.contains(label) {
                continue;
            }
            debug!("Matched option '{}' for '{}'", text, label);
            let option_sel = option_sel.as_str();
            retry_once_on_stale("dropdown option", |attempt| async move {
                match attempt {
                    Attempt::First => {
                        page.focus(option).await?;
                        page.hover(option).await?;
                        page.click(option).await
                    }
                    Attempt::Retry => {
                        // The whole panel may have been replaced; look it up by text.
                        let fresh = page
                            .find_by_text(option_sel, label)
                            .await?
                            .ok_or_else(|| BrowserError::NotFound(label.to_string()))?;
                        page.click(&fresh).await
                    }
                }
            })
            .await
            .map_err(|e| match e {
                BrowserError::NotFound(_) => Error::OptionNotFound(format!(
                    "Option '{}' was removed and could not be re-queried.",
                    label
                )),
                other => other.into(),
            })?;
            return Ok(format!("Option '{}' selected", text));
        }

        Err(Error::OptionNotFound(format!(
            "Option '{}' not found in the dropdown.",
            label
        )))
    }
}
