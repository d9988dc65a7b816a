//! Message Transmitter: sends the user message framed by separator messages.
//!
//! A new thread gets a leading separator so there is a boundary before any
//! real content exists; every exchange ends with a trailing separator, so
//! everything after the *last* separator belongs to the reply.

use std::sync::Arc;

use superai_browser::Page;
use superai_core::{AutomationConfig, Envelope, Error, ErrorLog, Result};
use tracing::{debug, info};

use crate::model::ModelSwitcher;
use crate::session::{ChatMode, Session};

const COMPONENT: &str = "sendMessage";

pub struct MessageTransmitter {
    config: Arc<AutomationConfig>,
    switcher: ModelSwitcher,
    log: ErrorLog,
}

impl MessageTransmitter {
    pub fn new(config: Arc<AutomationConfig>, switcher: ModelSwitcher, log: ErrorLog) -> Self {
        Self {
            config,
            switcher,
            log,
        }
    }

    pub async fn send(&self, page: &dyn Page, session: &Session, message: &str, model: &str) -> Envelope {
        if session.mode == ChatMode::New {
            if let Err(e) = self.send_separator(page).await {
                return self.failed(&e, message);
            }
        }

        let selected = self.switcher.select_model(page, model).await;
        if !selected.success {
            self.log.record(
                COMPONENT,
                &format!("Model selection failed: {}", selected.message),
                None,
            );
            return selected;
        }

        tokio::time::sleep(self.config.timeouts.settle()).await;
        if let Err(e) = self.submit(page, message).await {
            return self.failed(&e, message);
        }

        tokio::time::sleep(self.config.timeouts.settle()).await;
        if let Err(e) = self.submit(page, &self.config.separator.message).await {
            return self.failed(&e, message);
        }

        info!("Message and closing separator sent");
        Envelope::ok("Message and separators sent successfully with model selection")
            .with_prompt(message)
    }

    async fn send_separator(&self, page: &dyn Page) -> Result<()> {
        debug!("Seeding separator in new thread");
        self.submit(page, &self.config.separator.message).await?;
        tokio::time::sleep(self.config.timeouts.settle()).await;
        Ok(())
    }

    /// Type `text`, wait for the send control to enable, then press it.
    async fn submit(&self, page: &dyn Page, text: &str) -> Result<()> {
        let sel = &self.config.selectors;
        let timeouts = &self.config.timeouts;

        page.wait_for(&sel.input, timeouts.ui()).await?;
        page.type_into(&sel.input, text).await?;
        page.wait_until_enabled(&sel.send_button, timeouts.send_enable())
            .await?;

        let button = page.query(&sel.send_button).await?.ok_or_else(|| {
            Error::ControlNotFound(format!(
                "Send button with selector '{}' not found.",
                sel.send_button
            ))
        })?;
        page.hover(&button).await?;
        page.click(&button).await?;
        Ok(())
    }

    fn failed(&self, err: &Error, message: &str) -> Envelope {
        self.log.record(COMPONENT, &err.to_string(), Some(&format!("{:?}", err)));
        Envelope::from_error(Some("Error sending message"), err).with_prompt(message)
    }
}
