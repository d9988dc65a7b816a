//! Housekeeping on an authenticated page: deleting recent threads and
//! driving the sidebar search box.

use std::sync::Arc;

use superai_browser::Page;
use superai_core::{AutomationConfig, Envelope, Error, ErrorLog, Result};
use tracing::{debug, info, warn};

/// One housekeeping action. A batch of steps runs on a single page, so a
/// search typed in one step is still visible to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceStep {
    ClearRecentChats,
    Search(String),
    ClearSearch,
}

/// Upper bound on deletions in one sweep, in case the list never drains.
const MAX_DELETIONS: usize = 500;

pub struct ChatMaintenance {
    config: Arc<AutomationConfig>,
    log: ErrorLog,
}

impl ChatMaintenance {
    pub fn new(config: Arc<AutomationConfig>, log: ErrorLog) -> Self {
        Self { config, log }
    }

    pub async fn run(&self, page: &dyn Page, step: &MaintenanceStep) -> Envelope {
        match step {
            MaintenanceStep::ClearRecentChats => self.clear_recent_chats(page).await,
            MaintenanceStep::Search(term) => self.search_on_page(page, term).await,
            MaintenanceStep::ClearSearch => self.clear_search(page).await,
        }
    }

    /// Delete recent threads one by one until no context-menu control remains.
    pub async fn clear_recent_chats(&self, page: &dyn Page) -> Envelope {
        match self.delete_all(page).await {
            Ok(0) => Envelope::ok("No recent chats to delete"),
            Ok(n) => {
                info!("Deleted {} recent chats", n);
                Envelope::ok(format!("Deleted {} recent chats", n))
            }
            Err(e) => self.failed("clearRecentChats", "Error clearing recent chats", &e),
        }
    }

    pub async fn search_on_page(&self, page: &dyn Page, term: &str) -> Envelope {
        match self.search(page, term).await {
            Ok(()) => Envelope::ok(format!("Searched for '{}'", term.trim())).with_prompt(term),
            Err(e) => self
                .failed("searchOnPage", "Error searching", &e)
                .with_prompt(term),
        }
    }

    pub async fn clear_search(&self, page: &dyn Page) -> Envelope {
        let input = &self.config.selectors.search_input;
        match page.clear_input(input).await {
            Ok(true) => Envelope::ok("Search cleared"),
            Ok(false) => self.failed(
                "clearSearch",
                "Error clearing search",
                &Error::ControlNotFound(format!("Search input '{}' not found", input)),
            ),
            Err(e) => self.failed("clearSearch", "Error clearing search", &e.into()),
        }
    }

    async fn delete_all(&self, page: &dyn Page) -> Result<usize> {
        let sel = &self.config.selectors;
        let ui = self.config.timeouts.ui();
        let mut deleted = 0;

        while deleted < MAX_DELETIONS {
            let Some(menu) = page.query(&sel.chat_menu).await? else {
                break;
            };
            page.click(&menu).await?;

            let delete = page.wait_for(&sel.delete_option, ui).await.map_err(|_| {
                Error::ControlNotFound(format!("Delete option '{}' not found", sel.delete_option))
            })?;
            page.click(&delete).await?;

            page.wait_for(&sel.confirm_dialog, ui).await.map_err(|_| {
                Error::ControlNotFound("Confirmation dialog did not appear".into())
            })?;
            let confirm = page.query(&sel.confirm_delete).await?.ok_or_else(|| {
                Error::ControlNotFound(format!("Confirm button '{}' not found", sel.confirm_delete))
            })?;
            page.click(&confirm).await?;

            deleted += 1;
            debug!("Deleted chat {}", deleted);
            tokio::time::sleep(self.config.timeouts.settle()).await;
        }

        if deleted == MAX_DELETIONS {
            warn!("Stopped after {} deletions", MAX_DELETIONS);
        }
        Ok(deleted)
    }

    async fn search(&self, page: &dyn Page, term: &str) -> Result<()> {
        let term = term.trim();
        if term.is_empty() {
            return Err(Error::InvalidChoice("Search term must not be empty".into()));
        }
        let input = &self.config.selectors.search_input;
        page.wait_for(input, self.config.timeouts.ui()).await?;
        page.type_into(input, term).await?;
        tokio::time::sleep(self.config.timeouts.settle()).await;
        Ok(())
    }

    fn failed(&self, component: &str, context: &str, err: &Error) -> Envelope {
        self.log.record(component, &err.to_string(), Some(&format!("{:?}", err)));
        Envelope::from_error(Some(context), err)
    }
}
