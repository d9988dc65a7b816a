//! Thread Selector: resume a recent conversation or start a new one.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use superai_browser::{scoped, Page};
use superai_core::{AutomationConfig, Envelope, Error, ErrorLog, Result};
use tracing::{debug, info};

use crate::session::Session;

const COMPONENT: &str = "handleRecentChats";

/// Which thread to talk in: `"new"` or a 1-based position in the recent list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadChoice {
    New,
    Index(usize),
}

impl FromStr for ThreadChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("new") {
            return Ok(ThreadChoice::New);
        }
        s.parse::<usize>()
            .map(ThreadChoice::Index)
            .map_err(|_| Error::InvalidChoice(format!("'{}' is neither \"new\" nor a thread number", s)))
    }
}

impl From<usize> for ThreadChoice {
    fn from(index: usize) -> Self {
        ThreadChoice::Index(index)
    }
}

impl fmt::Display for ThreadChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadChoice::New => write!(f, "new"),
            ThreadChoice::Index(i) => write!(f, "{}", i),
        }
    }
}

pub struct ThreadSelector {
    config: Arc<AutomationConfig>,
    log: ErrorLog,
}

impl ThreadSelector {
    pub fn new(config: Arc<AutomationConfig>, log: ErrorLog) -> Self {
        Self { config, log }
    }

    /// Select `choice`, updating the session's mode and baseline on success.
    pub async fn select_thread(
        &self,
        page: &dyn Page,
        session: &mut Session,
        choice: ThreadChoice,
    ) -> Envelope {
        match self.try_select(page, session, choice).await {
            Ok(message) => {
                info!("{}", message);
                Envelope::ok(message).with_prompt(choice.to_string())
            }
            Err(e) => {
                self.log.record(COMPONENT, &e.to_string(), Some(&format!("{:?}", e)));
                Envelope::from_error(Some("Error handling recent chats"), &e)
                    .with_prompt(choice.to_string())
            }
        }
    }

    async fn try_select(
        &self,
        page: &dyn Page,
        session: &mut Session,
        choice: ThreadChoice,
    ) -> Result<String> {
        let sel = &self.config.selectors;

        let threads = match page.query(&sel.recent_chats).await? {
            Some(_) => page.query_all(&scoped(&sel.recent_chats, &sel.chat_item)).await?,
            None => Vec::new(),
        };
        debug!("{} recent threads visible", threads.len());

        let index = match choice {
            ThreadChoice::New => {
                let clicked = self.activate_new(page).await?;
                if !clicked && threads.is_empty() {
                    return Err(Error::ControlNotFound("New button not found".into()));
                }
                session.start_new();
                return Ok(if clicked {
                    "New chat created by clicking the 'New' button".to_string()
                } else {
                    "New chat created".to_string()
                });
            }
            ThreadChoice::Index(_) if threads.is_empty() => {
                return Err(Error::NoSuchThread("No recent chats found".into()));
            }
            ThreadChoice::Index(n) if n == 0 || n > threads.len() => {
                return Err(Error::InvalidChoice(format!(
                    "No such chat exists: {} of {}",
                    n,
                    threads.len()
                )));
            }
            ThreadChoice::Index(n) => n,
        };

        page.click(&threads[index - 1]).await?;
        page.wait_for(&sel.reply_container, self.config.timeouts.thread_open())
            .await?;
        let baseline = page
            .query_all(&scoped(&sel.reply_container, &sel.reply_item))
            .await?
            .len();
        session.resume(baseline);
        debug!("Thread {} has {} existing replies", index, baseline);
        Ok(format!("Chat number {} opened", index))
    }

    /// Hover and click the "New" control. `false` if there is none.
    async fn activate_new(&self, page: &dyn Page) -> Result<bool> {
        let sel = &self.config.selectors;
        let Some(button) = page
            .find_by_text(&sel.new_chat_button, &sel.new_chat_label)
            .await?
        else {
            return Ok(false);
        };
        page.hover(&button).await?;
        page.click(&button).await?;
        Ok(true)
    }
}
