//! Scripted in-memory stand-in for the chat web app.
//!
//! The fake answers the configured selector strings and keeps just enough
//! state to play the real UI: a thread list, a "New" control, the model
//! dropdown, the composer and a reply region. User messages render as reply
//! nodes immediately; the assistant's answer to a real message only shows up
//! once the closing separator has been posted, like a slow stream.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use superai_browser::{
    scoped, BrowserError, BrowserLauncher, BrowserResult, CookieRecord, DomNode, ElementHandle,
    Page,
};
use superai_core::{AutomationConfig, Selectors};
use tempfile::TempDir;

pub struct FakeState {
    pub logged_in: bool,
    pub has_new_button: bool,
    pub has_search: bool,
    /// False hides the whole recent-chats sidebar.
    pub has_recent_container: bool,
    /// Existing replies per recent thread.
    pub threads: Vec<Vec<DomNode>>,
    pub replies: Vec<DomNode>,
    pub models: Vec<String>,
    pub active_model: String,
    pub show_trigger: bool,
    pub panel_open: bool,
    pub menu_open: bool,
    pub dialog_open: bool,
    pub pending_input: String,
    pub search_value: String,
    /// Assistant answers not rendered yet.
    pub queued: Vec<DomNode>,
    /// Replaces the default "Echo: ..." answer when set.
    pub answer: Option<Vec<DomNode>>,
    pub stale_trigger_clicks: usize,
    pub stale_option_clicks: usize,
    pub panic_on_send: bool,
    pub close_fails: bool,
    pub launch_fails: bool,
    pub cookies_set: usize,
    pub submitted: Vec<String>,
    pub selected: Vec<String>,
    pub new_clicks: usize,
    pub interactions: usize,
    pub close_count: usize,
    pub launches: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            logged_in: true,
            has_new_button: true,
            has_search: true,
            has_recent_container: true,
            threads: Vec::new(),
            replies: Vec::new(),
            models: vec![
                "Gemini 1.5".into(),
                "Llama 3.1".into(),
                "ChatGPT 4o".into(),
            ],
            active_model: "Gemini 1.5".into(),
            show_trigger: true,
            panel_open: false,
            menu_open: false,
            dialog_open: false,
            pending_input: String::new(),
            search_value: String::new(),
            queued: Vec::new(),
            answer: None,
            stale_trigger_clicks: 0,
            stale_option_clicks: 0,
            panic_on_send: false,
            close_fails: false,
            launch_fails: false,
            cookies_set: 0,
            submitted: Vec::new(),
            selected: Vec::new(),
            new_clicks: 0,
            interactions: 0,
            close_count: 0,
            launches: 0,
        }
    }
}

pub type Shared = Arc<Mutex<FakeState>>;

pub struct FakePage {
    state: Shared,
    sel: Selectors,
    separator: String,
}

impl FakePage {
    pub fn new(state: Shared, config: &AutomationConfig) -> Self {
        Self {
            state,
            sel: config.selectors.clone(),
            separator: config.separator.message.clone(),
        }
    }

    fn option_selector(&self) -> String {
        scoped(&self.sel.model_panel, &self.sel.model_option)
    }

    fn reply_selector(&self) -> String {
        scoped(&self.sel.reply_container, &self.sel.reply_item)
    }

    fn thread_selector(&self) -> String {
        scoped(&self.sel.recent_chats, &self.sel.chat_item)
    }

    fn submit(&self) {
        let mut st = self.state.lock();
        let text = std::mem::take(&mut st.pending_input);
        st.submitted.push(text.clone());
        st.replies.push(DomNode::element("div").with_text(text.clone()));
        if text == self.separator {
            let queued = std::mem::take(&mut st.queued);
            st.replies.extend(queued);
            return;
        }
        if st.panic_on_send {
            drop(st);
            panic!("renderer crashed while sending");
        }
        let answer = st
            .answer
            .clone()
            .unwrap_or_else(|| vec![DomNode::element("div").with_text(format!("Echo: {}", text))]);
        st.queued.extend(answer);
    }
}

fn handle(id: impl Into<String>) -> ElementHandle {
    ElementHandle::new(id)
}

fn index_of(el: &ElementHandle, prefix: &str) -> Option<usize> {
    el.id().strip_prefix(prefix)?.parse().ok()
}

#[async_trait]
impl Page for FakePage {
    async fn set_cookies(&self, cookies: &[CookieRecord]) -> BrowserResult<()> {
        self.state.lock().cookies_set = cookies.len();
        Ok(())
    }

    async fn goto(&self, _url: &str, _timeout: Duration) -> BrowserResult<()> {
        Ok(())
    }

    async fn query(&self, selector: &str) -> BrowserResult<Option<ElementHandle>> {
        let st = self.state.lock();
        let s = &self.sel;
        let found = if selector == s.login_button {
            (!st.logged_in).then(|| handle("login"))
        } else if selector == s.recent_chats {
            st.has_recent_container.then(|| handle("recent"))
        } else if selector == s.reply_container {
            Some(handle("container"))
        } else if selector == s.model_trigger {
            st.show_trigger.then(|| handle("trigger"))
        } else if selector == s.model_panel {
            st.panel_open.then(|| handle("panel"))
        } else if selector == s.input {
            Some(handle("input"))
        } else if selector == s.send_button {
            Some(handle("send"))
        } else if selector == s.search_input {
            st.has_search.then(|| handle("search"))
        } else if selector == s.chat_menu {
            (!st.threads.is_empty()).then(|| handle("menu"))
        } else if selector == s.delete_option {
            st.menu_open.then(|| handle("delete"))
        } else if selector == s.confirm_dialog || selector == s.confirm_delete {
            st.dialog_open.then(|| handle("confirm"))
        } else {
            None
        };
        Ok(found)
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>> {
        let st = self.state.lock();
        let handles = if selector == self.thread_selector() && st.has_recent_container {
            (0..st.threads.len()).map(|i| handle(format!("thread:{}", i))).collect()
        } else if selector == self.option_selector() && st.panel_open {
            (0..st.models.len()).map(|i| handle(format!("option:{}", i))).collect()
        } else if selector == self.reply_selector() {
            (0..st.replies.len()).map(|i| handle(format!("reply:{}", i))).collect()
        } else {
            Vec::new()
        };
        Ok(handles)
    }

    async fn find_by_text(
        &self,
        selector: &str,
        needle: &str,
    ) -> BrowserResult<Option<ElementHandle>> {
        let st = self.state.lock();
        if selector == self.sel.new_chat_button {
            return Ok((st.has_new_button && needle == self.sel.new_chat_label).then(|| handle("new")));
        }
        if selector == self.option_selector() && st.panel_open {
            return Ok(st
                .models
                .iter()
                .position(|m| m.contains(needle))
                .map(|i| handle(format!("option:{}", i))));
        }
        Ok(None)
    }

    async fn inner_text(&self, element: &ElementHandle) -> BrowserResult<String> {
        let st = self.state.lock();
        if element.id() == "trigger" {
            return Ok(st.active_model.clone());
        }
        if let Some(i) = index_of(element, "option:") {
            return st
                .models
                .get(i)
                .cloned()
                .ok_or_else(|| BrowserError::StaleElement(element.id().to_string()));
        }
        Ok(String::new())
    }

    async fn focus(&self, _element: &ElementHandle) -> BrowserResult<()> {
        self.state.lock().interactions += 1;
        Ok(())
    }

    async fn hover(&self, _element: &ElementHandle) -> BrowserResult<()> {
        self.state.lock().interactions += 1;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> BrowserResult<()> {
        let mut st = self.state.lock();
        st.interactions += 1;
        match element.id() {
            "trigger" => {
                if st.stale_trigger_clicks > 0 {
                    st.stale_trigger_clicks -= 1;
                    return Err(BrowserError::StaleElement("trigger".into()));
                }
                st.panel_open = true;
            }
            "new" => {
                st.new_clicks += 1;
                st.replies.clear();
            }
            "send" => {
                drop(st);
                self.submit();
            }
            "menu" => st.menu_open = true,
            "delete" => {
                st.menu_open = false;
                st.dialog_open = true;
            }
            "confirm" => {
                st.dialog_open = false;
                if !st.threads.is_empty() {
                    st.threads.remove(0);
                }
            }
            id => {
                if let Some(i) = index_of(element, "option:") {
                    if st.stale_option_clicks > 0 {
                        st.stale_option_clicks -= 1;
                        return Err(BrowserError::StaleElement(id.to_string()));
                    }
                    let label = st.models[i].clone();
                    st.active_model = label.clone();
                    st.selected.push(label);
                    st.panel_open = false;
                } else if let Some(i) = index_of(element, "thread:") {
                    st.replies = st.threads[i].clone();
                }
            }
        }
        Ok(())
    }

    async fn type_into(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let mut st = self.state.lock();
        st.interactions += 1;
        if selector == self.sel.input {
            st.pending_input = text.to_string();
        } else if selector == self.sel.search_input {
            st.search_value = text.to_string();
        }
        Ok(())
    }

    async fn is_enabled(&self, selector: &str) -> BrowserResult<bool> {
        let st = self.state.lock();
        Ok(selector == self.sel.send_button && !st.pending_input.is_empty())
    }

    async fn clear_input(&self, selector: &str) -> BrowserResult<bool> {
        let mut st = self.state.lock();
        if selector == self.sel.search_input && st.has_search {
            st.search_value.clear();
            return Ok(true);
        }
        Ok(false)
    }

    async fn snapshot_all(&self, selector: &str) -> BrowserResult<Vec<DomNode>> {
        let st = self.state.lock();
        if selector == self.reply_selector() {
            return Ok(st.replies.clone());
        }
        Ok(Vec::new())
    }

    async fn close(&self) -> BrowserResult<()> {
        let mut st = self.state.lock();
        st.close_count += 1;
        if st.close_fails {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }
}

pub struct FakeLauncher {
    pub state: Shared,
    config: AutomationConfig,
}

impl FakeLauncher {
    pub fn new(state: Shared, config: &AutomationConfig) -> Self {
        Self {
            state,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Page>> {
        let mut st = self.state.lock();
        if st.launch_fails {
            return Err(BrowserError::Launch("no chrome here".into()));
        }
        // A fresh context starts with no typed text and nothing open.
        st.launches += 1;
        st.search_value.clear();
        st.pending_input.clear();
        st.panel_open = false;
        st.menu_open = false;
        st.dialog_open = false;
        drop(st);
        Ok(Box::new(FakePage::new(self.state.clone(), &self.config)))
    }
}

/// Config with zero pauses, short waits and a cookie file in a temp dir.
pub struct Fixture {
    pub dir: TempDir,
    pub config: AutomationConfig,
    pub state: Shared,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cookies = serde_json::json!([
            {"name": "sid", "value": "abc", "domain": ".superai.id", "path": "/",
             "httpOnly": true, "secure": true}
        ]);
        std::fs::write(dir.path().join("cookies.json"), cookies.to_string()).unwrap();

        let mut config = AutomationConfig::default();
        config.credentials.folder = dir.path().to_path_buf();
        config.error_log = dir.path().join("error_log.txt");
        config.prime_models = false;
        config.timeouts.settle_ms = 0;
        config.timeouts.prime_pause_ms = 0;
        config.timeouts.close_delay_ms = 0;
        config.timeouts.ui_ms = 150;
        config.timeouts.send_enable_ms = 150;
        config.timeouts.thread_open_ms = 150;

        Self {
            dir,
            config,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    pub fn config(&self) -> Arc<AutomationConfig> {
        Arc::new(self.config.clone())
    }

    pub fn page(&self) -> FakePage {
        FakePage::new(self.state.clone(), &self.config)
    }

    pub fn launcher(&self) -> Arc<dyn BrowserLauncher> {
        Arc::new(FakeLauncher::new(self.state.clone(), &self.config))
    }

    pub fn error_log(&self) -> String {
        std::fs::read_to_string(&self.config.error_log).unwrap_or_default()
    }
}

pub fn text(t: &str) -> DomNode {
    DomNode::element("div").with_text(t)
}
