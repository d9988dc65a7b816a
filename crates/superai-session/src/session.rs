//! Per-session mutable state and the orchestrator's lifecycle states.

use serde::Serialize;

/// Whether the active thread was freshly created or resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatMode {
    #[default]
    New,
    Recent,
}

/// State shared by the components of one exchange. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub mode: ChatMode,
    /// Replies already present when a recent thread was opened.
    pub baseline_reply_count: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start_new(&mut self) {
        self.mode = ChatMode::New;
        self.baseline_reply_count = 0;
    }

    pub(crate) fn resume(&mut self, baseline: usize) {
        self.mode = ChatMode::Recent;
        self.baseline_reply_count = baseline;
    }
}

/// Lifecycle of one orchestrated exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Uninit,
    Authenticated,
    ThreadReady,
    Responded,
    Failed,
    Closed,
}
