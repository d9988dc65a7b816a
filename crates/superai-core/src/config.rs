//! Automation configuration: target site, selectors, model table, separator,
//! timeouts and browser launch options.
//!
//! Loaded once from `superai.json` (every field optional), then overridden by
//! `SUPERAI_*` environment variables. The result is immutable and shared as
//! `Arc<AutomationConfig>`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_URL: &str = "https://www.superai.id/login";
pub const DEFAULT_SEPARATOR_MESSAGE: &str =
    "ignore this message because it is a separator, reply with 'c2VwYXJhdG9y' only.";
pub const DEFAULT_SEPARATOR_MARKER: &str = "c2VwYXJhdG9y";

/// Locator strings for every UI region the session touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Present only while signed out.
    pub login_button: String,
    /// Candidates for the "New" chat control.
    pub new_chat_button: String,
    /// Visible label the "New" control must contain.
    pub new_chat_label: String,
    pub recent_chats: String,
    pub chat_item: String,
    pub model_trigger: String,
    pub model_panel: String,
    /// Option controls, scoped under `model_panel`.
    pub model_option: String,
    pub input: String,
    pub send_button: String,
    pub reply_container: String,
    pub reply_item: String,
    pub search_input: String,
    pub chat_menu: String,
    pub delete_option: String,
    pub confirm_dialog: String,
    pub confirm_delete: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            login_button: r#"button[data-sentry-component="SignInWithGoogle"]"#.into(),
            new_chat_button:
                r#"button[data-sentry-element="Button"], button[data-sentry-component="NewChat"]"#
                    .into(),
            new_chat_label: "New".into(),
            recent_chats: "div.flex.flex-col.flex-grow.flex-shrink.basis-0.text-sm.text-zinc-500"
                .into(),
            chat_item: "div.group.flex.flex-row.justify-start.items-center".into(),
            model_trigger: "button.text-zinc-800".into(),
            model_panel: "div.absolute.right-0".into(),
            model_option: "button".into(),
            input: r#"textarea[data-sentry-component="InputTextArea"]"#.into(),
            send_button: r#"button[data-sentry-component="ButtonSending"]"#.into(),
            reply_container:
                "div.flex.flex-col.w-full.space-y-6.px-3.py-4.pb-20.bg-background.mt-14".into(),
            reply_item: "div.markdown-content".into(),
            search_input: r#"input[placeholder="Search..."]"#.into(),
            chat_menu: "button .lucide-ellipsis-vertical".into(),
            delete_option: r#"div[role="menuitem"] .lucide-trash2"#.into(),
            confirm_dialog: r#"div[role="dialog"]"#.into(),
            confirm_delete: "button.bg-destructive".into(),
        }
    }
}

/// The sentinel message framing each exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Separator {
    /// Literal text sent as a boundary.
    pub message: String,
    /// Substring that identifies the boundary in rendered replies.
    pub marker: String,
}

impl Default for Separator {
    fn default() -> Self {
        Self {
            message: DEFAULT_SEPARATOR_MESSAGE.into(),
            marker: DEFAULT_SEPARATOR_MARKER.into(),
        }
    }
}

/// Per-operation bounds, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub navigation_ms: u64,
    pub ui_ms: u64,
    pub send_enable_ms: u64,
    pub thread_open_ms: u64,
    /// Pause between sends for the remote UI to re-render.
    pub settle_ms: u64,
    /// Pause between selections while priming the model menu.
    pub prime_pause_ms: u64,
    pub close_delay_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 60_000,
            ui_ms: 5_000,
            send_enable_ms: 10_000,
            thread_open_ms: 30_000,
            settle_ms: 1_000,
            prime_pause_ms: 100,
            close_delay_ms: 500,
        }
    }
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }
    pub fn ui(&self) -> Duration {
        Duration::from_millis(self.ui_ms)
    }
    pub fn send_enable(&self) -> Duration {
        Duration::from_millis(self.send_enable_ms)
    }
    pub fn thread_open(&self) -> Duration {
        Duration::from_millis(self.thread_open_ms)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
    pub fn prime_pause(&self) -> Duration {
        Duration::from_millis(self.prime_pause_ms)
    }
    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

/// Chrome launch options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Explicit browser binary; auto-detected when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    /// 0 lets the driver pick a free port.
    pub debug_port: u16,
    pub extra_args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            debug_port: 0,
            extra_args: vec!["--no-sandbox".into(), "--disable-setuid-sandbox".into()],
        }
    }
}

/// Where the stored cookie list lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSource {
    pub folder: PathBuf,
    pub file_name: String,
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("."),
            file_name: "cookies.json".into(),
        }
    }
}

impl CredentialSource {
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }
}

fn default_models() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("gemini".to_string(), "Gemini 1.5".to_string()),
        ("llama".to_string(), "Llama 3.1".to_string()),
        ("chatgpt".to_string(), "ChatGPT 4o".to_string()),
    ])
}

fn default_url() -> String {
    DEFAULT_URL.into()
}

fn default_error_log() -> PathBuf {
    PathBuf::from("error_log.txt")
}

fn default_true() -> bool {
    true
}

/// Top-level automation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub selectors: Selectors,
    /// Logical model key (lowercase) to on-screen label.
    #[serde(default = "default_models")]
    pub models: BTreeMap<String, String>,
    #[serde(default)]
    pub separator: Separator,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub browser: BrowserOptions,
    #[serde(default)]
    pub credentials: CredentialSource,
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,
    /// Cycle through the other models before selecting the requested one.
    #[serde(default = "default_true")]
    pub prime_models: bool,
    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            selectors: Selectors::default(),
            models: default_models(),
            separator: Separator::default(),
            timeouts: Timeouts::default(),
            browser: BrowserOptions::default(),
            credentials: CredentialSource::default(),
            error_log: default_error_log(),
            prime_models: true,
            config_path: PathBuf::new(),
        }
    }
}

impl AutomationConfig {
    /// Load config from a JSON file, or return defaults when it is missing.
    ///
    /// A file that exists but does not parse is an error: silently running
    /// against default selectors would hide the mistake.
    pub fn load(config_path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(config_path) {
            Ok(raw) => serde_json::from_str::<AutomationConfig>(&raw).map_err(|e| {
                Error::Config(format!("{}: {}", config_path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No config at {}, using defaults",
                    config_path.display()
                );
                AutomationConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.config_path = config_path.to_path_buf();
        config.normalize();
        Ok(config)
    }

    /// `load` followed by environment overrides.
    pub fn from_env(config_path: &Path) -> Result<Self> {
        let mut config = Self::load(config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `SUPERAI_*` overrides through the given lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SUPERAI_URL") {
            self.url = url;
        }
        if let Some(headless) = lookup("SUPERAI_HEADLESS") {
            match headless.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.browser.headless = true,
                "0" | "false" | "no" => self.browser.headless = false,
                other => warn!("Ignoring SUPERAI_HEADLESS={}", other),
            }
        }
        if let Some(dir) = lookup("SUPERAI_COOKIES_DIR") {
            self.credentials.folder = PathBuf::from(dir);
        }
        if let Some(file) = lookup("SUPERAI_COOKIES_FILE") {
            self.credentials.file_name = file;
        }
        if let Some(chrome) = lookup("SUPERAI_CHROME") {
            self.browser.chrome_path = Some(PathBuf::from(chrome));
        }
        if let Some(log) = lookup("SUPERAI_ERROR_LOG") {
            self.error_log = PathBuf::from(log);
        }
    }

    /// Lowercase model keys so lookups are case-insensitive.
    fn normalize(&mut self) {
        let models = std::mem::take(&mut self.models);
        self.models = models
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
    }

    /// Display label for a model key, case-insensitively.
    pub fn model_label(&self, key: &str) -> Option<&str> {
        self.models.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Comma-separated list of configured model keys.
    pub fn model_keys(&self) -> String {
        self.models.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
