//! Chrome/Chromium launched locally and driven through `chromiumoxide`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, SetCookiesParams, TimeSinceEpoch,
};
use chromiumoxide::cdp::js_protocol::runtime::{CallFunctionOnParams, EvaluateParams};
use chromiumoxide::Page as CdpPage;
use futures::StreamExt;
use serde_json::Value;
use superai_core::BrowserOptions;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{BrowserError, BrowserResult};
use crate::page::{BrowserLauncher, Page};
use crate::types::{CookieRecord, DomNode, ElementHandle};

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Launches one Chrome process, with a throwaway profile, per browsing context.
pub struct ChromeLauncher {
    options: BrowserOptions,
    profile_root: PathBuf,
}

impl ChromeLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            profile_root: std::env::temp_dir(),
        }
    }

    /// Directory the per-launch `superai-<uuid>` profiles are created in.
    pub fn with_profile_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.profile_root = root.into();
        self
    }

    async fn start(&self, profile_dir: &Path) -> BrowserResult<ChromePage> {
        let config = browser_config(&self.options, profile_dir)?;
        info!(headless = self.options.headless, "Launching Chrome");

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    debug!("CDP handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::Launch(e.to_string()));
            }
        };
        debug!("Page target ready");

        Ok(ChromePage {
            page,
            browser: Mutex::new(Some(browser)),
            handler,
            profile_dir: profile_dir.to_path_buf(),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Page>> {
        let profile_dir = self
            .profile_root
            .join(format!("superai-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&profile_dir)?;

        match self.start(&profile_dir).await {
            Ok(page) => Ok(Box::new(page)),
            Err(e) => {
                remove_profile(&profile_dir).await;
                Err(e)
            }
        }
    }
}

fn browser_config(options: &BrowserOptions, profile_dir: &Path) -> BrowserResult<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .user_data_dir(profile_dir)
        .headless_mode(if options.headless {
            HeadlessMode::New
        } else {
            HeadlessMode::False
        })
        .launch_timeout(LAUNCH_TIMEOUT)
        .window_size(1280, 900)
        .arg("--no-default-browser-check")
        .arg("--password-store=basic");
    if let Some(path) = &options.chrome_path {
        builder = builder.chrome_executable(path);
    }
    if options.debug_port != 0 {
        builder = builder.port(options.debug_port);
    }
    for arg in &options.extra_args {
        builder = builder.arg(arg);
    }
    builder.build().map_err(BrowserError::Launch)
}

async fn remove_profile(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!("Failed to remove profile dir {}: {}", dir.display(), e);
    }
}

/// A single Chrome tab owned by one session.
pub struct ChromePage {
    page: CdpPage,
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
    closed: AtomicBool,
}

/// Prefix for functions called on element handles: detached nodes report
/// themselves instead of silently acting on nothing.
const STALE_GUARD: &str = "if (!this.isConnected) return { stale: true };";

/// Serializes an element subtree into the `DomNode` shape.
const SNAPSHOT_FN: &str = r#"
const snap = (el) => ({
    tag: el.tagName.toLowerCase(),
    attrs: Object.fromEntries(Array.from(el.attributes).map(a => [a.name, a.value])
        .concat(el.tagName === 'IMG' ? [['src', el.src]] : [])),
    text: (el.innerText ?? el.textContent ?? '').trim(),
    children: Array.from(el.children).map(snap),
});
"#;

fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn cookie_param(cookie: &CookieRecord) -> BrowserResult<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if let Some(expires) = cookie.expires {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(same_site) = cookie.same_site.as_deref().and_then(same_site) {
        builder = builder.same_site(same_site);
    }
    builder.build().map_err(BrowserError::Protocol)
}

fn same_site(raw: &str) -> Option<CookieSameSite> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" | "no_restriction" => Some(CookieSameSite::None),
        _ => None,
    }
}

impl ChromePage {
    fn ensure_open(&self) -> BrowserResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    /// Evaluate `expression` and read the result back by value.
    async fn eval<T: serde::de::DeserializeOwned>(&self, expression: String) -> BrowserResult<T> {
        self.ensure_open()?;
        let result = self.page.evaluate(expression).await?;
        Ok(result.into_value()?)
    }

    /// Evaluate an expression yielding an element or null.
    async fn element_from(&self, expression: String) -> BrowserResult<Option<ElementHandle>> {
        self.ensure_open()?;
        let params = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(false)
            .build()
            .map_err(BrowserError::Protocol)?;
        let resp = self.page.execute(params).await?;
        if let Some(details) = &resp.result.exception_details {
            return Err(BrowserError::Protocol(details.text.clone()));
        }
        Ok(resp
            .result
            .result
            .object_id
            .as_ref()
            .map(|id| ElementHandle::new(id.inner().clone())))
    }

    /// Call `body` on the element; `body` must `return { value: ... }`.
    async fn call_on(&self, element: &ElementHandle, body: &str) -> BrowserResult<Value> {
        self.ensure_open()?;
        let params = CallFunctionOnParams::builder()
            .function_declaration(format!("function() {{ {} {} }}", STALE_GUARD, body))
            .object_id(element.id().to_string())
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Protocol)?;
        let resp = self.page.execute(params).await?;
        if let Some(details) = &resp.result.exception_details {
            return Err(BrowserError::Protocol(details.text.clone()));
        }
        let result = resp.result.result.value.clone().unwrap_or(Value::Null);
        if result.get("stale").and_then(Value::as_bool) == Some(true) {
            return Err(BrowserError::StaleElement(element.id().to_string()));
        }
        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }

    /// Scroll the element into view and return its centre point.
    async fn centre(&self, element: &ElementHandle) -> BrowserResult<(f64, f64)> {
        let rect = self
            .call_on(
                element,
                "this.scrollIntoView({ block: 'center', inline: 'center' }); \
                 const r = this.getBoundingClientRect(); \
                 return { value: { x: r.left + r.width / 2, y: r.top + r.height / 2 } };",
            )
            .await?;
        let x = rect.get("x").and_then(Value::as_f64);
        let y = rect.get("y").and_then(Value::as_f64);
        match (x, y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(BrowserError::Protocol("element has no layout box".into())),
        }
    }

    /// Dispatch one mouse event; `pressed` events carry the left button.
    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64, pressed: bool) -> BrowserResult<()> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind).x(x).y(y);
        if pressed {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(BrowserError::Protocol)?;
        self.page.execute(params).await?;
        Ok(())
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn set_cookies(&self, cookies: &[CookieRecord]) -> BrowserResult<()> {
        self.ensure_open()?;
        let params = cookies
            .iter()
            .map(cookie_param)
            .collect::<BrowserResult<Vec<_>>>()?;
        self.page.execute(SetCookiesParams::new(params)).await?;
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        self.ensure_open()?;
        let navigate = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, BrowserError>(())
        };
        tokio::time::timeout(timeout, navigate)
            .await
            .map_err(|_| BrowserError::Timeout {
                what: format!("navigation to {}", url),
                ms: timeout.as_millis() as u64,
            })?
    }

    async fn query(&self, selector: &str) -> BrowserResult<Option<ElementHandle>> {
        self.element_from(format!("document.querySelector({})", js_str(selector)))
            .await
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        let elements = self.page.find_elements(selector).await?;
        Ok(elements
            .iter()
            .map(|el| ElementHandle::new(el.remote_object_id.inner().clone()))
            .collect())
    }

    async fn find_by_text(
        &self,
        selector: &str,
        needle: &str,
    ) -> BrowserResult<Option<ElementHandle>> {
        self.element_from(format!(
            "Array.from(document.querySelectorAll({})).find(el => \
             (el.innerText ?? el.textContent ?? '').trim().includes({})) ?? null",
            js_str(selector),
            js_str(needle)
        ))
        .await
    }

    async fn inner_text(&self, element: &ElementHandle) -> BrowserResult<String> {
        let value = self
            .call_on(
                element,
                "return { value: (this.innerText ?? this.textContent ?? '').trim() };",
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn focus(&self, element: &ElementHandle) -> BrowserResult<()> {
        self.call_on(element, "this.focus(); return { value: true };")
            .await?;
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> BrowserResult<()> {
        let (x, y) = self.centre(element).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, x, y, false).await
    }

    async fn click(&self, element: &ElementHandle) -> BrowserResult<()> {
        let (x, y) = self.centre(element).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, x, y, false).await?;
        self.mouse(DispatchMouseEventType::MousePressed, x, y, true).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, x, y, true).await
    }

    async fn type_into(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let element = self
            .query(selector)
            .await?
            .ok_or_else(|| BrowserError::NotFound(selector.to_string()))?;
        self.focus(&element).await?;
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn is_enabled(&self, selector: &str) -> BrowserResult<bool> {
        self.eval(format!(
            "(() => {{ const b = document.querySelector({}); return !!b && !b.disabled; }})()",
            js_str(selector)
        ))
        .await
    }

    async fn clear_input(&self, selector: &str) -> BrowserResult<bool> {
        self.eval(format!(
            "(() => {{ const input = document.querySelector({}); \
             if (!input) return false; \
             input.value = ''; \
             input.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             return true; }})()",
            js_str(selector)
        ))
        .await
    }

    async fn snapshot_all(&self, selector: &str) -> BrowserResult<Vec<DomNode>> {
        self.eval(format!(
            "(() => {{ {} return Array.from(document.querySelectorAll({})).map(snap); }})()",
            SNAPSHOT_FN,
            js_str(selector)
        ))
        .await
    }

    async fn close(&self) -> BrowserResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        let browser = self.browser.lock().await.take();
        if let Some(mut browser) = browser {
            if let Err(e) = browser.close().await {
                debug!("Browser.close failed (may already be gone): {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Chrome did not exit cleanly: {}", e);
            }
        }
        self.handler.abort();
        remove_profile(&self.profile_dir).await;
        Ok(())
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes() {
        assert_eq!(js_str(r#"button[data-x="a"]"#), r#""button[data-x=\"a\"]""#);
    }

    #[test]
    fn test_same_site_spellings() {
        assert_eq!(same_site("Lax"), Some(CookieSameSite::Lax));
        assert_eq!(same_site("no_restriction"), Some(CookieSameSite::None));
        assert_eq!(same_site("unspecified"), None);
    }

    #[test]
    fn test_cookie_param_keeps_flags() {
        let record = CookieRecord {
            name: "sid".into(),
            value: "abc".into(),
            domain: ".superai.id".into(),
            path: "/".into(),
            expires: Some(1767225600.0),
            http_only: true,
            secure: true,
            same_site: Some("Strict".into()),
        };
        let param = cookie_param(&record).unwrap();
        assert_eq!(param.name, "sid");
        assert_eq!(param.domain.as_deref(), Some(".superai.id"));
        assert_eq!(param.http_only, Some(true));
        assert_eq!(param.same_site, Some(CookieSameSite::Strict));
    }

    #[tokio::test]
    async fn test_failed_launch_leaves_no_profile_behind() {
        let root = tempfile::tempdir().unwrap();
        let options = BrowserOptions {
            chrome_path: Some(root.path().join("no-such-chrome")),
            ..Default::default()
        };
        let launcher = ChromeLauncher::new(options).with_profile_root(root.path());

        assert!(launcher.launch().await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("superai-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
