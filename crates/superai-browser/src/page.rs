//! The browsable-page capability the session is layered on.
//!
//! Everything the session needs from a browser engine goes through [`Page`]:
//! navigation, cookie injection, element lookup and waits, typing, pointer
//! interaction and DOM snapshots. [`BrowserLauncher`] opens a fresh context.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{BrowserError, BrowserResult};
use crate::types::{CookieRecord, DomNode, ElementHandle};

/// Interval between polls in the default `wait_*` implementations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Compose a descendant selector: `child` anywhere under `parent`.
pub fn scoped(parent: &str, child: &str) -> String {
    format!("{} {}", parent, child)
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Inject cookies into the context before navigation.
    async fn set_cookies(&self, cookies: &[CookieRecord]) -> BrowserResult<()>;

    /// Navigate and wait until the network is (almost) idle.
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// First element matching `selector`, if any.
    async fn query(&self, selector: &str) -> BrowserResult<Option<ElementHandle>>;

    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>>;

    /// First element matching `selector` whose visible text contains `needle`.
    async fn find_by_text(
        &self,
        selector: &str,
        needle: &str,
    ) -> BrowserResult<Option<ElementHandle>>;

    /// Trimmed visible text of an element.
    async fn inner_text(&self, element: &ElementHandle) -> BrowserResult<String>;

    async fn focus(&self, element: &ElementHandle) -> BrowserResult<()>;

    async fn hover(&self, element: &ElementHandle) -> BrowserResult<()>;

    async fn click(&self, element: &ElementHandle) -> BrowserResult<()>;

    /// Type `text` into the first element matching `selector`.
    async fn type_into(&self, selector: &str, text: &str) -> BrowserResult<()>;

    /// Whether the first element matching `selector` exists and is not disabled.
    async fn is_enabled(&self, selector: &str) -> BrowserResult<bool>;

    /// Reset an input's value and notify listeners. `false` if no such input.
    async fn clear_input(&self, selector: &str) -> BrowserResult<bool>;

    /// Serialized subtrees of every element matching `selector`.
    async fn snapshot_all(&self, selector: &str) -> BrowserResult<Vec<DomNode>>;

    /// Release the browsing context. Pending waits are aborted.
    async fn close(&self) -> BrowserResult<()>;

    /// Poll until `selector` matches or `timeout` elapses.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> BrowserResult<ElementHandle> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.query(selector).await? {
                return Ok(el);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: format!("selector '{}'", selector),
                    ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll until the control at `selector` exists and is enabled.
    async fn wait_until_enabled(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_enabled(selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: format!("'{}' to become enabled", selector),
                    ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Opens browsing contexts.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> BrowserResult<Box<dyn Page>>;
}

/// Which try a stale-tolerant action is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    /// The previous handle went stale; re-locate before acting.
    Retry,
}

/// Run `action`, and run it once more if it fails with `StaleElement`.
///
/// Any other fault, or a second detachment, is returned as is.
pub async fn retry_once_on_stale<T, F, Fut>(what: &str, mut action: F) -> BrowserResult<T>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = BrowserResult<T>>,
{
    match action(Attempt::First).await {
        Err(BrowserError::StaleElement(detail)) => {
            debug!("{} detached ({}), re-locating", what, detail);
            action(Attempt::Retry).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retry_once_on_stale_recovers() {
        let calls = AtomicUsize::new(0);
        let result = retry_once_on_stale("trigger", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match attempt {
                    Attempt::First => Err(BrowserError::StaleElement("trigger".into())),
                    Attempt::Retry => Ok("clicked"),
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "clicked");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_detach_is_fatal() {
        let calls = AtomicUsize::new(0);
        let result: BrowserResult<()> = retry_once_on_stale("option", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BrowserError::StaleElement("option".into())) }
        })
        .await;
        assert!(result.unwrap_err().is_stale());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_faults_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: BrowserResult<()> = retry_once_on_stale("trigger", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BrowserError::Protocol("target crashed".into())) }
        })
        .await;
        assert!(matches!(result, Err(BrowserError::Protocol(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped() {
        assert_eq!(scoped("div.absolute.right-0", "button"), "div.absolute.right-0 button");
    }
}
