//! Browser connector: the `Page` capability, DOM snapshots, cookie store,
//! and a Chrome implementation driven through `chromiumoxide`.

pub mod chrome;
pub mod cookies;
pub mod error;
pub mod page;
pub mod types;

pub use chrome::{ChromeLauncher, ChromePage};
pub use cookies::load_cookies;
pub use error::{BrowserError, BrowserResult};
pub use page::{retry_once_on_stale, scoped, Attempt, BrowserLauncher, Page};
pub use types::{CookieRecord, DomNode, ElementHandle};
