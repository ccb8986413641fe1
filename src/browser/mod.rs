//! Headless browser automation, seen by the crawler as a black box that
//! loads pages and answers DOM queries.

pub mod static_html;
pub mod webdriver;

use crate::error::{AnalysisError, LoadError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

pub use static_html::StaticBrowser;
pub use webdriver::WebDriverBrowser;

/// Selector for every element the element analyzer records
pub const INTERACTIVE_SELECTOR: &str = "a, button, input, select, textarea";
/// Selector for controls inside a form
pub const FORM_INPUT_SELECTOR: &str = "input, select, textarea";

/// A source of rendered pages.
///
/// One implementation value corresponds to one browser context; callers
/// acquire it per run and must call [`Browser::shutdown`] on every exit path.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Load `url`, failing if it does not render within `timeout`
    async fn open(&self, url: &str, timeout: Duration) -> Result<Box<dyn PageHandle>, LoadError>;

    /// Release the underlying browser context
    async fn shutdown(&self) {}
}

/// A loaded page
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn title(&self) -> Result<String, AnalysisError>;

    /// All elements matching a CSS selector, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError>;

    /// Release per-page resources
    async fn close(self: Box<Self>);
}

/// One element of a loaded page
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Lowercase tag name
    async fn tag_name(&self) -> Result<String, AnalysisError>;

    async fn attributes(&self) -> Result<BTreeMap<String, String>, AnalysisError>;

    /// Trimmed `textContent`
    async fn text_content(&self) -> Result<String, AnalysisError>;

    /// Descendants matching a CSS selector, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, AnalysisError>;
}
