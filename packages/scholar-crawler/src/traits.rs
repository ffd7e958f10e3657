use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserResult;

// ============================================================================
// BROWSER: one live page, driven sequentially
// ============================================================================

/// Opaque reference to an element on the current page.
///
/// Handles are only valid until the next navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// A file produced by a download, buffered in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File name proposed by the site
    pub suggested_name: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

/// Browser automation capability consumed by the traversals.
///
/// Selectors are CSS selectors. Methods without an explicit timeout use the
/// implementation's default wait for required elements.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Load a URL in the page
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// Inner text of the first element matching `selector`
    async fn text(&self, selector: &str) -> BrowserResult<String>;

    /// Attribute of the first element matching `selector`, waiting at most `timeout`
    async fn attribute(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> BrowserResult<String>;

    /// All elements currently matching `selector` (possibly none)
    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>>;

    /// All descendants of `scope` matching `selector`
    async fn find_all_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Vec<ElementHandle>>;

    /// Attribute of the first descendant of `scope` matching `selector`
    async fn attribute_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> BrowserResult<String>;

    async fn element_text(&self, element: &ElementHandle) -> BrowserResult<String>;

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> BrowserResult<Option<String>>;

    /// Click the first element matching `selector`, waiting at most `timeout`
    async fn click(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Click the first descendant of `scope` matching `selector`
    async fn click_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
        timeout: Duration,
    ) -> BrowserResult<()>;

    /// Replace the value of an input
    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()>;

    /// Press Enter in an input
    async fn submit(&self, selector: &str) -> BrowserResult<()>;

    /// Click `trigger` and capture the download it starts
    async fn download(&self, trigger: &ElementHandle, timeout: Duration)
        -> BrowserResult<Download>;

    /// Render the current page to a PDF file
    async fn capture_pdf(&self, path: &Path) -> BrowserResult<()>;

    /// Serialized markup of the current page
    async fn capture_markup(&self) -> BrowserResult<String>;
}
