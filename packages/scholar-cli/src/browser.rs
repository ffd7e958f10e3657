//! `BrowserPage` over a live WebDriver session.
//!
//! WebDriver lookups return immediately, so every bounded wait is a polling
//! loop. Downloads are captured by watching the browser's download directory
//! for a new completed file.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use scholar_crawler::{BrowserError, BrowserPage, BrowserResult, Download, ElementHandle};
use tokio::time::{sleep, Instant};
use webdriver_client::{
    ChromeCapabilities, ElementRef, Session, WebDriverClient, WebDriverError, ENTER_KEY,
};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Suffixes browsers use while a download is still being written.
const PARTIAL_SUFFIXES: &[&str] = &[".crdownload", ".part", ".tmp"];

#[derive(Clone)]
pub struct WebDriverPage {
    session: Session,
    download_dir: PathBuf,
    /// Wait for elements with no explicit timeout
    wait: Duration,
}

impl WebDriverPage {
    /// Start a Chrome session that saves downloads into `download_dir`.
    pub async fn launch(
        webdriver_url: &str,
        download_dir: PathBuf,
        headless: bool,
        wait: Duration,
    ) -> BrowserResult<Self> {
        tokio::fs::create_dir_all(&download_dir).await?;
        let download_dir = tokio::fs::canonicalize(&download_dir).await?;

        let capabilities = ChromeCapabilities::new()
            .headless(headless)
            .download_dir(download_dir.to_string_lossy());
        let session = WebDriverClient::new(webdriver_url)
            .new_session(&capabilities)
            .await
            .map_err(backend)?;

        Ok(Self {
            session,
            download_dir,
            wait,
        })
    }

    /// End the browser session.
    pub async fn close(self) -> BrowserResult<()> {
        self.session.delete().await.map_err(backend)
    }

    /// Poll `check` until it yields a value or `timeout` passes.
    async fn poll<T, F, Fut>(&self, selector: &str, timeout: Duration, check: F) -> BrowserResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>, WebDriverError>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            match check().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                // The page re-rendered under us; look again
                Err(err) if err.is_stale() || err.is_no_such_element() => {}
                Err(err) => return Err(backend(err)),
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> BrowserResult<ElementRef> {
        self.poll(selector, timeout, || async move {
            let found = self.session.find_elements(selector).await?;
            Ok::<_, WebDriverError>(found.into_iter().next())
        })
        .await
    }

    async fn wait_for_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
        timeout: Duration,
    ) -> BrowserResult<ElementRef> {
        let scope = &element_ref(scope);
        self.poll(selector, timeout, || async move {
            let found = self.session.find_elements_from(scope, selector).await?;
            Ok::<_, WebDriverError>(found.into_iter().next())
        })
        .await
    }

    async fn first_attribute(
        &self,
        candidates: Vec<ElementRef>,
        name: &str,
    ) -> Result<Option<String>, WebDriverError> {
        match candidates.first() {
            Some(element) => self.session.element_attribute(element, name).await,
            None => Ok(None),
        }
    }

    /// Completed files currently in the download directory.
    async fn downloaded_files(&self) -> BrowserResult<HashSet<PathBuf>> {
        let mut files = HashSet::new();
        let mut entries = tokio::fs::read_dir(&self.download_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
                files.insert(path);
            }
        }
        Ok(files)
    }
}

fn element_ref(handle: &ElementHandle) -> ElementRef {
    ElementRef {
        id: handle.0.clone(),
    }
}

fn handle(element: ElementRef) -> ElementHandle {
    ElementHandle(element.id)
}

fn backend(err: WebDriverError) -> BrowserError {
    BrowserError::Backend(Box::new(err))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        tracing::debug!(url = %url, "Navigating");
        self.session
            .navigate(url)
            .await
            .map_err(|err| BrowserError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn text(&self, selector: &str) -> BrowserResult<String> {
        let element = match self.wait_for(selector, self.wait).await {
            Ok(element) => element,
            Err(err) if err.is_absent() => {
                return Err(BrowserError::NotFound {
                    selector: selector.to_string(),
                })
            }
            Err(err) => return Err(err),
        };
        self.session.element_text(&element).await.map_err(backend)
    }

    async fn attribute(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> BrowserResult<String> {
        self.poll(selector, timeout, || async move {
            let candidates = self.session.find_elements(selector).await?;
            self.first_attribute(candidates, name).await
        })
        .await
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>> {
        let elements = self
            .session
            .find_elements(selector)
            .await
            .map_err(backend)?;
        Ok(elements.into_iter().map(handle).collect())
    }

    async fn find_all_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Vec<ElementHandle>> {
        let elements = self
            .session
            .find_elements_from(&element_ref(scope), selector)
            .await
            .map_err(backend)?;
        Ok(elements.into_iter().map(handle).collect())
    }

    async fn attribute_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> BrowserResult<String> {
        let scope = &element_ref(scope);
        self.poll(selector, timeout, || async move {
            let candidates = self.session.find_elements_from(scope, selector).await?;
            self.first_attribute(candidates, name).await
        })
        .await
    }

    async fn element_text(&self, element: &ElementHandle) -> BrowserResult<String> {
        self.session
            .element_text(&element_ref(element))
            .await
            .map_err(backend)
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        self.session
            .element_attribute(&element_ref(element), name)
            .await
            .map_err(backend)
    }

    async fn click(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let element = self.wait_for(selector, timeout).await?;
        self.session.element_click(&element).await.map_err(backend)
    }

    async fn click_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
        timeout: Duration,
    ) -> BrowserResult<()> {
        let element = self.wait_for_within(scope, selector, timeout).await?;
        self.session.element_click(&element).await.map_err(backend)
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let input = self.wait_for(selector, self.wait).await?;
        self.session.element_clear(&input).await.map_err(backend)?;
        self.session
            .element_send_keys(&input, text)
            .await
            .map_err(backend)
    }

    async fn submit(&self, selector: &str) -> BrowserResult<()> {
        let input = self.wait_for(selector, self.wait).await?;
        self.session
            .element_send_keys(&input, ENTER_KEY)
            .await
            .map_err(backend)
    }

    async fn download(
        &self,
        trigger: &ElementHandle,
        timeout: Duration,
    ) -> BrowserResult<Download> {
        let before = self.downloaded_files().await?;
        self.session
            .element_click(&element_ref(trigger))
            .await
            .map_err(backend)?;

        let deadline = Instant::now() + timeout;
        let path = loop {
            let mut fresh = self
                .downloaded_files()
                .await?
                .into_iter()
                .filter(|path| !before.contains(path));
            if let Some(path) = fresh.next() {
                break path;
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    selector: format!("download into {}", self.download_dir.display()),
                    waited: timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        };

        let bytes = tokio::fs::read(&path).await?;
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(file = ?path, bytes = bytes.len(), "Captured download");

        Ok(Download {
            suggested_name: file_name(&path),
            bytes,
        })
    }

    async fn capture_pdf(&self, path: &Path) -> BrowserResult<()> {
        let pdf = self.session.print_pdf().await.map_err(backend)?;
        tokio::fs::write(path, pdf).await?;
        Ok(())
    }

    async fn capture_markup(&self) -> BrowserResult<String> {
        self.session.page_source().await.map_err(backend)
    }
}
