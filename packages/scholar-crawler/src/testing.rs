//! Testing utilities: a scripted in-memory browser.
//!
//! [`FakeBrowser`] serves [`FakePage`]s keyed by URL. Elements carry text,
//! attributes, scoped children and click behavior, which is enough to drive
//! both traversals without a real browser.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BrowserError, BrowserResult};
use crate::site::search;
use crate::traits::{BrowserPage, Download, ElementHandle};

/// What happens when something is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeAction {
    Navigate(String),
    /// Opens the citation dialog for a result, holding its EndNote export
    OpenCitation(String),
    /// Export link inside the citation dialog
    ExportCitation,
    CloseCitation,
    /// The click itself fails with a backend error
    Fail(String),
}

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    attributes: HashMap<String, String>,
    children: HashMap<String, Vec<FakeElement>>,
    clicks: HashMap<String, FakeAction>,
    on_click: Option<FakeAction>,
}

impl FakeElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Anchor with visible text and an `href`.
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(text).with_attr("href", href)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a descendant reachable through `selector`.
    pub fn with_child(mut self, selector: impl Into<String>, child: FakeElement) -> Self {
        self.children.entry(selector.into()).or_default().push(child);
        self
    }

    /// Behavior of clicking the descendant matching `selector`.
    pub fn with_click(mut self, selector: impl Into<String>, action: FakeAction) -> Self {
        self.clicks.insert(selector.into(), action);
        self
    }

    pub fn on_click(mut self, action: FakeAction) -> Self {
        self.on_click = Some(action);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    texts: HashMap<String, String>,
    elements: HashMap<String, Vec<FakeElement>>,
    clicks: HashMap<String, FakeAction>,
    markup: String,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, selector: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(selector.into(), text.into());
        self
    }

    pub fn with_element(mut self, selector: impl Into<String>, element: FakeElement) -> Self {
        self.elements
            .entry(selector.into())
            .or_default()
            .push(element);
        self
    }

    pub fn with_click(mut self, selector: impl Into<String>, action: FakeAction) -> Self {
        self.clicks.insert(selector.into(), action);
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    /// Citation dialog controls shared by every result on a search page.
    pub fn with_citation_dialog(self) -> Self {
        self.with_element(search::CITE_FORMATS, FakeElement::link("BibTeX", "/scholar.bib"))
            .with_element(
                search::CITE_FORMATS,
                FakeElement::link("EndNote", "/scholar.enw").on_click(FakeAction::ExportCitation),
            )
            .with_click(search::CITE_CLOSE, FakeAction::CloseCitation)
    }
}

#[derive(Default)]
struct FakeState {
    pages: HashMap<String, FakePage>,
    /// Submitted query → results URL
    searches: HashMap<String, String>,
    failing_urls: HashSet<String>,
    current: Option<String>,
    /// Elements handed out since the last navigation
    handles: Vec<FakeElement>,
    inputs: HashMap<String, String>,
    open_citation: Option<String>,
    navigations: Vec<String>,
    downloads: usize,
}

impl FakeState {
    fn go(&mut self, url: &str) -> BrowserResult<()> {
        self.navigations.push(url.to_string());
        if self.failing_urls.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        if !self.pages.contains_key(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "no such page".to_string(),
            });
        }
        self.current = Some(url.to_string());
        self.handles.clear();
        self.open_citation = None;
        Ok(())
    }

    fn page(&self) -> BrowserResult<&FakePage> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .ok_or_else(|| BrowserError::Backend("no page loaded".into()))
    }

    fn element(&self, handle: &ElementHandle) -> BrowserResult<&FakeElement> {
        handle
            .0
            .strip_prefix("fake-")
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| self.handles.get(index))
            .ok_or_else(|| BrowserError::Backend(format!("stale handle {}", handle.0).into()))
    }

    fn hand_out(&mut self, elements: Vec<FakeElement>) -> Vec<ElementHandle> {
        elements
            .into_iter()
            .map(|element| {
                self.handles.push(element);
                ElementHandle(format!("fake-{}", self.handles.len() - 1))
            })
            .collect()
    }

    fn apply(&mut self, action: FakeAction) -> BrowserResult<()> {
        match action {
            FakeAction::Navigate(url) => self.go(&url)?,
            FakeAction::OpenCitation(text) => self.open_citation = Some(text),
            FakeAction::ExportCitation => {}
            FakeAction::CloseCitation => self.open_citation = None,
            FakeAction::Fail(reason) => return Err(BrowserError::Backend(reason.into())),
        }
        Ok(())
    }
}

fn timeout(selector: &str, waited: Duration) -> BrowserError {
    BrowserError::Timeout {
        selector: selector.to_string(),
        waited,
    }
}

/// Scripted browser. Clones share state.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, page: FakePage) -> Self {
        self.state.lock().unwrap().pages.insert(url.into(), page);
        self
    }

    /// Submitting `query` in the search box lands on `results_url`.
    pub fn with_search(self, query: impl Into<String>, results_url: impl Into<String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .searches
            .insert(query.into(), results_url.into());
        self
    }

    /// Navigating to `url` fails.
    pub fn failing_navigation(self, url: impl Into<String>) -> Self {
        self.state.lock().unwrap().failing_urls.insert(url.into());
        self
    }

    /// Every URL navigated to, in order, including failed attempts.
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn downloads(&self) -> usize {
        self.state.lock().unwrap().downloads
    }
}

#[async_trait]
impl BrowserPage for FakeBrowser {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.state.lock().unwrap().go(url)
    }

    async fn text(&self, selector: &str) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        let page = state.page()?;
        page.texts
            .get(selector)
            .cloned()
            .or_else(|| {
                page.elements
                    .get(selector)
                    .and_then(|elements| elements.first())
                    .map(|element| element.text.clone())
            })
            .ok_or_else(|| BrowserError::NotFound {
                selector: selector.to_string(),
            })
    }

    async fn attribute(
        &self,
        selector: &str,
        name: &str,
        timeout_after: Duration,
    ) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        state
            .page()?
            .elements
            .get(selector)
            .and_then(|elements| elements.first())
            .and_then(|element| element.attributes.get(name).cloned())
            .ok_or_else(|| timeout(selector, timeout_after))
    }

    async fn find_all(&self, selector: &str) -> BrowserResult<Vec<ElementHandle>> {
        let mut state = self.state.lock().unwrap();
        let elements = state
            .page()?
            .elements
            .get(selector)
            .cloned()
            .unwrap_or_default();
        Ok(state.hand_out(elements))
    }

    async fn find_all_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Vec<ElementHandle>> {
        let mut state = self.state.lock().unwrap();
        let elements = state
            .element(scope)?
            .children
            .get(selector)
            .cloned()
            .unwrap_or_default();
        Ok(state.hand_out(elements))
    }

    async fn attribute_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
        name: &str,
        timeout_after: Duration,
    ) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        state
            .element(scope)?
            .children
            .get(selector)
            .and_then(|elements| elements.first())
            .and_then(|element| element.attributes.get(name).cloned())
            .ok_or_else(|| timeout(selector, timeout_after))
    }

    async fn element_text(&self, element: &ElementHandle) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        Ok(state.element(element)?.text.clone())
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.element(element)?.attributes.get(name).cloned())
    }

    async fn click(&self, selector: &str, timeout_after: Duration) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        let action = state
            .page()?
            .clicks
            .get(selector)
            .cloned()
            .ok_or_else(|| timeout(selector, timeout_after))?;
        state.apply(action)
    }

    async fn click_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
        timeout_after: Duration,
    ) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        let action = state
            .element(scope)?
            .clicks
            .get(selector)
            .cloned()
            .ok_or_else(|| timeout(selector, timeout_after))?;
        state.apply(action)
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        state.page()?;
        state.inputs.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn submit(&self, selector: &str) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        let url = state
            .inputs
            .get(selector)
            .and_then(|query| state.searches.get(query))
            .cloned()
            .ok_or_else(|| BrowserError::NotFound {
                selector: selector.to_string(),
            })?;
        state.go(&url)
    }

    async fn download(
        &self,
        trigger: &ElementHandle,
        timeout_after: Duration,
    ) -> BrowserResult<Download> {
        let mut state = self.state.lock().unwrap();
        let exports = state.element(trigger)?.on_click == Some(FakeAction::ExportCitation);
        let text = state
            .open_citation
            .clone()
            .filter(|_| exports)
            .ok_or_else(|| timeout(&trigger.0, timeout_after))?;
        state.downloads += 1;
        Ok(Download {
            suggested_name: "scholar.enw".to_string(),
            bytes: text.into_bytes(),
        })
    }

    async fn capture_pdf(&self, path: &Path) -> BrowserResult<()> {
        let url = {
            let state = self.state.lock().unwrap();
            state.page()?;
            state.current.clone().unwrap_or_default()
        };
        tokio::fs::write(path, format!("%PDF-1.4 fake render of {url}")).await?;
        Ok(())
    }

    async fn capture_markup(&self) -> BrowserResult<String> {
        let state = self.state.lock().unwrap();
        Ok(state.page()?.markup.clone())
    }
}
