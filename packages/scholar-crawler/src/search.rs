//! Paginated author search with per-result citation export.

use crate::citation::parse_endnote;
use crate::config::{ItemFailurePolicy, SearchConfig};
use crate::error::{CrawlError, CrawlResult};
use crate::site::{self, search};
use crate::storage::RecordStore;
use crate::traits::{BrowserPage, ElementHandle};
use crate::types::{ProfileEntry, SearchRecord, SearchStats};

/// Outcome of one result item.
enum Collected {
    Appended,
    Known,
}

pub struct AuthorSearch<B> {
    browser: B,
    store: RecordStore<SearchRecord>,
    config: SearchConfig,
}

impl<B: BrowserPage> AuthorSearch<B> {
    pub fn new(browser: B, store: RecordStore<SearchRecord>, config: SearchConfig) -> Self {
        Self {
            browser,
            store,
            config,
        }
    }

    pub fn store(&self) -> &RecordStore<SearchRecord> {
        &self.store
    }

    pub fn into_store(self) -> RecordStore<SearchRecord> {
        self.store
    }

    /// Search each author in order, collecting up to `page_limit` pages each.
    pub async fn run(&mut self, authors: &[String]) -> CrawlResult<SearchStats> {
        let mut stats = SearchStats::default();

        tracing::info!(
            authors = authors.len(),
            page_limit = self.config.page_limit,
            known_results = self.store.len(),
            "Starting author search"
        );

        for author in authors {
            self.search_author(author, &mut stats).await?;
            stats.seeds_processed += 1;
        }

        tracing::info!(
            seeds = stats.seeds_processed,
            pages = stats.pages_processed,
            appended = stats.records_appended,
            known = stats.results_known,
            failed = stats.items_failed,
            "Author search completed"
        );

        Ok(stats)
    }

    async fn search_author(&mut self, author: &str, stats: &mut SearchStats) -> CrawlResult<()> {
        let query = site::author_query(author, self.config.keyword.as_deref());
        tracing::info!(author = %author, query = %query, "Searching");

        self.browser.navigate(&self.config.search_url).await?;
        self.browser.fill(search::QUERY_INPUT, &query).await?;
        self.browser.submit(search::QUERY_INPUT).await?;

        for page in 0..self.config.page_limit {
            if page > 0 {
                // Any failure to advance ends this author's results
                if let Err(err) = self
                    .browser
                    .click(search::NEXT_PAGE, self.config.timeouts.pagination)
                    .await
                {
                    tracing::warn!(author = %author, page, error = %err, "No more pages to process");
                    break;
                }
            }
            stats.pages_processed += 1;

            let items = self.browser.find_all(search::RESULT_ITEM).await?;
            tracing::debug!(author = %author, page, items = items.len(), "Result page loaded");

            for item in &items {
                match self.collect_result(item).await {
                    Ok(Collected::Appended) => stats.records_appended += 1,
                    Ok(Collected::Known) => stats.results_known += 1,
                    Err(err @ CrawlError::Store(_)) => return Err(err),
                    Err(err) => match self.config.on_error {
                        ItemFailurePolicy::Abort => return Err(err),
                        ItemFailurePolicy::Skip => {
                            tracing::warn!(
                                author = %author,
                                page,
                                error = %err,
                                "Skipping search result"
                            );
                            stats.items_failed += 1;
                        }
                    },
                }
            }
        }

        Ok(())
    }

    async fn collect_result(&mut self, item: &ElementHandle) -> CrawlResult<Collected> {
        let url = self
            .browser
            .attribute_within(item, search::RESULT_LINK, "href", self.config.timeouts.result_key)
            .await?;

        if self.store.has(&url) {
            tracing::info!(url = %url, "Result already collected");
            return Ok(Collected::Known);
        }

        self.browser
            .click_within(item, search::CITE_BUTTON, self.config.timeouts.dialog)
            .await?;
        let exported = match self.export_endnote().await {
            Ok(exported) => exported,
            Err(err) => {
                // Leave the page usable for the next item
                if let Err(close_err) = self
                    .browser
                    .click(search::CITE_CLOSE, self.config.timeouts.dialog)
                    .await
                {
                    tracing::debug!(error = %close_err, "Could not close citation dialog");
                }
                return Err(err);
            }
        };
        self.browser
            .click(search::CITE_CLOSE, self.config.timeouts.dialog)
            .await?;

        let citation = parse_endnote(&exported);
        tracing::info!(url = %url, title = ?citation.title, "Citation exported");

        let profiles = self.result_profiles(item).await?;

        let record = SearchRecord {
            url,
            citation,
            profiles,
        };
        if self.store.append(record).await? {
            Ok(Collected::Appended)
        } else {
            Ok(Collected::Known)
        }
    }

    /// Download the EndNote export from the open citation dialog.
    async fn export_endnote(&self) -> CrawlResult<String> {
        // Waits for the dialog's export links to load
        self.browser
            .attribute(search::CITE_FORMATS, "href", self.config.timeouts.dialog)
            .await?;

        let mut endnote = None;
        for link in self.browser.find_all(search::CITE_FORMATS).await? {
            if self.browser.element_text(&link).await?.trim() == search::ENDNOTE_LABEL {
                endnote = Some(link);
                break;
            }
        }
        let link = endnote.ok_or_else(|| CrawlError::RequiredField {
            field: "endnote export",
            reason: "no EndNote link in citation dialog".to_string(),
        })?;

        let download = self
            .browser
            .download(&link, self.config.timeouts.download)
            .await?;
        tracing::debug!(file = %download.suggested_name, bytes = download.bytes.len(), "Export downloaded");

        download
            .text()
            .map(str::to_string)
            .map_err(|err| CrawlError::RequiredField {
                field: "endnote export",
                reason: err.to_string(),
            })
    }

    /// Author names shown under a result that link to a profile.
    async fn result_profiles(&self, item: &ElementHandle) -> CrawlResult<Vec<ProfileEntry>> {
        let mut profiles = Vec::new();
        for link in self
            .browser
            .find_all_within(item, search::RESULT_AUTHORS)
            .await?
        {
            let name = self.browser.element_text(&link).await?;
            match self.browser.element_attribute(&link, "href").await? {
                Some(url) => profiles.push(ProfileEntry::new(name, url)),
                None => tracing::debug!(name = %name, "Author link without href"),
            }
        }
        Ok(profiles)
    }
}

/// Search `authors`, resuming from the result log at `results_log`.
pub async fn search_authors<B: BrowserPage>(
    browser: B,
    results_log: impl Into<std::path::PathBuf>,
    authors: &[String],
    config: SearchConfig,
) -> CrawlResult<SearchStats> {
    let store = RecordStore::open(results_log).await?;
    let mut search = AuthorSearch::new(browser, store, config);
    search.run(authors).await
}
