//! Breadth-first walk over co-author links.
//!
//! The queue is FIFO and children are always enqueued one level below their
//! parent, so depths never decrease across pops: the first entry past the
//! depth limit means every remaining entry is past it too.

use std::collections::{HashSet, VecDeque};

use crate::config::{ExploreConfig, ItemFailurePolicy};
use crate::error::{CrawlError, CrawlResult};
use crate::identity::ProfileKey;
use crate::layout::OutputLayout;
use crate::site::{self, profile};
use crate::storage::RecordStore;
use crate::traits::BrowserPage;
use crate::types::{FrontierEntry, ProfileEntry, ProfileRecord, TraversalStats};

pub struct ProfileExplorer<B> {
    browser: B,
    store: RecordStore<ProfileRecord>,
    layout: OutputLayout,
    config: ExploreConfig,
}

impl<B: BrowserPage> ProfileExplorer<B> {
    pub fn new(
        browser: B,
        store: RecordStore<ProfileRecord>,
        layout: OutputLayout,
        config: ExploreConfig,
    ) -> Self {
        Self {
            browser,
            store,
            layout,
            config,
        }
    }

    pub fn store(&self) -> &RecordStore<ProfileRecord> {
        &self.store
    }

    pub fn into_store(self) -> RecordStore<ProfileRecord> {
        self.store
    }

    /// Walk from `seeds` until the queue drains or the depth limit is passed.
    pub async fn run(&mut self, seeds: &[String]) -> CrawlResult<TraversalStats> {
        self.layout
            .ensure_dirs()
            .await
            .map_err(|source| CrawlError::Snapshot {
                path: self.layout.root().to_path_buf(),
                source,
            })?;

        let mut queue: VecDeque<FrontierEntry> =
            seeds.iter().map(FrontierEntry::seed).collect();
        // Keys whose co-authors were already queued during this run
        let mut expanded: HashSet<ProfileKey> = HashSet::new();
        let mut stats = TraversalStats::default();

        tracing::info!(
            seeds = seeds.len(),
            depth_limit = self.config.depth_limit,
            known_profiles = self.store.len(),
            "Starting profile exploration"
        );

        while let Some(entry) = queue.pop_front() {
            if entry.depth > self.config.depth_limit {
                tracing::info!(
                    depth = entry.depth,
                    depth_limit = self.config.depth_limit,
                    remaining = queue.len() + 1,
                    "Depth limit passed, stopping"
                );
                break;
            }
            stats.max_depth_reached = entry.depth;

            match self
                .process_entry(&entry, &mut queue, &mut expanded, &mut stats)
                .await
            {
                Ok(()) => {}
                Err(err @ CrawlError::Store(_)) => return Err(err),
                Err(err) => match self.config.on_error {
                    ItemFailurePolicy::Abort => return Err(err),
                    ItemFailurePolicy::Skip => {
                        tracing::warn!(
                            reference = %entry.reference,
                            depth = entry.depth,
                            error = %err,
                            "Skipping profile"
                        );
                        stats.entries_failed += 1;
                    }
                },
            }
        }

        tracing::info!(
            visited = stats.profiles_visited,
            known = stats.profiles_known,
            appended = stats.records_appended,
            failed = stats.entries_failed,
            "Profile exploration completed"
        );

        Ok(stats)
    }

    async fn process_entry(
        &mut self,
        entry: &FrontierEntry,
        queue: &mut VecDeque<FrontierEntry>,
        expanded: &mut HashSet<ProfileKey>,
        stats: &mut TraversalStats,
    ) -> CrawlResult<()> {
        let key = ProfileKey::from_reference(&entry.reference)?;

        if let Some(known) = self.store.get(key.as_str()) {
            stats.profiles_known += 1;
            if expanded.insert(key) {
                tracing::info!(
                    reference = %entry.reference,
                    depth = entry.depth,
                    "Profile already collected"
                );
                queue.extend(known.co_authors.iter().map(|co| entry.child(&co.url)));
            }
            return Ok(());
        }

        tracing::info!(reference = %entry.reference, depth = entry.depth, "Visiting profile");

        let record = self.visit(&key, &entry.reference).await?;
        stats.profiles_visited += 1;

        queue.extend(record.co_authors.iter().map(|co| entry.child(&co.url)));
        expanded.insert(key);

        if self.store.append(record).await? {
            stats.records_appended += 1;
        }
        Ok(())
    }

    /// Fetch one profile page and build its record, snapshots included.
    async fn visit(&self, key: &ProfileKey, reference: &str) -> CrawlResult<ProfileRecord> {
        let url = site::profile_url(&self.config.base_url, reference, self.config.order_by_year)?;
        self.browser.navigate(&url).await?;

        let name = self.browser.text(profile::NAME).await?;
        let brief = self.browser.text(profile::BRIEF).await?;
        let cited_stats = self.browser.text(profile::CITED_STATS).await?;

        let homepage = match self
            .browser
            .attribute(profile::HOMEPAGE, "href", self.config.timeouts.optional_field)
            .await
        {
            Ok(href) => href,
            Err(err) if err.is_absent() => {
                tracing::debug!(profile = %key, "No homepage listed");
                String::new()
            }
            Err(err) => return Err(err.into()),
        };

        let co_authors = self.co_authors().await?;
        let articles = self.texts(profile::ARTICLE_TITLES).await?;
        let tags = self.texts(profile::TAGS).await?;

        tracing::debug!(
            profile = %key,
            name = %name,
            co_authors = co_authors.len(),
            articles = articles.len(),
            tags = tags.len(),
            "Extracted profile"
        );

        let pdf_path = self.layout.pdf_snapshot(key);
        self.browser.capture_pdf(&pdf_path).await?;

        let html_path = self.layout.html_snapshot(key);
        let markup = self.browser.capture_markup().await?;
        tokio::fs::write(&html_path, markup)
            .await
            .map_err(|source| CrawlError::Snapshot {
                path: html_path.clone(),
                source,
            })?;

        Ok(ProfileRecord {
            key: key.clone(),
            url: reference.to_string(),
            name,
            homepage,
            brief,
            cited_stats,
            co_authors,
            articles,
            tags,
            pdf_path: pdf_path.to_string_lossy().into_owned(),
            html_path: html_path.to_string_lossy().into_owned(),
        })
    }

    async fn co_authors(&self) -> CrawlResult<Vec<ProfileEntry>> {
        let mut co_authors = Vec::new();
        for link in self.browser.find_all(profile::CO_AUTHORS).await? {
            let name = self.browser.element_text(&link).await?;
            match self.browser.element_attribute(&link, "href").await? {
                Some(url) => co_authors.push(ProfileEntry::new(name, url)),
                None => tracing::debug!(name = %name, "Co-author without profile link"),
            }
        }
        Ok(co_authors)
    }

    async fn texts(&self, selector: &str) -> CrawlResult<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.browser.find_all(selector).await? {
            texts.push(self.browser.element_text(&element).await?);
        }
        Ok(texts)
    }
}

/// Explore from `seeds`, resuming from the profile log under `layout`.
pub async fn explore_profiles<B: BrowserPage>(
    browser: B,
    layout: &OutputLayout,
    seeds: &[String],
    config: ExploreConfig,
) -> CrawlResult<TraversalStats> {
    let store = RecordStore::open(layout.profiles_log()).await?;
    let mut explorer = ProfileExplorer::new(browser, store, layout.clone(), config);
    explorer.run(seeds).await
}
