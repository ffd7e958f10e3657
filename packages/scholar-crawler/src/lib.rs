//! Resumable Google Scholar crawler
//!
//! Two traversals feed append-only JSON Lines logs that double as resume
//! checkpoints:
//!
//! - **Profile exploration** walks co-author links breadth-first from seed
//!   profiles, saving PDF and HTML snapshots of every visited page.
//! - **Author search** pages through results for `author:"..."` queries and
//!   exports each result's EndNote citation.
//!
//! Re-running either traversal with the same inputs skips everything already
//! logged. An offline repair pass re-derives article titles and tags from the
//! saved HTML snapshots.
//!
//! # Usage
//!
//! ```rust,ignore
//! use scholar_crawler::{explore_profiles, ExploreConfig, OutputLayout};
//! use scholar_crawler::testing::FakeBrowser;
//!
//! let layout = OutputLayout::new("./out");
//! let stats = explore_profiles(
//!     FakeBrowser::new(),
//!     &layout,
//!     &["/citations?user=ABC123".to_string()],
//!     ExploreConfig::new(2),
//! )
//! .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - The browser capability the traversals drive
//! - [`storage`] - Deduplicating JSON Lines record store
//! - [`explore`] / [`search`] - The two traversals
//! - [`repair`] - Offline snapshot re-extraction
//! - [`testing`] - Scripted fake browser

pub mod citation;
pub mod config;
pub mod error;
pub mod explore;
pub mod identity;
pub mod layout;
pub mod listing;
pub mod lock;
pub mod markup;
pub mod repair;
pub mod search;
pub mod site;
pub mod storage;
pub mod testing;
pub mod traits;
pub mod types;

pub use citation::{parse_endnote, Citation};
pub use config::{ExploreConfig, ItemFailurePolicy, SearchConfig, Timeouts};
pub use error::{
    BrowserError, BrowserResult, CrawlError, CrawlResult, MalformedReference, RepairError,
    RepairResult, StoreError, StoreResult,
};
pub use explore::{explore_profiles, ProfileExplorer};
pub use identity::ProfileKey;
pub use layout::OutputLayout;
pub use listing::{author_names, profile_urls};
pub use lock::{remove_stale_lock, LockError, LockMeta, OutputLock};
pub use markup::ProfileMarkup;
pub use repair::{repair_profiles, RepairReport};
pub use search::{search_authors, AuthorSearch};
pub use storage::{read_records, Record, RecordStore};
pub use traits::{BrowserPage, Download, ElementHandle};
pub use types::{
    FrontierEntry, ProfileEntry, ProfileRecord, SearchRecord, SearchStats, TraversalStats,
};
