use serde::{Deserialize, Deserializer, Serialize};

use crate::citation::Citation;
use crate::error::MalformedReference;
use crate::identity::ProfileKey;
use crate::storage::Record;

// ============================================================================
// RECORDS (one JSON object per log line)
// ============================================================================

/// A named link to a profile, as displayed next to a result or in a
/// co-author list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    #[serde(deserialize_with = "one_or_first")]
    pub name: String,
    pub url: String,
}

impl ProfileEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One visited profile page. Written once, on first visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredProfile")]
pub struct ProfileRecord {
    pub key: ProfileKey,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub homepage: String,
    pub brief: String,
    pub cited_stats: String,
    pub co_authors: Vec<ProfileEntry>,
    pub articles: Vec<String>,
    pub tags: Vec<String>,
    pub pdf_path: String,
    pub html_path: String,
}

/// Profile line as read back. Logs from earlier tooling carry no `key`.
#[derive(Deserialize)]
struct StoredProfile {
    #[serde(default)]
    key: Option<ProfileKey>,
    url: String,
    name: String,
    #[serde(default)]
    homepage: String,
    brief: String,
    cited_stats: String,
    co_authors: Vec<ProfileEntry>,
    articles: Vec<String>,
    tags: Vec<String>,
    pdf_path: String,
    html_path: String,
}

impl TryFrom<StoredProfile> for ProfileRecord {
    type Error = MalformedReference;

    fn try_from(stored: StoredProfile) -> Result<Self, Self::Error> {
        let key = match stored.key {
            Some(key) => key,
            None => ProfileKey::from_reference(&stored.url)?,
        };
        Ok(Self {
            key,
            url: stored.url,
            name: stored.name,
            homepage: stored.homepage,
            brief: stored.brief,
            cited_stats: stored.cited_stats,
            co_authors: stored.co_authors,
            articles: stored.articles,
            tags: stored.tags,
            pdf_path: stored.pdf_path,
            html_path: stored.html_path,
        })
    }
}

impl Record for ProfileRecord {
    fn dedup_key(&self) -> &str {
        self.key.as_str()
    }
}

/// One search result with its exported citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Canonical link of the result; doubles as its identity.
    pub url: String,
    pub citation: Citation,
    pub profiles: Vec<ProfileEntry>,
}

impl Record for SearchRecord {
    fn dedup_key(&self) -> &str {
        &self.url
    }
}

/// Accepts a string or a list of strings, keeping the first element.
///
/// Older logs captured some names as lists.
fn one_or_first<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => name,
        OneOrMany::Many(names) => names.into_iter().next().unwrap_or_default(),
    })
}

// ============================================================================
// TRAVERSAL STATE & RESULTS
// ============================================================================

/// A queued profile reference. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub reference: String,
    pub depth: usize,
}

impl FrontierEntry {
    pub fn seed(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            depth: 0,
        }
    }

    /// Entry for a reference discovered while processing `self`.
    pub fn child(&self, reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            depth: self.depth + 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub profiles_visited: usize,
    pub profiles_known: usize,
    pub records_appended: usize,
    pub entries_failed: usize,
    /// Deepest level whose entries were processed.
    pub max_depth_reached: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub seeds_processed: usize,
    pub pages_processed: usize,
    pub results_known: usize,
    pub records_appended: usize,
    pub items_failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_valued_name_normalized() {
        let entry: ProfileEntry =
            serde_json::from_str(r#"{"name": ["Ada Lovelace", "extra"], "url": "/citations?user=A"}"#)
                .unwrap();
        assert_eq!(entry.name, "Ada Lovelace");

        let empty: ProfileEntry = serde_json::from_str(r#"{"name": [], "url": "u"}"#).unwrap();
        assert_eq!(empty.name, "");
    }

    #[test]
    fn test_profile_without_key_derives_it_from_url() {
        let line = r#"{"url": "/citations?user=OLD1&hl=en", "name": "Old", "brief": "",
            "cited_stats": "", "co_authors": [], "articles": [], "tags": [],
            "pdf_path": "p.pdf", "html_path": "h.html"}"#;

        let record: ProfileRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.key.as_str(), "OLD1");
        assert_eq!(record.homepage, "");
    }

    #[test]
    fn test_profile_without_key_and_user_is_rejected() {
        let line = r#"{"url": "/citations?hl=en", "name": "Old", "brief": "",
            "cited_stats": "", "co_authors": [], "articles": [], "tags": [],
            "pdf_path": "p.pdf", "html_path": "h.html"}"#;

        assert!(serde_json::from_str::<ProfileRecord>(line).is_err());
    }

    #[test]
    fn test_child_depth() {
        let seed = FrontierEntry::seed("/citations?user=A");
        let child = seed.child("/citations?user=B");

        assert_eq!(seed.depth, 0);
        assert_eq!(child.depth, 1);
        assert_eq!(child.child("x").depth, 2);
    }
}
