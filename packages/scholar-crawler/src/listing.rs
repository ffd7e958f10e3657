//! Reports over a collected search-result log.
//!
//! Reading never writes, so these are safe to run next to an active search.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::StoreResult;
use crate::storage::read_records;
use crate::types::SearchRecord;

/// Unique profile links shown next to any result. Feeds profile exploration.
pub async fn profile_urls(results_log: &Path) -> StoreResult<BTreeSet<String>> {
    let records = read_records::<SearchRecord>(results_log).await?;
    Ok(records
        .into_iter()
        .flat_map(|record| record.profiles.into_iter().map(|profile| profile.url))
        .collect())
}

/// Unique author names across all exported citations.
pub async fn author_names(results_log: &Path) -> StoreResult<BTreeSet<String>> {
    let records = read_records::<SearchRecord>(results_log).await?;
    Ok(records
        .into_iter()
        .flat_map(|record| record.citation.authors)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::parse_endnote;
    use crate::storage::RecordStore;
    use crate::types::ProfileEntry;

    #[tokio::test]
    async fn test_listings_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gs_result.jsonl");
        let mut store = RecordStore::open(&path).await.unwrap();
        store
            .append(SearchRecord {
                url: "https://a".to_string(),
                citation: parse_endnote("%A Doe, A.\n%A Roe, B."),
                profiles: vec![ProfileEntry::new("A Doe", "/citations?user=DOE")],
            })
            .await
            .unwrap();
        store
            .append(SearchRecord {
                url: "https://b".to_string(),
                citation: parse_endnote("%A Doe, A."),
                profiles: vec![
                    ProfileEntry::new("A Doe", "/citations?user=DOE"),
                    ProfileEntry::new("C Poe", "/citations?user=POE"),
                ],
            })
            .await
            .unwrap();

        let urls = profile_urls(&path).await.unwrap();
        let names = author_names(&path).await.unwrap();

        assert_eq!(
            urls.into_iter().collect::<Vec<_>>(),
            vec!["/citations?user=DOE", "/citations?user=POE"]
        );
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["Doe, A.", "Roe, B."]);
    }

    #[tokio::test]
    async fn test_listing_leaves_partial_line_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gs_result.jsonl");
        let mut store = RecordStore::open(&path).await.unwrap();
        store
            .append(SearchRecord {
                url: "https://a".to_string(),
                citation: parse_endnote("%A Doe, A."),
                profiles: vec![ProfileEntry::new("A Doe", "/citations?user=DOE")],
            })
            .await
            .unwrap();
        // A concurrent search halfway through its next line
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        std::io::Write::write_all(&mut file, br#"{"url": "https://b", "citation": {"#).unwrap();
        let before = std::fs::read(&path).unwrap();

        let urls = profile_urls(&path).await.unwrap();
        let names = author_names(&path).await.unwrap();

        assert_eq!(urls.len(), 1);
        assert_eq!(names.len(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
