//! Offline correction of the profile log from saved HTML snapshots.
//!
//! The source log is only read, never written; every line of it is carried
//! over, corrected, to a new suffixed sibling file.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{RepairError, RepairResult, StoreError};
use crate::layout::OutputLayout;
use crate::markup::ProfileMarkup;
use crate::storage::read_records;
use crate::types::ProfileRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub destination: PathBuf,
    pub records: usize,
    /// Records whose articles and tags were re-read from a snapshot
    pub repaired: usize,
    pub missing_snapshots: usize,
}

/// Suffix used when the caller supplies none.
pub fn timestamp_suffix() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Rewrite the profile log under `layout` into `gs_profiles_<suffix>.jsonl`.
///
/// Every committed source line yields one output line, duplicates included.
/// List-valued co-author names are reduced to their first element while
/// reading; article titles and tags are recomputed from each record's HTML
/// snapshot, looked up by file name in the layout's snapshot directory.
pub async fn repair_profiles(
    layout: &OutputLayout,
    suffix: Option<&str>,
) -> RepairResult<RepairReport> {
    let suffix = suffix.map_or_else(timestamp_suffix, str::to_string);
    let destination = layout.versioned_profiles_log(&suffix);
    if suffix.is_empty() || suffix.contains(['/', '\\']) {
        return Err(RepairError::Destination {
            path: destination,
            reason: "suffix must be a non-empty file name fragment",
        });
    }

    let mut records = read_records::<ProfileRecord>(&layout.profiles_log()).await?;

    let mut repaired = 0;
    let mut missing_snapshots = 0;
    for record in &mut records {
        let Some(file_name) = Path::new(&record.html_path).file_name() else {
            tracing::warn!(profile = %record.key, "Record has no snapshot path");
            missing_snapshots += 1;
            continue;
        };
        let snapshot = layout.html_dir().join(file_name);

        let html = match tokio::fs::read_to_string(&snapshot).await {
            Ok(html) => html,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(profile = %record.key, path = ?snapshot, "Snapshot missing, keeping record as is");
                missing_snapshots += 1;
                continue;
            }
            Err(source) => {
                return Err(RepairError::Io {
                    path: snapshot,
                    source,
                })
            }
        };

        let markup = ProfileMarkup::parse(&html);
        record.articles = markup.articles;
        record.tags = markup.tags;
        repaired += 1;
    }

    let mut contents = String::new();
    for record in &records {
        contents.push_str(&serde_json::to_string(record).map_err(StoreError::Encode)?);
        contents.push('\n');
    }
    write_new(&destination, contents.as_bytes()).await?;

    tracing::info!(
        destination = ?destination,
        records = records.len(),
        repaired,
        missing_snapshots,
        "Profile log repaired"
    );

    Ok(RepairReport {
        destination,
        records: records.len(),
        repaired,
        missing_snapshots,
    })
}

/// Write `bytes` to a file that must not exist yet.
async fn write_new(path: &Path, bytes: &[u8]) -> RepairResult<()> {
    let io_error = |source| RepairError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(RepairError::Destination {
                path: path.to_path_buf(),
                reason: "file already exists",
            })
        }
        Err(err) => return Err(io_error(err)),
    };
    file.write_all(bytes).await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ProfileKey;
    use crate::storage::RecordStore;
    use crate::types::ProfileEntry;

    fn record(layout: &OutputLayout, user: &str) -> ProfileRecord {
        let key = ProfileKey::from_reference(&format!("/citations?user={user}")).unwrap();
        ProfileRecord {
            url: format!("/citations?user={user}"),
            name: format!("Name {user}"),
            homepage: String::new(),
            brief: "Somewhere".to_string(),
            cited_stats: "Citations 10".to_string(),
            co_authors: vec![ProfileEntry::new("Co", "/citations?user=CO")],
            articles: vec!["stale".to_string()],
            tags: vec![],
            pdf_path: layout.pdf_snapshot(&key).to_string_lossy().into_owned(),
            html_path: format!("/elsewhere/old_root/gs_htmls/profile_{user}.html"),
            key,
        }
    }

    async fn seed_log(layout: &OutputLayout, lines: &[String]) {
        layout.ensure_dirs().await.unwrap();
        std::fs::write(layout.profiles_log(), lines.join("\n") + "\n").unwrap();
    }

    #[tokio::test]
    async fn test_repair_rereads_snapshots_into_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let mut raw = serde_json::to_value(record(&layout, "A")).unwrap();
        raw["co_authors"][0]["name"] = serde_json::json!(["Co Author", "dup"]);
        seed_log(&layout, &[raw.to_string()]).await;
        std::fs::write(
            layout.html_dir().join("profile_A.html"),
            r#"<a class="gsc_a_at">Fresh Paper</a><a class="gsc_prf_inta gs_ibl">Physics</a>"#,
        )
        .unwrap();
        let original = std::fs::read(layout.profiles_log()).unwrap();

        let report = repair_profiles(&layout, Some("v2")).await.unwrap();

        assert_eq!(report.destination, layout.versioned_profiles_log("v2"));
        assert_eq!(report.records, 1);
        assert_eq!(report.repaired, 1);
        assert_eq!(std::fs::read(layout.profiles_log()).unwrap(), original);

        let repaired = RecordStore::<ProfileRecord>::open(&report.destination)
            .await
            .unwrap();
        let fixed = repaired.get("A").unwrap();
        assert_eq!(fixed.articles, vec!["Fresh Paper"]);
        assert_eq!(fixed.tags, vec!["Physics"]);
        assert_eq!(fixed.co_authors[0].name, "Co Author");
    }

    #[tokio::test]
    async fn test_missing_snapshot_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let line = serde_json::to_string(&record(&layout, "B")).unwrap();
        seed_log(&layout, &[line]).await;

        let report = repair_profiles(&layout, Some("v2")).await.unwrap();

        assert_eq!(report.missing_snapshots, 1);
        let repaired = RecordStore::<ProfileRecord>::open(&report.destination)
            .await
            .unwrap();
        assert_eq!(repaired.get("B").unwrap().articles, vec!["stale"]);
    }

    #[tokio::test]
    async fn test_source_with_partial_line_is_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let line = serde_json::to_string(&record(&layout, "D")).unwrap();
        layout.ensure_dirs().await.unwrap();
        std::fs::write(layout.profiles_log(), format!("{line}\n{{\"key\": \"E\", \"url")).unwrap();
        let original = std::fs::read(layout.profiles_log()).unwrap();

        let report = repair_profiles(&layout, Some("v2")).await.unwrap();

        assert_eq!(report.records, 1);
        assert_eq!(std::fs::read(layout.profiles_log()).unwrap(), original);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_all_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let line = serde_json::to_string(&record(&layout, "F")).unwrap();
        seed_log(&layout, &[line.clone(), line]).await;

        let report = repair_profiles(&layout, Some("v2")).await.unwrap();

        assert_eq!(report.records, 2);
        let written = std::fs::read_to_string(&report.destination).unwrap();
        assert_eq!(written.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_existing_destination_refused() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        seed_log(&layout, &[serde_json::to_string(&record(&layout, "C")).unwrap()]).await;
        std::fs::write(layout.versioned_profiles_log("v2"), "keep me").unwrap();

        let err = repair_profiles(&layout, Some("v2")).await.unwrap_err();

        assert!(matches!(err, RepairError::Destination { .. }));
        assert_eq!(
            std::fs::read_to_string(layout.versioned_profiles_log("v2")).unwrap(),
            "keep me"
        );
    }

    #[tokio::test]
    async fn test_bad_suffix_refused() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());

        assert!(repair_profiles(&layout, Some("../escape")).await.is_err());
        assert!(repair_profiles(&layout, Some("")).await.is_err());
    }

    #[test]
    fn test_timestamp_suffix_shape() {
        let suffix = timestamp_suffix();
        assert_eq!(suffix.len(), 14);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
