//! Append-only JSON-lines record log with an in-memory dedup index.
//!
//! The file is authoritative: the index is rebuilt by replaying it on
//! [`RecordStore::open`], and [`RecordStore::append`] writes the line before
//! indexing the record, so a crash between the two loses nothing.
//!
//! Readers that must not touch the file use [`read_records`] instead.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::Record;
use crate::error::{StoreError, StoreResult};

pub struct RecordStore<R> {
    path: PathBuf,
    records: Vec<R>,
    index: HashMap<String, usize>,
    /// Last committed line has no trailing newline.
    needs_separator: bool,
}

/// Decoded contents of a log file.
struct Replayed<R> {
    /// Every committed record in log order, duplicates included
    records: Vec<R>,
    /// Length of the committed prefix when the final write was interrupted
    interrupted_at: Option<u64>,
    needs_separator: bool,
}

impl<R: Record> RecordStore<R> {
    /// Open the log at `path` for appending, replaying any existing records.
    ///
    /// A missing file is an empty log. A line that fails to decode makes the
    /// whole open fail, except an unterminated final line, which is an
    /// interrupted write: it is dropped and cut from the file.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let mut store = Self {
            path: path.into(),
            records: Vec::new(),
            index: HashMap::new(),
            needs_separator: false,
        };

        let Some(contents) = read_log(&store.path).await? else {
            tracing::debug!(path = ?store.path, "No existing record log");
            return Ok(store);
        };

        let replayed = decode_lines::<R>(&store.path, &contents)?;
        for record in replayed.records {
            let key = record.dedup_key().to_string();
            if !store.index_record(record) {
                tracing::warn!(
                    path = ?store.path,
                    key = %key,
                    "Duplicate key in record log, keeping first occurrence"
                );
            }
        }
        store.needs_separator = replayed.needs_separator;
        if let Some(len) = replayed.interrupted_at {
            store.truncate(len).await?;
        }

        tracing::info!(
            path = ?store.path,
            records = store.records.len(),
            "Loaded record log"
        );

        Ok(store)
    }

    async fn truncate(&self, len: u64) -> StoreResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await
            .map_err(|err| io_error(&self.path, err))?;
        file.set_len(len)
            .await
            .map_err(|err| io_error(&self.path, err))
    }

    /// Index a record unless its key is already present. First one wins.
    fn index_record(&mut self, record: R) -> bool {
        if self.index.contains_key(record.dedup_key()) {
            return false;
        }
        self.index
            .insert(record.dedup_key().to_string(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.index.get(key).map(|&position| &self.records[position])
    }

    /// Append one record as one line, then index it.
    ///
    /// Returns `false` without writing when the key is already stored.
    pub async fn append(&mut self, record: R) -> StoreResult<bool> {
        if self.has(record.dedup_key()) {
            tracing::debug!(key = record.dedup_key(), "Record already stored");
            return Ok(false);
        }

        let mut line = serde_json::to_string(&record).map_err(StoreError::Encode)?;
        line.push('\n');
        if self.needs_separator {
            line.insert(0, '\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| io_error(&self.path, err))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|err| io_error(&self.path, err))?;
        file.flush().await.map_err(|err| io_error(&self.path, err))?;
        file.sync_data()
            .await
            .map_err(|err| io_error(&self.path, err))?;

        self.needs_separator = false;
        self.index_record(record);
        Ok(true)
    }

    /// Records in log order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Every committed record of the log at `path`, in order, duplicates kept.
///
/// Never writes: an interrupted final line is skipped in memory only, so the
/// log can be read while a writer is still appending to it.
pub async fn read_records<R: DeserializeOwned>(path: &Path) -> StoreResult<Vec<R>> {
    match read_log(path).await? {
        Some(contents) => Ok(decode_lines(path, &contents)?.records),
        None => Ok(Vec::new()),
    }
}

/// File contents, or `None` when the log does not exist yet.
async fn read_log(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_error(path, err)),
    }
}

fn decode_lines<R: DeserializeOwned>(path: &Path, contents: &[u8]) -> StoreResult<Replayed<R>> {
    let mut replayed = Replayed {
        records: Vec::new(),
        interrupted_at: None,
        needs_separator: false,
    };
    let mut offset = 0;

    for (number, line) in contents.split(|byte| *byte == b'\n').enumerate() {
        let line_start = offset;
        offset += line.len() + 1;
        let terminated = offset <= contents.len();

        if line.trim_ascii().is_empty() {
            continue;
        }

        match serde_json::from_slice::<R>(line) {
            Ok(record) => {
                replayed.records.push(record);
                replayed.needs_separator = !terminated;
            }
            Err(err) if !terminated => {
                tracing::warn!(
                    path = ?path,
                    line = number + 1,
                    error = %err,
                    "Ignoring interrupted trailing write"
                );
                replayed.interrupted_at = Some(line_start as u64);
                replayed.needs_separator = false;
            }
            Err(source) => {
                return Err(StoreError::CorruptLog {
                    path: path.to_path_buf(),
                    line: number + 1,
                    source,
                });
            }
        }
    }

    Ok(replayed)
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::Citation;
    use crate::types::{ProfileEntry, SearchRecord};

    fn result(url: &str, title: &str) -> SearchRecord {
        SearchRecord {
            url: url.to_string(),
            citation: Citation {
                title: Some(title.to_string()),
                ..Default::default()
            },
            profiles: vec![ProfileEntry::new("Ada", "/citations?user=ADA")],
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::<SearchRecord>::open(dir.path().join("log.jsonl"))
            .await
            .unwrap();

        assert!(store.is_empty());
        assert!(!store.has("anything"));
    }

    #[tokio::test]
    async fn test_append_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        let mut store = RecordStore::open(&path).await.unwrap();
        assert!(store.append(result("https://a", "First")).await.unwrap());
        assert!(store.append(result("https://b", "Second")).await.unwrap());
        assert!(store.has("https://a"));

        let reopened = RecordStore::<SearchRecord>::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.records()[0].url, "https://a");
        assert_eq!(
            reopened.get("https://b").unwrap().citation.title.as_deref(),
            Some("Second")
        );
    }

    #[tokio::test]
    async fn test_duplicate_key_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        let mut store = RecordStore::open(&path).await.unwrap();
        assert!(store.append(result("https://a", "First")).await.unwrap());
        assert!(!store.append(result("https://a", "Again")).await.unwrap());

        let reopened = RecordStore::<SearchRecord>::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(
            reopened.get("https://a").unwrap().citation.title.as_deref(),
            Some("First")
        );

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_lines_first_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let first = serde_json::to_string(&result("https://a", "First")).unwrap();
        let second = serde_json::to_string(&result("https://a", "Second")).unwrap();
        std::fs::write(&path, format!("{first}\n{second}\n")).unwrap();

        let store = RecordStore::<SearchRecord>::open(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("https://a").unwrap().citation.title.as_deref(),
            Some("First")
        );
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let good = serde_json::to_string(&result("https://a", "First")).unwrap();
        std::fs::write(&path, format!("{good}\n{{not json\n{good}\n")).unwrap();

        let err = RecordStore::<SearchRecord>::open(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::CorruptLog { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_interrupted_trailing_write_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let good = serde_json::to_string(&result("https://a", "First")).unwrap();
        std::fs::write(&path, format!("{good}\n{{\"url\": \"https://b\", \"cit")).unwrap();

        let mut store = RecordStore::<SearchRecord>::open(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("{good}\n"));

        store.append(result("https://b", "Second")).await.unwrap();
        let reopened = RecordStore::<SearchRecord>::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[tokio::test]
    async fn test_read_records_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let first = serde_json::to_string(&result("https://a", "First")).unwrap();
        let again = serde_json::to_string(&result("https://a", "Again")).unwrap();
        let contents = format!("{first}\n{again}\n{{\"url\": \"https://b\", \"cit");
        std::fs::write(&path, &contents).unwrap();

        let records = read_records::<SearchRecord>(&path).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].citation.title.as_deref(), Some("Again"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[tokio::test]
    async fn test_read_records_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_records::<SearchRecord>(&dir.path().join("none.jsonl"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_unterminated_valid_line_gets_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let good = serde_json::to_string(&result("https://a", "First")).unwrap();
        std::fs::write(&path, &good).unwrap();

        let mut store = RecordStore::<SearchRecord>::open(&path).await.unwrap();
        store.append(result("https://b", "Second")).await.unwrap();

        let reopened = RecordStore::<SearchRecord>::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[tokio::test]
    async fn test_non_ascii_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");

        let mut store = RecordStore::open(&path).await.unwrap();
        store.append(result("https://a", "Überblick 综述")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Überblick 综述"));
    }
}
