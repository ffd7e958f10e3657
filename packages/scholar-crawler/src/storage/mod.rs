use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod jsonl;
pub use jsonl::{read_records, RecordStore};

/// A record kind that can live in a [`RecordStore`].
///
/// The dedup key decides whether a record was already collected; the store
/// keeps at most one record per key.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    fn dedup_key(&self) -> &str;
}
