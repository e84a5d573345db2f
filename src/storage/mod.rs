pub mod file;
pub mod memory;
pub mod traits;

use crate::{
    config::HistoryConfig,
    error::{IconError, Result},
    models::GeneratedImage,
};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub use file::FileHistoryBackend;
pub use memory::MemoryHistoryBackend;
pub use traits::{HistoryBackend, StoreManifest, SCHEMA_VERSION};

/// Local history of generated icons.
///
/// The backend is opened lazily on first use, exactly once even under concurrent
/// first calls. A failed open is remembered: every later call reports
/// `StorageUnavailable` without touching the backend again.
pub struct HistoryStore {
    backend: Arc<dyn HistoryBackend>,
    opened: OnceCell<std::result::Result<(), String>>,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self {
            backend,
            opened: OnceCell::new(),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(Arc::new(FileHistoryBackend::new(config)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryHistoryBackend::new()))
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    pub async fn open(&self) -> Result<()> {
        let state = self
            .opened
            .get_or_init(|| async {
                match self.backend.open().await {
                    Ok(()) => {
                        log::debug!("History store ready: {}", self.backend.describe());
                        Ok(())
                    }
                    Err(err) => {
                        log::error!("❌ History store unavailable: {}", err);
                        Err(match err {
                            IconError::StorageUnavailable(msg) => msg,
                            other => other.to_string(),
                        })
                    }
                }
            })
            .await;

        state.clone().map_err(IconError::StorageUnavailable)
    }

    /// Insert or fully replace the record with `record.id`.
    pub async fn put(&self, record: &GeneratedImage) -> Result<()> {
        self.open().await?;
        if record.id.trim().is_empty() {
            return Err(IconError::InvalidInput("record id must not be empty".into()));
        }
        self.backend.put(record).await?;
        log::debug!("Saved history record {}", record.id);
        Ok(())
    }

    /// Every record, newest first.
    pub async fn list_all(&self) -> Result<Vec<GeneratedImage>> {
        self.open().await?;
        let mut records = self.backend.list_all().await?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    pub async fn delete_one(&self, id: &str) -> Result<()> {
        self.open().await?;
        self.backend.delete_one(id).await?;
        log::debug!("Deleted history record {}", id);
        Ok(())
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.open().await?;
        self.backend.clear_all().await?;
        log::info!("🧹 History cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, IconRequest, default_preset};

    fn record(url: &str, timestamp: i64) -> GeneratedImage {
        let request = IconRequest::new("Acme", default_preset().clone(), AspectRatio::Square);
        GeneratedImage::new(url, &request).with_timestamp(timestamp)
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = HistoryStore::in_memory();
        let old = record("img://old", 1_000);
        let new = record("img://new", 2_000);
        store.put(&old).await.unwrap();
        store.put(&new).await.unwrap();

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed, vec![new, old]);
    }

    #[tokio::test]
    async fn test_put_replaces_by_id() {
        let store = HistoryStore::in_memory();
        let original = record("img://1", 1_000);
        store.put(&original).await.unwrap();
        store.put(&original).await.unwrap();

        let mut replaced = original.clone();
        replaced.url = "img://2".into();
        store.put(&replaced).await.unwrap();

        assert_eq!(store.list_all().await.unwrap(), vec![replaced]);
    }

    #[tokio::test]
    async fn test_rejects_empty_id() {
        let store = HistoryStore::in_memory();
        let mut bad = record("img://1", 1);
        bad.id = "  ".into();
        let err = store.put(&bad).await.unwrap_err();
        assert!(matches!(err, IconError::InvalidInput(_)));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = HistoryStore::in_memory();
        let kept = record("img://1", 1);
        store.put(&kept).await.unwrap();
        store.delete_one("does-not-exist").await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_clear_all_empties() {
        let store = HistoryStore::in_memory();
        for ts in 0..3 {
            store.put(&record("img://x", ts)).await.unwrap();
        }
        store.clear_all().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
