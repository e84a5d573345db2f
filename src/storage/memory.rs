use crate::{error::Result, models::GeneratedImage, storage::traits::HistoryBackend};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local history. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryHistoryBackend {
    records: RwLock<HashMap<String, GeneratedImage>>,
}

impl MemoryHistoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryBackend for MemoryHistoryBackend {
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, record: &GeneratedImage) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<GeneratedImage>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn delete_one(&self, id: &str) -> Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
