use crate::{error::Result, models::GeneratedImage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// Raw record collection behind a [`super::HistoryStore`].
///
/// `open` must be idempotent and create the collection when it is missing.
/// The store calls it once before any other method.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    async fn open(&self) -> Result<()>;
    async fn put(&self, record: &GeneratedImage) -> Result<()>;
    /// Order is unspecified; the store sorts.
    async fn list_all(&self) -> Result<Vec<GeneratedImage>>;
    /// Missing ids are not an error.
    async fn delete_one(&self, id: &str) -> Result<()>;
    async fn clear_all(&self) -> Result<()>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub collections: Vec<String>,
}

impl StoreManifest {
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: SCHEMA_VERSION,
            collections: vec![collection.into()],
        }
    }

    /// Additive upgrade: bumps the version and registers the collection.
    /// Returns whether anything changed.
    pub fn upgrade(&mut self, collection: &str) -> bool {
        let mut changed = false;
        if self.version < SCHEMA_VERSION {
            self.version = SCHEMA_VERSION;
            changed = true;
        }
        if !self.collections.iter().any(|c| c == collection) {
            self.collections.push(collection.to_string());
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_is_additive() {
        let mut manifest = StoreManifest {
            name: "db".into(),
            version: 0,
            collections: vec!["other".into()],
        };
        assert!(manifest.upgrade("history"));
        assert_eq!(manifest.version, SCHEMA_VERSION);
        assert_eq!(manifest.collections, vec!["other", "history"]);
        assert!(!manifest.upgrade("history"));
    }
}
