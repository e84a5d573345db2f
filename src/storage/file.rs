use crate::{
    config::HistoryConfig,
    error::{IconError, Result},
    models::GeneratedImage,
    storage::traits::{HistoryBackend, StoreManifest, SCHEMA_VERSION},
};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tokio_stream::wrappers::ReadDirStream;
use uuid::Uuid;

const MANIFEST_FILE: &str = "meta.json";

/// Durable history on the local filesystem.
///
/// Layout: `<root>/<database>/meta.json` plus one `<collection>/<id>.json` per record.
/// Dot-prefixed entries are in-flight temp files and are never listed.
///
/// Reads, writes and deletes share `gate`; `clear_all` holds it exclusively, so a
/// listing sees the collection either before or after a clear, never in between.
pub struct FileHistoryBackend {
    root: Option<PathBuf>,
    database_name: String,
    collection_name: String,
    gate: RwLock<()>,
}

impl FileHistoryBackend {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            root: config.resolve_base_dir(),
            database_name: config.database_name.clone(),
            collection_name: config.collection_name.clone(),
            gate: RwLock::new(()),
        }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self::new(&HistoryConfig::new().with_base_dir(root))
    }

    pub fn database_dir(&self) -> Result<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(&self.database_name))
            .ok_or_else(|| {
                IconError::StorageUnavailable(
                    "no local data directory is available on this host".into(),
                )
            })
    }

    pub fn collection_dir(&self) -> Result<PathBuf> {
        Ok(self.database_dir()?.join(&self.collection_name))
    }

    fn record_path(&self, id: &str) -> Result<Option<PathBuf>> {
        if !is_safe_id(id) {
            return Ok(None);
        }
        Ok(Some(self.collection_dir()?.join(format!("{}.json", id))))
    }

    fn clearing_prefix(&self) -> String {
        format!(".{}.clearing-", self.collection_name)
    }

    /// Removes collections left behind by a clear whose cleanup failed. Best effort.
    async fn sweep_stale_clearings(&self, database_dir: &Path) {
        let prefix = self.clearing_prefix();
        let stale: std::io::Result<Vec<PathBuf>> = async {
            let mut entries = ReadDirStream::new(fs::read_dir(database_dir).await?);
            let mut stale = Vec::new();
            while let Some(entry) = entries.try_next().await? {
                if entry
                    .file_name()
                    .to_str()
                    .map_or(false, |name| name.starts_with(&prefix))
                {
                    stale.push(entry.path());
                }
            }
            Ok(stale)
        }
        .await;

        let stale = match stale {
            Ok(stale) => stale,
            Err(err) => {
                log::warn!(
                    "⚠️  Could not scan {} for stale cleared history: {}",
                    database_dir.display(),
                    err
                );
                return;
            }
        };
        for path in stale {
            match fs::remove_dir_all(&path).await {
                Ok(()) => log::debug!("Removed stale cleared history {}", path.display()),
                Err(err) => log::warn!(
                    "⚠️  Could not remove stale cleared history {}: {}",
                    path.display(),
                    err
                ),
            }
        }
    }

    async fn load_or_create_manifest(&self, database_dir: &Path) -> Result<()> {
        let path = database_dir.join(MANIFEST_FILE);
        let manifest = match fs::read(&path).await {
            Ok(bytes) => {
                let mut manifest: StoreManifest = serde_json::from_slice(&bytes).map_err(|e| {
                    IconError::StorageUnavailable(format!(
                        "history manifest {} is corrupt: {}",
                        path.display(),
                        e
                    ))
                })?;
                if manifest.version > SCHEMA_VERSION {
                    return Err(IconError::StorageUnavailable(format!(
                        "history schema version {} is newer than supported version {}",
                        manifest.version, SCHEMA_VERSION
                    )));
                }
                let from_version = manifest.version;
                if !manifest.upgrade(&self.collection_name) {
                    return Ok(());
                }
                log::info!(
                    "Upgrading history schema {} from v{} to v{}",
                    self.database_name,
                    from_version,
                    manifest.version
                );
                manifest
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("Creating history database {}", self.database_name);
                StoreManifest::new(&self.database_name, &self.collection_name)
            }
            Err(err) => {
                return Err(IconError::StorageUnavailable(format!(
                    "cannot read {}: {}",
                    path.display(),
                    err
                )))
            }
        };

        let payload = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| IconError::SerializationError(e.to_string()))?;
        write_atomic(database_dir, &path, &payload)
            .await
            .map_err(|e| IconError::StorageUnavailable(format!("cannot write manifest: {}", e)))
    }
}

#[async_trait]
impl HistoryBackend for FileHistoryBackend {
    async fn open(&self) -> Result<()> {
        let database_dir = self.database_dir()?;
        fs::create_dir_all(&database_dir).await.map_err(|e| {
            IconError::StorageUnavailable(format!(
                "cannot create {}: {}",
                database_dir.display(),
                e
            ))
        })?;

        self.load_or_create_manifest(&database_dir).await?;
        self.sweep_stale_clearings(&database_dir).await;

        let collection_dir = self.collection_dir()?;
        fs::create_dir_all(&collection_dir).await.map_err(|e| {
            IconError::StorageUnavailable(format!(
                "cannot create {}: {}",
                collection_dir.display(),
                e
            ))
        })?;
        Ok(())
    }

    async fn put(&self, record: &GeneratedImage) -> Result<()> {
        let path = self.record_path(&record.id)?.ok_or_else(|| {
            IconError::InvalidInput(format!("record id '{}' is not a valid key", record.id))
        })?;
        let payload = serde_json::to_vec(record)
            .map_err(|e| IconError::WriteFailed(format!("cannot encode record: {}", e)))?;
        let dir = self.collection_dir()?;

        let _guard = self.gate.read().await;
        match write_atomic(&dir, &path, &payload).await {
            Ok(()) => Ok(()),
            // Collection removed out from under us; recreate it and retry once.
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::warn!("⚠️  History collection {} is missing, recreating", dir.display());
                fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| IconError::WriteFailed(e.to_string()))?;
                write_atomic(&dir, &path, &payload)
                    .await
                    .map_err(|e| IconError::WriteFailed(e.to_string()))
            }
            Err(err) => Err(IconError::WriteFailed(err.to_string())),
        }
    }

    async fn list_all(&self) -> Result<Vec<GeneratedImage>> {
        let dir = self.collection_dir()?;
        let _guard = self.gate.read().await;
        let read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(IconError::ReadFailed(err.to_string())),
        };

        let mut entries = ReadDirStream::new(read_dir);
        let mut records = Vec::new();
        while let Some(entry) = entries
            .try_next()
            .await
            .map_err(|e| IconError::ReadFailed(e.to_string()))?
        {
            let path = entry.path();
            if !is_record_file(&path) {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                // Deleted between listing and reading.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(IconError::ReadFailed(err.to_string())),
            };
            let record: GeneratedImage = serde_json::from_slice(&bytes).map_err(|e| {
                IconError::ReadFailed(format!("corrupt record {}: {}", path.display(), e))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    async fn delete_one(&self, id: &str) -> Result<()> {
        let Some(path) = self.record_path(id)? else {
            return Ok(());
        };
        let _guard = self.gate.read().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(IconError::DeleteFailed(err.to_string())),
        }
    }

    async fn clear_all(&self) -> Result<()> {
        let database_dir = self.database_dir()?;
        let collection_dir = self.collection_dir()?;
        let trash = database_dir.join(format!("{}{}", self.clearing_prefix(), Uuid::new_v4()));

        let guard = self.gate.write().await;
        let moved = match fs::rename(&collection_dir, &trash).await {
            Ok(()) => true,
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(IconError::ClearFailed(err.to_string())),
        };
        if let Err(err) = fs::create_dir_all(&collection_dir).await {
            if moved {
                if let Err(restore) = fs::rename(&trash, &collection_dir).await {
                    log::error!(
                        "❌ Could not restore history from {}: {}",
                        trash.display(),
                        restore
                    );
                }
            }
            return Err(IconError::ClearFailed(err.to_string()));
        }
        drop(guard);

        if moved {
            if let Err(err) = fs::remove_dir_all(&trash).await {
                log::warn!(
                    "⚠️  Cleared history but could not remove {}: {}",
                    trash.display(),
                    err
                );
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match self.collection_dir() {
            Ok(dir) => format!("file:{}", dir.display()),
            Err(_) => "file:<unavailable>".to_string(),
        }
    }
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn is_record_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .map_or(true, |name| name.starts_with('.'));
    !hidden && path.extension().and_then(|ext| ext.to_str()) == Some("json")
}

async fn write_atomic(dir: &Path, target: &Path, payload: &[u8]) -> std::io::Result<()> {
    let tmp = dir.join(format!(".write-{}.tmp", Uuid::new_v4()));
    fs::write(&tmp, payload).await?;
    if let Err(err) = fs::rename(&tmp, target).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err);
    }
    Ok(())
}
