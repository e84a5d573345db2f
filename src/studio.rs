use crate::{
    config::StudioConfig,
    download,
    error::{ErrorKind, IconError, Result},
    generator::{GeminiImageClient, IconGenerator},
    logger,
    models::{GeneratedImage, IconRequest},
    storage::HistoryStore,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle of a single generation request. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Validating,
    AwaitingGenerationClient,
    Persisting,
    Done,
    Failed(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEvent<'a> {
    /// Emitted before attempt `current` of `total` is issued.
    Started { current: usize, total: usize },
    /// Emitted once attempt `current` has been generated and saved.
    Completed {
        current: usize,
        total: usize,
        record: &'a GeneratedImage,
    },
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates the image generator and the history store.
///
/// Only one generation (single or batch) may be outstanding per studio. A second
/// one is rejected with [`IconError::Busy`] instead of being queued.
pub struct IconStudio {
    generator: Arc<dyn IconGenerator>,
    store: Arc<HistoryStore>,
    config: StudioConfig,
    in_flight: AtomicBool,
    state: Mutex<GenerationState>,
}

impl IconStudio {
    pub fn new(
        generator: Arc<dyn IconGenerator>,
        store: Arc<HistoryStore>,
        config: StudioConfig,
    ) -> Self {
        Self {
            generator,
            store,
            config,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(GenerationState::Idle),
        }
    }

    pub fn from_config(config: StudioConfig) -> Result<Self> {
        config.validate()?;
        let generator = GeminiImageClient::new(config.gemini.clone())?;
        let store = HistoryStore::from_config(&config.history);
        Ok(Self::new(Arc::new(generator), Arc::new(store), config))
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Where the current (or most recent) generation request stands.
    pub fn state(&self) -> GenerationState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| IconError::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    pub async fn generate_one(&self, request: &IconRequest) -> Result<GeneratedImage> {
        let _in_flight = self.begin()?;
        self.run_single(request).await
    }

    /// Runs `count` generations strictly one after another.
    ///
    /// Stops at the first failure and returns that error. Records saved before the
    /// failure stay in history.
    pub async fn generate_batch<F>(
        &self,
        request: &IconRequest,
        count: usize,
        mut on_event: F,
    ) -> Result<Vec<GeneratedImage>>
    where
        F: FnMut(BatchEvent<'_>),
    {
        if count == 0 {
            return Err(IconError::InvalidInput(
                "batch size must be at least 1".into(),
            ));
        }
        let _in_flight = self.begin()?;
        let _timer = logger::timer(&format!("batch of {}", count));

        let mut records = Vec::with_capacity(count);
        for current in 1..=count {
            on_event(BatchEvent::Started {
                current,
                total: count,
            });

            let record = match self.run_single(request).await {
                Ok(record) => record,
                Err(err) => {
                    log::warn!(
                        "⚠️  Batch stopped at attempt {} of {} ({} saved): {}",
                        current,
                        count,
                        records.len(),
                        err
                    );
                    return Err(err);
                }
            };

            on_event(BatchEvent::Completed {
                current,
                total: count,
                record: &record,
            });
            records.push(record);
        }

        log::info!("✅ Batch complete: {} icons", records.len());
        Ok(records)
    }

    pub async fn generate_default_batch<F>(
        &self,
        request: &IconRequest,
        on_event: F,
    ) -> Result<Vec<GeneratedImage>>
    where
        F: FnMut(BatchEvent<'_>),
    {
        self.generate_batch(request, self.config.batch_size, on_event)
            .await
    }

    async fn run_single(&self, request: &IconRequest) -> Result<GeneratedImage> {
        let result = self.drive(request).await;
        if let Err(err) = &result {
            self.advance(GenerationState::Failed(err.kind()));
        }
        result
    }

    async fn drive(&self, request: &IconRequest) -> Result<GeneratedImage> {
        self.advance(GenerationState::Validating);
        if request.text.trim().is_empty() {
            return Err(IconError::InvalidInput("icon text must not be blank".into()));
        }

        self.advance(GenerationState::AwaitingGenerationClient);
        let url = self
            .generator
            .generate(
                &request.text,
                &request.style.prompt_suffix,
                request.aspect_ratio,
            )
            .await
            .map_err(|err| match err {
                IconError::GenerationFailed(msg) => IconError::GenerationFailed(msg),
                other => IconError::GenerationFailed(other.to_string()),
            })?;
        if url.trim().is_empty() {
            return Err(IconError::GenerationFailed(
                "generator returned no image".into(),
            ));
        }

        self.advance(GenerationState::Persisting);
        let record = GeneratedImage::new(url, request);
        if let Err(err) = self.store.put(&record).await {
            log::error!("❌ Generated icon {} could not be saved: {}", record.id, err);
            return Err(IconError::PersistenceFailed {
                record: Box::new(record),
                source: Box::new(err),
            });
        }

        self.advance(GenerationState::Done);
        log::info!(
            "🎨 Generated icon {} for '{}' ({}, {})",
            record.id,
            record.text,
            record.style_name,
            record.aspect_ratio
        );
        Ok(record)
    }

    pub async fn list_history(&self) -> Result<Vec<GeneratedImage>> {
        self.store.list_all().await
    }

    pub async fn delete_record(&self, id: &str) -> Result<()> {
        self.store.delete_one(id).await
    }

    /// Deletes every id in `selection`, removing each from the set once it is gone.
    /// On error the ids not yet deleted remain selected.
    pub async fn delete_selected(&self, selection: &mut HashSet<String>) -> Result<usize> {
        let ids: Vec<String> = selection.iter().cloned().collect();
        for id in &ids {
            self.store.delete_one(id).await?;
            selection.remove(id);
        }
        Ok(ids.len())
    }

    /// Destructive. Confirmation is the caller's job.
    pub async fn clear_history(&self) -> Result<()> {
        self.store.clear_all().await
    }

    pub fn suggested_filename(&self, timestamp_ms: i64) -> String {
        download::suggested_filename(&self.config.product_name, timestamp_ms)
    }

    pub async fn download(&self, record: &GeneratedImage, dir: &Path) -> Result<PathBuf> {
        download::save_image(&record.url, dir, &self.config.product_name).await
    }

    fn advance(&self, next: GenerationState) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log::trace!("generation state {:?} -> {:?}", *state, next);
        *state = next;
    }
}
