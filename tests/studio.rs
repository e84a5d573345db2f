use async_trait::async_trait;
use icon_studio::{
    default_preset, AspectRatio, BatchEvent, ErrorKind, GeneratedImage, GenerationState,
    HistoryBackend, HistoryStore, IconError, IconGenerator, IconRequest, IconStudio,
    MemoryHistoryBackend, Result, StudioConfig,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Returns `img://<n>` for call n, failing on the configured call.
#[derive(Default)]
struct ScriptedGenerator {
    calls: AtomicUsize,
    fail_on: Option<usize>,
    seen: Mutex<Vec<(String, String, AspectRatio)>>,
}

impl ScriptedGenerator {
    fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IconGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        text: &str,
        style_suffix: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen
            .lock()
            .unwrap()
            .push((text.to_string(), style_suffix.to_string(), aspect_ratio));
        if self.fail_on == Some(call) {
            return Err(IconError::RequestError("quota exceeded".into()));
        }
        Ok(format!("img://{}", call))
    }
}

/// Memory backend that counts writes and can be told to reject them.
#[derive(Default)]
struct CountingBackend {
    inner: MemoryHistoryBackend,
    puts: AtomicUsize,
    reject_writes: AtomicBool,
}

#[async_trait]
impl HistoryBackend for CountingBackend {
    async fn open(&self) -> Result<()> {
        self.inner.open().await
    }

    async fn put(&self, record: &GeneratedImage) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(IconError::WriteFailed("quota exceeded".into()));
        }
        self.inner.put(record).await
    }

    async fn list_all(&self) -> Result<Vec<GeneratedImage>> {
        self.inner.list_all().await
    }

    async fn delete_one(&self, id: &str) -> Result<()> {
        self.inner.delete_one(id).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.inner.clear_all().await
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

struct Fixture {
    generator: Arc<ScriptedGenerator>,
    backend: Arc<CountingBackend>,
    studio: IconStudio,
}

fn fixture(generator: ScriptedGenerator) -> Fixture {
    let generator = Arc::new(generator);
    let backend = Arc::new(CountingBackend::default());
    let store = Arc::new(HistoryStore::new(backend.clone()));
    let studio = IconStudio::new(generator.clone(), store, StudioConfig::new());
    Fixture {
        generator,
        backend,
        studio,
    }
}

fn request(text: &str, aspect_ratio: AspectRatio) -> IconRequest {
    IconRequest::new(text, default_preset().clone(), aspect_ratio)
}

#[tokio::test]
async fn test_blank_text_never_calls_generator() {
    let f = fixture(ScriptedGenerator::default());

    for text in ["", "   ", "\n\t"] {
        let err = f
            .studio
            .generate_one(&request(text, AspectRatio::Square))
            .await
            .unwrap_err();
        assert!(matches!(err, IconError::InvalidInput(_)));
    }

    assert_eq!(f.generator.calls(), 0);
    assert_eq!(f.backend.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generate_one_persists_record() {
    let f = fixture(ScriptedGenerator::default());

    let record = f
        .studio
        .generate_one(&request("Acme", AspectRatio::Widescreen))
        .await
        .unwrap();

    assert_eq!(record.url, "img://1");
    assert_eq!(record.text, "Acme");
    assert_eq!(record.aspect_ratio, AspectRatio::Widescreen);
    assert_eq!(record.prompt, default_preset().prompt_suffix);
    assert_eq!(record.style_name, default_preset().name);
    assert!(!record.id.is_empty());
    assert_eq!(f.generator.calls(), 1);
    assert_eq!(f.backend.puts.load(Ordering::SeqCst), 1);
    assert_eq!(f.studio.list_history().await.unwrap(), vec![record]);

    let seen = f.generator.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![(
            "Acme".to_string(),
            default_preset().prompt_suffix.clone(),
            AspectRatio::Widescreen
        )]
    );
}

#[tokio::test]
async fn test_generator_failure_writes_nothing() {
    let f = fixture(ScriptedGenerator::failing_on(1));

    let err = f
        .studio
        .generate_one(&request("Acme", AspectRatio::Square))
        .await
        .unwrap_err();

    match err {
        IconError::GenerationFailed(msg) => assert!(msg.contains("quota exceeded")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(f.backend.puts.load(Ordering::SeqCst), 0);
    assert!(f.studio.list_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_failure_still_returns_image() {
    let f = fixture(ScriptedGenerator::default());
    f.backend.reject_writes.store(true, Ordering::SeqCst);

    let err = f
        .studio
        .generate_one(&request("Acme", AspectRatio::Standard))
        .await
        .unwrap_err();

    let record = err.record().cloned().expect("record travels with the error");
    assert_eq!(record.url, "img://1");
    assert_eq!(record.text, "Acme");
    match &err {
        IconError::PersistenceFailed { source, .. } => {
            assert!(matches!(**source, IconError::WriteFailed(_)))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(f.studio.list_history().await.unwrap().is_empty());

    // The caller may retry the save once storage recovers.
    f.backend.reject_writes.store(false, Ordering::SeqCst);
    f.studio.store().put(&record).await.unwrap();
    assert_eq!(f.studio.list_history().await.unwrap(), vec![record]);
}

#[tokio::test]
async fn test_batch_stops_at_first_failure() {
    let f = fixture(ScriptedGenerator::failing_on(4));
    let mut events = Vec::new();

    let err = f
        .studio
        .generate_batch(&request("Acme", AspectRatio::Standard), 5, |event| {
            events.push(match event {
                BatchEvent::Started { current, total } => format!("start {current}/{total}"),
                BatchEvent::Completed { current, record, .. } => {
                    format!("done {current} {}", record.url)
                }
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, IconError::GenerationFailed(_)));
    assert_eq!(f.generator.calls(), 4);
    assert_eq!(f.backend.puts.load(Ordering::SeqCst), 3);
    assert_eq!(f.studio.list_history().await.unwrap().len(), 3);
    assert_eq!(
        events,
        vec![
            "start 1/5",
            "done 1 img://1",
            "start 2/5",
            "done 2 img://2",
            "start 3/5",
            "done 3 img://3",
            "start 4/5",
        ]
    );
}

#[tokio::test]
async fn test_batch_save_failure_returns_unsaved_image() {
    let f = fixture(ScriptedGenerator::default());
    f.backend.reject_writes.store(true, Ordering::SeqCst);
    let mut completed = 0;

    let err = f
        .studio
        .generate_batch(&request("Acme", AspectRatio::Square), 3, |event| {
            if let BatchEvent::Completed { .. } = event {
                completed += 1;
            }
        })
        .await
        .unwrap_err();

    assert_eq!(completed, 0);
    assert_eq!(f.generator.calls(), 1);
    assert_eq!(err.kind(), ErrorKind::PersistenceFailed);
    let record = err.into_record().expect("record travels with the error");
    assert_eq!(record.url, "img://1");
    assert_eq!(
        f.studio.state(),
        GenerationState::Failed(ErrorKind::PersistenceFailed)
    );
}

#[tokio::test]
async fn test_state_tracks_latest_request() {
    let f = fixture(ScriptedGenerator::failing_on(2));
    assert_eq!(f.studio.state(), GenerationState::Idle);

    f.studio
        .generate_one(&request("Acme", AspectRatio::Square))
        .await
        .unwrap();
    assert_eq!(f.studio.state(), GenerationState::Done);

    f.studio
        .generate_one(&request("Acme", AspectRatio::Square))
        .await
        .unwrap_err();
    assert_eq!(
        f.studio.state(),
        GenerationState::Failed(ErrorKind::GenerationFailed)
    );

    f.studio
        .generate_one(&request("  ", AspectRatio::Square))
        .await
        .unwrap_err();
    assert_eq!(
        f.studio.state(),
        GenerationState::Failed(ErrorKind::InvalidInput)
    );
}

#[tokio::test]
async fn test_batch_records_are_saved_before_next_attempt() {
    let f = fixture(ScriptedGenerator::default());
    let backend = f.backend.clone();
    let mut saved_at_completion = Vec::new();

    let records = f
        .studio
        .generate_batch(&request("Acme", AspectRatio::Square), 3, |event| {
            if let BatchEvent::Completed { current, .. } = event {
                saved_at_completion.push((current, backend.puts.load(Ordering::SeqCst)));
            }
        })
        .await
        .unwrap();

    assert_eq!(saved_at_completion, vec![(1, 1), (2, 2), (3, 3)]);
    let urls: Vec<_> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["img://1", "img://2", "img://3"]);
    let ids: HashSet<_> = records.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn test_default_batch_uses_configured_size() {
    let f = fixture(ScriptedGenerator::default());
    let records = f
        .studio
        .generate_default_batch(&request("Acme", AspectRatio::Widescreen), |_| {})
        .await
        .unwrap();

    assert_eq!(records.len(), 5);
    assert_eq!(f.generator.calls(), 5);
}

#[tokio::test]
async fn test_batch_rejects_zero_and_blank() {
    let f = fixture(ScriptedGenerator::default());

    let err = f
        .studio
        .generate_batch(&request("Acme", AspectRatio::Square), 0, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, IconError::InvalidInput(_)));

    let err = f
        .studio
        .generate_batch(&request(" ", AspectRatio::Square), 5, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, IconError::InvalidInput(_)));
    assert_eq!(f.generator.calls(), 0);
}

struct GatedGenerator {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl IconGenerator for GatedGenerator {
    async fn generate(&self, _: &str, _: &str, _: AspectRatio) -> Result<String> {
        self.started.notify_one();
        self.release.notified().await;
        Ok("img://gated".to_string())
    }
}

#[tokio::test]
async fn test_second_generation_while_busy_is_rejected() {
    let generator = Arc::new(GatedGenerator {
        started: Notify::new(),
        release: Notify::new(),
    });
    let studio = IconStudio::new(
        generator.clone(),
        Arc::new(HistoryStore::in_memory()),
        StudioConfig::new(),
    );
    let req = request("Acme", AspectRatio::Square);

    let first = studio.generate_one(&req);
    let second = async {
        generator.started.notified().await;
        assert!(studio.is_busy());
        assert_eq!(studio.state(), GenerationState::AwaitingGenerationClient);
        let result = studio
            .generate_batch(&req, 2, |_| panic!("batch must not start"))
            .await;
        generator.release.notify_one();
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap().url, "img://gated");
    assert!(matches!(second.unwrap_err(), IconError::Busy));
    assert!(!studio.is_busy());
    assert_eq!(studio.state(), GenerationState::Done);
}

#[tokio::test]
async fn test_delete_and_clear_history() {
    let f = fixture(ScriptedGenerator::default());
    let req = request("Acme", AspectRatio::Square);
    let a = f.studio.generate_one(&req).await.unwrap();
    let b = f.studio.generate_one(&req).await.unwrap();
    let c = f.studio.generate_one(&req).await.unwrap();

    f.studio.delete_record(&a.id).await.unwrap();
    f.studio.delete_record("missing").await.unwrap();
    let remaining: HashSet<_> = f
        .studio
        .list_history()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, HashSet::from([b.id.clone(), c.id.clone()]));

    let mut selection = HashSet::from([b.id.clone()]);
    assert_eq!(f.studio.delete_selected(&mut selection).await.unwrap(), 1);
    assert!(selection.is_empty());
    assert_eq!(f.studio.list_history().await.unwrap(), vec![c]);

    f.studio.clear_history().await.unwrap();
    assert!(f.studio.list_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_suggested_filename_uses_product_name() {
    let f = fixture(ScriptedGenerator::default());
    assert_eq!(
        f.studio.suggested_filename(1_700_000_000_000),
        "youyeye-icon-1700000000000.png"
    );
}
