use async_trait::async_trait;
use bytes::Bytes;
use picstore_core::config::TransformStrategy;
use picstore_core::models::{SizeLabel, SizeSpec, UploadedOriginal};
use picstore_pipeline::{
    CallbackService, Orchestrator, OrchestratorSettings, PendingStore, UploadRequest,
};
use picstore_storage::{MemoryStorage, Storage};
use picstore_transform::{
    TransformError, TransformOutput, TransformProvider, VariantOutcome,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// What the mock provider should do for one variant.
#[derive(Clone)]
enum Plan {
    Bytes(Vec<u8>),
    Job(String),
    Fail,
    /// 503 on the first attempt, bytes on the second.
    FlakyThenBytes(Vec<u8>),
    Slow(Duration),
}

struct MockProvider {
    plans: HashMap<String, Plan>,
    attempts: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

fn plan_key(spec: &SizeSpec) -> String {
    format!("{}:{}", spec.label.as_str(), spec.next_gen)
}

impl MockProvider {
    fn new(plans: Vec<(SizeLabel, bool, Plan)>) -> Arc<Self> {
        Arc::new(Self {
            plans: plans
                .into_iter()
                .map(|(label, next_gen, plan)| {
                    (format!("{}:{}", label.as_str(), next_gen), plan)
                })
                .collect(),
            attempts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn attempts_for(&self, label: SizeLabel, next_gen: bool) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(&format!("{}:{}", label.as_str(), next_gen))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TransformProvider for MockProvider {
    async fn transform(
        &self,
        original: &UploadedOriginal,
        specs: &[SizeSpec],
    ) -> Result<Vec<VariantOutcome>, TransformError> {
        let mut outcomes = Vec::new();
        let mut last_error = None;
        for spec in specs {
            match self.transform_one(original, spec).await {
                Ok(output) => outcomes.push(VariantOutcome {
                    spec: spec.clone(),
                    output,
                }),
                Err(error) => last_error = Some(error),
            }
        }
        if outcomes.is_empty() {
            if let Some(error) = last_error {
                return Err(error);
            }
        }
        Ok(outcomes)
    }

    async fn transform_one(
        &self,
        _original: &UploadedOriginal,
        spec: &SizeSpec,
    ) -> Result<TransformOutput, TransformError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let key = plan_key(spec);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        match self.plans.get(&key) {
            Some(Plan::Bytes(data)) => Ok(TransformOutput::Bytes {
                data: Bytes::from(data.clone()),
                content_type: spec.content_type().to_string(),
            }),
            Some(Plan::Job(id)) => Ok(TransformOutput::Async {
                transform_id: id.clone(),
            }),
            Some(Plan::Fail) => Err(TransformError::Rejected("scripted failure".to_string())),
            Some(Plan::FlakyThenBytes(data)) => {
                if attempt == 1 {
                    Err(TransformError::UpstreamStatus(503))
                } else {
                    Ok(TransformOutput::Bytes {
                        data: Bytes::from(data.clone()),
                        content_type: spec.content_type().to_string(),
                    })
                }
            }
            Some(Plan::Slow(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(TransformOutput::Bytes {
                    data: Bytes::from_static(b"slow-bytes"),
                    content_type: spec.content_type().to_string(),
                })
            }
            None => Err(TransformError::Rejected("no plan".to_string())),
        }
    }
}

struct Harness {
    storage: Arc<MemoryStorage>,
    pending: PendingStore,
    orchestrator: Orchestrator,
}

fn harness(
    provider: Option<Arc<dyn TransformProvider>>,
    strategy: TransformStrategy,
    sizes: Vec<u32>,
) -> Harness {
    let storage = Arc::new(MemoryStorage::new("pics-nyc3"));
    let pending = PendingStore::new(Duration::from_secs(600));
    let orchestrator = Orchestrator::new(
        storage.clone() as Arc<dyn Storage>,
        provider,
        pending.clone(),
        OrchestratorSettings {
            public_host: "cdn.test".to_string(),
            picture_sizes: sizes,
            strategy,
            transform_timeout: Duration::from_secs(20),
            variant_retry_delay: Duration::from_secs(1),
        },
    );
    Harness {
        storage,
        pending,
        orchestrator,
    }
}

fn request(directory: Option<&str>) -> UploadRequest {
    UploadRequest {
        store_id: 123,
        directory: directory.map(str::to_string),
        filename: "Photo Shot.JPG".to_string(),
        content_type: "image/jpeg".to_string(),
        data: Bytes::from(vec![0u8; 100]),
    }
}

/// Minimal one-shot HTTP server for callback download tests.
async fn serve_once(body: &'static [u8]) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let header = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(header.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/result.webp")
}

#[tokio::test]
async fn upload_stores_original_and_variants() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Bytes(vec![1; 30])),
        (SizeLabel::Big, true, Plan::Bytes(vec![1; 10])),
        (SizeLabel::Normal, false, Plan::Bytes(vec![1; 20])),
        (SizeLabel::Normal, true, Plan::Bytes(vec![1; 5])),
    ]);
    let h = harness(Some(provider), TransformStrategy::FanOut, vec![700, 350]);

    let outcome = h
        .orchestrator
        .upload(request(Some("/Banners//Promo")))
        .await
        .unwrap();

    assert_eq!(outcome.bucket, "pics-nyc3");
    assert!(outcome.key.starts_with("@v4/banners/promo/"));
    assert!(outcome.key.ends_with("-photoshot.jpg"));
    assert_eq!(
        outcome.uri,
        format!("https://cdn.test/123/{}", outcome.key)
    );

    // Original under the tenant prefix, with the long cache header.
    let original_key = format!("123/{}", outcome.key);
    assert!(h.storage.get(&original_key).await.is_ok());
    assert_eq!(
        h.storage.cache_control_of(&original_key).as_deref(),
        Some("public, max-age=31536000")
    );

    // zoom + big + normal; all four variant objects written.
    assert_eq!(outcome.picture.len(), 3);
    assert_eq!(h.storage.object_count(), 5);
    let webp_key = format!("123/imgs/big/{}.webp", outcome.key);
    assert_eq!(
        h.storage.content_type_of(&webp_key).as_deref(),
        Some("image/webp")
    );

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["picture"]["zoom"]["url"], outcome.uri);
    assert!(json["picture"]["zoom"].get("size").is_none());
    assert_eq!(json["picture"]["big"]["size"], 700);
    assert_eq!(json["picture"]["normal"]["size"], 350);
}

#[tokio::test]
async fn non_transformable_content_skips_provider() {
    let provider = MockProvider::new(vec![(
        SizeLabel::Big,
        false,
        Plan::Bytes(vec![1; 10]),
    )]);
    let h = harness(
        Some(provider.clone()),
        TransformStrategy::FanOut,
        vec![700, 350],
    );

    let mut req = request(None);
    req.filename = "doc.pdf".to_string();
    req.content_type = "application/pdf".to_string();
    let outcome = h.orchestrator.upload(req).await.unwrap();

    assert_eq!(outcome.picture.len(), 1);
    assert!(outcome.picture.contains(SizeLabel::Zoom));
    assert_eq!(provider.calls(), 0);
    assert_eq!(h.storage.object_count(), 1);
}

#[tokio::test]
async fn provider_total_failure_still_returns_zoom() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Fail),
        (SizeLabel::Big, true, Plan::Fail),
        (SizeLabel::Normal, false, Plan::Fail),
        (SizeLabel::Normal, true, Plan::Fail),
    ]);
    let h = harness(Some(provider), TransformStrategy::FanOut, vec![700, 350]);

    let outcome = h.orchestrator.upload(request(None)).await.unwrap();
    assert_eq!(outcome.picture.len(), 1);
    assert!(outcome.picture.contains(SizeLabel::Zoom));
}

#[tokio::test]
async fn partial_provider_failure_returns_partial_picture() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Bytes(vec![1; 30])),
        (SizeLabel::Big, true, Plan::Fail),
        (SizeLabel::Normal, false, Plan::Fail),
        (SizeLabel::Normal, true, Plan::Fail),
    ]);
    let h = harness(Some(provider), TransformStrategy::FanOut, vec![700, 350]);

    let outcome = h.orchestrator.upload(request(None)).await.unwrap();
    assert_eq!(outcome.picture.len(), 2);
    assert!(outcome.picture.contains(SizeLabel::Zoom));
    assert!(outcome.picture.contains(SizeLabel::Big));
    assert!(!outcome.picture.contains(SizeLabel::Normal));
}

#[tokio::test(start_paused = true)]
async fn transient_error_gets_one_retry() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::FlakyThenBytes(vec![1; 30])),
        (SizeLabel::Big, true, Plan::Fail),
    ]);
    let h = harness(
        Some(provider.clone()),
        TransformStrategy::Sequential,
        vec![700],
    );

    let outcome = h.orchestrator.upload(request(None)).await.unwrap();
    assert!(outcome.picture.contains(SizeLabel::Big));
    assert_eq!(provider.attempts_for(SizeLabel::Big, false), 2);
    assert_eq!(provider.attempts_for(SizeLabel::Big, true), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_variant_is_dropped_at_timeout() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Slow(Duration::from_secs(30))),
        (SizeLabel::Big, true, Plan::Bytes(vec![1; 10])),
    ]);
    let h = harness(Some(provider), TransformStrategy::Sequential, vec![700]);

    let outcome = h.orchestrator.upload(request(None)).await.unwrap();
    // The slow webp stalls the sequential phase past the deadline.
    assert_eq!(outcome.picture.len(), 1);
    assert!(outcome.picture.contains(SizeLabel::Zoom));
}

#[tokio::test]
async fn larger_payload_wins_the_label() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Bytes(vec![1; 30])),
        (SizeLabel::Big, true, Plan::Bytes(vec![1; 10])),
    ]);
    let h = harness(Some(provider), TransformStrategy::Sequential, vec![700]);
    let outcome = h.orchestrator.upload(request(None)).await.unwrap();
    assert!(outcome
        .picture
        .get(SizeLabel::Big)
        .unwrap()
        .url
        .ends_with(".webp"));

    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Bytes(vec![1; 10])),
        (SizeLabel::Big, true, Plan::Bytes(vec![1; 30])),
    ]);
    let h = harness(Some(provider), TransformStrategy::Sequential, vec![700]);
    let outcome = h.orchestrator.upload(request(None)).await.unwrap();
    assert!(outcome
        .picture
        .get(SizeLabel::Big)
        .unwrap()
        .url
        .ends_with(".avif"));
}

#[tokio::test]
async fn async_job_parks_pending_write_until_callback() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Job("job-w".to_string())),
        (SizeLabel::Big, true, Plan::Fail),
    ]);
    let h = harness(Some(provider), TransformStrategy::Sequential, vec![700]);

    let outcome = h.orchestrator.upload(request(None)).await.unwrap();

    // Optimistic URL in the response, object not written yet.
    let big = outcome.picture.get(SizeLabel::Big).unwrap();
    let variant_key = format!("123/imgs/big/{}.webp", outcome.key);
    assert_eq!(big.url, format!("https://cdn.test/{variant_key}"));
    assert!(h.storage.get(&variant_key).await.is_err());

    let parked = h.pending.get("123:job-w").await.unwrap();
    assert_eq!(parked.key, variant_key);
    assert_eq!(parked.content_type, "image/webp");

    // Webhook fires: body downloaded and written with parked instructions.
    let url = serve_once(b"webp-bytes").await;
    let callbacks = CallbackService::new(
        h.storage.clone() as Arc<dyn Storage>,
        h.pending.clone(),
    );
    callbacks.handle(123, "job-w", true, Some(&url)).await;

    assert_eq!(
        h.storage.get(&variant_key).await.unwrap(),
        Bytes::from_static(b"webp-bytes")
    );
    assert!(h.pending.get("123:job-w").await.is_none());

    // Replay of the same job id is a no-op.
    let writes_before = h.storage.put_attempts();
    callbacks.handle(123, "job-w", true, Some(&url)).await;
    assert_eq!(h.storage.put_attempts(), writes_before);
}

#[tokio::test]
async fn failed_job_callback_clears_pending_without_writing() {
    let provider = MockProvider::new(vec![
        (SizeLabel::Big, false, Plan::Job("job-w".to_string())),
        (SizeLabel::Big, true, Plan::Fail),
    ]);
    let h = harness(Some(provider), TransformStrategy::Sequential, vec![700]);
    h.orchestrator.upload(request(None)).await.unwrap();
    assert!(h.pending.get("123:job-w").await.is_some());

    let callbacks = CallbackService::new(
        h.storage.clone() as Arc<dyn Storage>,
        h.pending.clone(),
    );
    let writes_before = h.storage.put_attempts();
    callbacks.handle(123, "job-w", false, None).await;

    assert!(h.pending.get("123:job-w").await.is_none());
    assert_eq!(h.storage.put_attempts(), writes_before);
}
