use crate::pending::PendingStore;
use bytes::Bytes;
use picstore_core::config::{Config, TransformStrategy};
use picstore_core::keys;
use picstore_core::models::{
    scoped_transform_id, PendingWrite, PictureEntry, PictureMap, RequestOutcome, SizeSpec,
    UploadedOriginal, CACHE_CONTROL_LONG,
};
use picstore_storage::{Storage, StorageError};
use picstore_transform::{Downloader, TransformError, TransformOutput, TransformProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The original image could not be written to the primary Space. This is
    /// the only fatal pipeline error; every later step degrades gracefully.
    #[error("failed to store original: {0}")]
    OriginalWrite(#[from] StorageError),
}

pub struct UploadRequest {
    pub store_id: u64,
    pub directory: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// The aggregated result returned to the uploader.
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub bucket: String,
    pub key: String,
    pub uri: String,
    pub picture: PictureMap,
}

#[derive(Clone)]
pub struct OrchestratorSettings {
    pub public_host: String,
    pub picture_sizes: Vec<u32>,
    pub strategy: TransformStrategy,
    pub transform_timeout: Duration,
    pub variant_retry_delay: Duration,
}

/// Shared pieces a variant write needs, cloneable into spawned tasks.
#[derive(Clone)]
struct VariantWriter {
    storage: Arc<dyn Storage>,
    downloader: Downloader,
    pending: PendingStore,
    public_host: String,
}

impl VariantWriter {
    async fn apply(
        self,
        outcome: Arc<RequestOutcome>,
        store_id: u64,
        key: String,
        bucket: String,
        spec: SizeSpec,
        output: TransformOutput,
    ) {
        match output {
            TransformOutput::Bytes { data, content_type } => {
                self.write_variant(&outcome, store_id, &key, &spec, data, &content_type)
                    .await;
            }
            TransformOutput::Url { url } => match self.downloader.fetch(&url).await {
                Ok(data) => {
                    let content_type = spec.content_type().to_string();
                    self.write_variant(&outcome, store_id, &key, &spec, data, &content_type)
                        .await;
                }
                Err(error) => {
                    warn!(label = spec.label.as_str(), url, %error, "variant download failed");
                }
            },
            TransformOutput::Async { transform_id } => {
                let variant_key = keys::variant_key(spec.label.as_str(), &key, spec.next_gen);
                let object_key = keys::storage_key(store_id, &variant_key);
                self.pending
                    .set(
                        scoped_transform_id(store_id, &transform_id),
                        PendingWrite {
                            bucket,
                            key: object_key,
                            content_type: spec.content_type().to_string(),
                            cache_control: CACHE_CONTROL_LONG.to_string(),
                        },
                    )
                    .await;
                // The object does not exist yet; return its future URL and
                // let the webhook fill it in.
                let url = keys::mount_uri(&self.public_host, store_id, &variant_key);
                outcome.insert(spec.label, PictureEntry::new(url, spec.max_dimension, 0));
                debug!(
                    label = spec.label.as_str(),
                    transform_id, "variant parked for webhook"
                );
            }
        }
        outcome.mark_resolved();
    }

    async fn write_variant(
        &self,
        outcome: &RequestOutcome,
        store_id: u64,
        key: &str,
        spec: &SizeSpec,
        data: Bytes,
        content_type: &str,
    ) {
        let variant_key = keys::variant_key(spec.label.as_str(), key, spec.next_gen);
        let object_key = keys::storage_key(store_id, &variant_key);
        match self
            .storage
            .put(&object_key, data.clone(), content_type, CACHE_CONTROL_LONG)
            .await
        {
            Ok(()) => {
                let url = keys::mount_uri(&self.public_host, store_id, &variant_key);
                outcome.insert(
                    spec.label,
                    PictureEntry::new(url, spec.max_dimension, data.len() as u64),
                );
            }
            Err(error) => {
                warn!(label = spec.label.as_str(), object_key, %error, "variant write failed");
            }
        }
    }
}

pub struct Orchestrator {
    writer: VariantWriter,
    provider: Option<Arc<dyn TransformProvider>>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        provider: Option<Arc<dyn TransformProvider>>,
        pending: PendingStore,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            writer: VariantWriter {
                storage,
                downloader: Downloader::default(),
                pending,
                public_host: settings.public_host.clone(),
            },
            provider,
            settings,
        }
    }

    /// Store the original, produce size variants, and aggregate the result.
    ///
    /// Only the original write can fail; variants that do not materialize
    /// in time are simply absent from the returned picture map.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, PipelineError> {
        let started = Instant::now();
        let key = keys::generate_key(request.directory.as_deref(), &request.filename);
        let object_key = keys::storage_key(request.store_id, &key);
        let bucket = self.writer.storage.bucket().to_string();

        self.writer
            .storage
            .put(
                &object_key,
                request.data.clone(),
                &request.content_type,
                CACHE_CONTROL_LONG,
            )
            .await?;
        info!(
            store_id = request.store_id,
            key, bucket, "original stored"
        );

        let uri = keys::mount_uri(&self.settings.public_host, request.store_id, &key);
        let specs = SizeSpec::list_from_sizes(&self.settings.picture_sizes);
        let outcome = Arc::new(RequestOutcome::new(specs.len()));
        outcome.insert_zoom(&uri, request.data.len() as u64);

        let transformable = Config::is_transformable(&request.content_type);
        if let Some(provider) = self.provider.as_ref().filter(|_| transformable) {
            if !specs.is_empty() {
                let original = UploadedOriginal {
                    data: request.data,
                    content_type: request.content_type,
                    key: key.clone(),
                    store_id: request.store_id,
                    bucket: bucket.clone(),
                };
                let phase = self.run_transforms(
                    Arc::clone(provider),
                    original,
                    &specs,
                    Arc::clone(&outcome),
                );
                if tokio::time::timeout(self.settings.transform_timeout, phase)
                    .await
                    .is_err()
                {
                    warn!(
                        store_id = request.store_id,
                        key,
                        resolved = outcome.resolved(),
                        attempted = outcome.attempted(),
                        "transform phase timed out"
                    );
                }
            }
        } else if !transformable {
            debug!(key, "content type not transformable, zoom only");
        }

        outcome.finalize();
        let picture = outcome.picture_snapshot();
        info!(
            store_id = request.store_id,
            key,
            bucket,
            variants = picture.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "upload done"
        );
        Ok(UploadOutcome {
            bucket,
            key,
            uri,
            picture,
        })
    }

    async fn run_transforms(
        &self,
        provider: Arc<dyn TransformProvider>,
        original: UploadedOriginal,
        specs: &[SizeSpec],
        outcome: Arc<RequestOutcome>,
    ) {
        match self.settings.strategy {
            TransformStrategy::Sequential => {
                for spec in specs {
                    match self.call_one_with_retry(&*provider, &original, spec).await {
                        Ok(output) => {
                            self.writer
                                .clone()
                                .apply(
                                    Arc::clone(&outcome),
                                    original.store_id,
                                    original.key.clone(),
                                    original.bucket.clone(),
                                    spec.clone(),
                                    output,
                                )
                                .await;
                        }
                        Err(error) => {
                            warn!(label = spec.label.as_str(), %error, "variant transform failed");
                            outcome.mark_resolved();
                        }
                    }
                }
            }
            TransformStrategy::FanOut => {
                let mut result = provider.transform(&original, specs).await;
                if matches!(&result, Err(error) if error.is_retryable()) {
                    tokio::time::sleep(self.settings.variant_retry_delay).await;
                    result = provider.transform(&original, specs).await;
                }
                let produced = match result {
                    Ok(produced) => produced,
                    Err(error) => {
                        warn!(%error, "transform provider failed");
                        for _ in specs {
                            outcome.mark_resolved();
                        }
                        return;
                    }
                };

                // Variants the provider skipped resolve right away.
                for _ in produced.len()..specs.len() {
                    outcome.mark_resolved();
                }

                let mut tasks = JoinSet::new();
                for variant in produced {
                    let writer = self.writer.clone();
                    let outcome = Arc::clone(&outcome);
                    let store_id = original.store_id;
                    let key = original.key.clone();
                    let bucket = original.bucket.clone();
                    tasks.spawn(async move {
                        writer
                            .apply(outcome, store_id, key, bucket, variant.spec, variant.output)
                            .await;
                    });
                }
                while tasks.join_next().await.is_some() {}
            }
        }
    }

    /// One retry for transient provider errors, then give the variant up.
    async fn call_one_with_retry(
        &self,
        provider: &dyn TransformProvider,
        original: &UploadedOriginal,
        spec: &SizeSpec,
    ) -> Result<TransformOutput, TransformError> {
        match provider.transform_one(original, spec).await {
            Err(error) if error.is_retryable() => {
                warn!(
                    label = spec.label.as_str(),
                    %error,
                    delay_ms = self.settings.variant_retry_delay.as_millis() as u64,
                    "transient provider error, retrying variant"
                );
                tokio::time::sleep(self.settings.variant_retry_delay).await;
                provider.transform_one(original, spec).await
            }
            result => result,
        }
    }
}
