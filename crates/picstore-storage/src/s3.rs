//! S3-compatible Spaces backend on `object_store`.

use crate::traits::{ObjectSummary, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
#[allow(unused_imports)]
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};

/// One regional S3-compatible backend ("Space").
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance.
    ///
    /// # Arguments
    /// * `bucket` - bucket name, e.g. `mystore-nyc3`
    /// * `region` - region identifier (the datacenter, e.g. `nyc3`)
    /// * `endpoint_url` - endpoint for the S3-compatible provider
    ///   (e.g. "https://nyc3.digitaloceanspaces.com")
    pub fn new(bucket: String, region: String, endpoint_url: &str) -> StorageResult<Self> {
        // Credentials come from the environment (AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY).
        let allow_http = endpoint_url.starts_with("http://");
        let store = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone())
            .with_endpoint(endpoint_url.to_string())
            .with_allow_http(allow_http)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage { store, bucket })
    }

    /// Map a backend error, recognizing the throttling condition the S3 API
    /// signals as HTTP 503 / "SlowDown".
    fn map_error(key: &str, err: ObjectStoreError) -> StorageError {
        match err {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                let msg = other.to_string();
                if msg.contains("SlowDown")
                    || msg.contains("503")
                    || msg.contains("429")
                    || msg.contains("Too Many Requests")
                {
                    StorageError::RateLimited(msg)
                } else {
                    StorageError::BackendError(msg)
                }
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Path::from(key);
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        attributes.insert(Attribute::CacheControl, cache_control.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;

        result.map_err(|e| {
            let mapped = Self::map_error(key, e);
            tracing::error!(
                error = %mapped,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            match mapped {
                StorageError::RateLimited(msg) => StorageError::RateLimited(msg),
                StorageError::NotFound(msg) => StorageError::UploadFailed(msg),
                other => StorageError::UploadFailed(other.to_string()),
            }
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let location = Path::from(key);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| Self::map_error(key, e))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        Ok(bytes)
    }

    async fn head(&self, key: &str) -> StorageResult<u64> {
        let location = Path::from(key);
        let meta = self
            .store
            .head(&location)
            .await
            .map_err(|e| Self::map_error(key, e))?;
        Ok(meta.size)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = Path::from(key);
        self.store.delete(&location).await.map_err(|e| {
            let mapped = Self::map_error(key, e);
            match mapped {
                StorageError::NotFound(msg) => StorageError::NotFound(msg),
                other => StorageError::DeleteFailed(other.to_string()),
            }
        })?;
        Ok(())
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let from = Path::from(from_key);
        let to = Path::from(to_key);
        self.store
            .copy(&from, &to)
            .await
            .map_err(|e| Self::map_error(from_key, e))?;
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectSummary>> {
        let prefix_path = prefix.map(Path::from);
        let mut stream = self.store.list(prefix_path.as_ref());

        let mut objects = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| StorageError::BackendError(e.to_string()))?;
            objects.push(ObjectSummary {
                key: meta.location.to_string(),
                size: meta.size,
                last_modified: Some(meta.last_modified),
            });
        }
        Ok(objects)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
