//! Multi-datacenter replication.
//!
//! Every mutation goes to the primary Space synchronously; secondaries are
//! mirrored on background tasks and never block or fail the request. Reads
//! always hit the primary.

use crate::traits::{ObjectSummary, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CEILING_MS: u64 = 10_000;

pub struct ReplicatedStorage {
    primary: Arc<dyn Storage>,
    secondaries: Vec<Arc<dyn Storage>>,
    /// Current throttle delay for the primary, 0 when the bucket is healthy.
    backoff_ms: AtomicU64,
}

impl ReplicatedStorage {
    pub fn new(primary: Arc<dyn Storage>, secondaries: Vec<Arc<dyn Storage>>) -> Self {
        Self {
            primary,
            secondaries,
            backoff_ms: AtomicU64::new(0),
        }
    }

    pub fn primary(&self) -> &Arc<dyn Storage> {
        &self.primary
    }

    pub fn current_backoff_ms(&self) -> u64 {
        self.backoff_ms.load(Ordering::Relaxed)
    }

    /// Bump the throttle delay and return the value to sleep for.
    fn raise_backoff(&self) -> u64 {
        let mut current = self.backoff_ms.load(Ordering::Relaxed);
        loop {
            let next = if current == 0 {
                BACKOFF_BASE_MS
            } else {
                (current * 2).min(BACKOFF_CEILING_MS)
            };
            match self.backoff_ms.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Decay the throttle delay after a successful primary write.
    fn lower_backoff(&self) {
        let mut current = self.backoff_ms.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return;
            }
            let next = if current <= BACKOFF_BASE_MS {
                0
            } else {
                current / 2
            };
            match self.backoff_ms.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Write to the primary, retrying once after a pause if it throttles.
    async fn put_primary(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<()> {
        match self
            .primary
            .put(key, data.clone(), content_type, cache_control)
            .await
        {
            Ok(()) => {
                self.lower_backoff();
                return Ok(());
            }
            Err(err) if err.is_rate_limited() => {
                let delay_ms = self.raise_backoff();
                warn!(
                    bucket = self.primary.bucket(),
                    key, delay_ms, "primary throttled, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(err) => return Err(err),
        }

        let result = self.primary.put(key, data, content_type, cache_control).await;
        if result.is_ok() {
            self.lower_backoff();
        }
        result
    }

    fn mirror_put(&self, key: &str, data: &Bytes, content_type: &str, cache_control: &str) {
        for secondary in &self.secondaries {
            let secondary = Arc::clone(secondary);
            let key = key.to_string();
            let data = data.clone();
            let content_type = content_type.to_string();
            let cache_control = cache_control.to_string();
            tokio::spawn(async move {
                if let Err(error) =
                    secondary.put(&key, data, &content_type, &cache_control).await
                {
                    warn!(
                        bucket = secondary.bucket(),
                        key, %error, "secondary put failed"
                    );
                } else {
                    debug!(bucket = secondary.bucket(), key, "secondary put mirrored");
                }
            });
        }
    }

    fn mirror_delete(&self, key: &str) {
        for secondary in &self.secondaries {
            let secondary = Arc::clone(secondary);
            let key = key.to_string();
            tokio::spawn(async move {
                if let Err(error) = secondary.delete(&key).await {
                    warn!(
                        bucket = secondary.bucket(),
                        key, %error, "secondary delete failed"
                    );
                }
            });
        }
    }

    fn mirror_copy(&self, from_key: &str, to_key: &str) {
        for secondary in &self.secondaries {
            let secondary = Arc::clone(secondary);
            let from_key = from_key.to_string();
            let to_key = to_key.to_string();
            tokio::spawn(async move {
                if let Err(error) = secondary.copy(&from_key, &to_key).await {
                    warn!(
                        bucket = secondary.bucket(),
                        from_key, to_key, %error, "secondary copy failed"
                    );
                }
            });
        }
    }
}

#[async_trait]
impl Storage for ReplicatedStorage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<()> {
        self.put_primary(key, data.clone(), content_type, cache_control)
            .await?;
        self.mirror_put(key, &data, content_type, cache_control);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.primary.get(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<u64> {
        self.primary.head(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.primary.delete(key).await?;
        self.mirror_delete(key);
        Ok(())
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        self.primary.copy(from_key, to_key).await?;
        self.mirror_copy(from_key, to_key);
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectSummary>> {
        self.primary.list(prefix).await
    }

    fn bucket(&self) -> &str {
        self.primary.bucket()
    }
}
