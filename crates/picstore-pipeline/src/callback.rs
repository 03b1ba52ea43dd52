use crate::pending::PendingStore;
use picstore_core::models::scoped_transform_id;
use picstore_storage::Storage;
use picstore_transform::Downloader;
use std::sync::Arc;
use tracing::{info, warn};

/// Completes async transform jobs when the provider webhook fires.
///
/// Callbacks never fail the HTTP request: an unknown or expired job id, a
/// failed download, or a failed write are all logged and dropped, since the
/// uploader already got its response.
#[derive(Clone)]
pub struct CallbackService {
    storage: Arc<dyn Storage>,
    pending: PendingStore,
    downloader: Downloader,
}

impl CallbackService {
    pub fn new(storage: Arc<dyn Storage>, pending: PendingStore) -> Self {
        Self {
            storage,
            pending,
            downloader: Downloader::default(),
        }
    }

    pub async fn handle(
        &self,
        store_id: u64,
        transform_id: &str,
        success: bool,
        result_url: Option<&str>,
    ) {
        let scoped = scoped_transform_id(store_id, transform_id);
        let Some(write) = self.pending.get(&scoped).await else {
            warn!(store_id, transform_id, "callback for unknown or expired job");
            return;
        };

        if !success {
            warn!(store_id, transform_id, key = write.key, "provider reported job failure");
            self.pending.remove(&scoped).await;
            return;
        }
        let Some(url) = result_url else {
            warn!(store_id, transform_id, "callback missing result url");
            return;
        };

        let data = match self.downloader.fetch(url).await {
            Ok(data) => data,
            Err(error) => {
                warn!(store_id, transform_id, url, %error, "callback download failed");
                return;
            }
        };
        match self
            .storage
            .put(&write.key, data, &write.content_type, &write.cache_control)
            .await
        {
            Ok(()) => {
                info!(store_id, transform_id, key = write.key, "async variant stored");
                self.pending.remove(&scoped).await;
            }
            Err(error) => {
                warn!(store_id, transform_id, key = write.key, %error, "async variant write failed");
            }
        }
    }
}
