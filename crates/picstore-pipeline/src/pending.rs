use moka::future::Cache;
use picstore_core::models::PendingWrite;
use std::time::Duration;

/// Write instructions waiting for a provider webhook, expiring after a TTL
/// so abandoned jobs do not accumulate.
#[derive(Clone)]
pub struct PendingStore {
    cache: Cache<String, PendingWrite>,
}

impl PendingStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub async fn set(&self, scoped_id: String, write: PendingWrite) {
        self.cache.insert(scoped_id, write).await;
    }

    pub async fn get(&self, scoped_id: &str) -> Option<PendingWrite> {
        self.cache.get(scoped_id).await
    }

    pub async fn remove(&self, scoped_id: &str) {
        self.cache.invalidate(scoped_id).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write() -> PendingWrite {
        PendingWrite {
            bucket: "pics-nyc3".to_string(),
            key: "123/imgs/big/@v4/1-a.jpg.webp".to_string(),
            content_type: "image/webp".to_string(),
            cache_control: "public, max-age=31536000".to_string(),
        }
    }

    #[tokio::test]
    async fn set_get_remove() {
        let store = PendingStore::new(Duration::from_secs(600));
        store.set("123:job-1".to_string(), write()).await;

        let got = store.get("123:job-1").await.unwrap();
        assert_eq!(got.key, "123/imgs/big/@v4/1-a.jpg.webp");

        store.remove("123:job-1").await;
        assert!(store.get("123:job-1").await.is_none());
    }

    #[tokio::test]
    async fn ids_are_store_scoped() {
        let store = PendingStore::new(Duration::from_secs(600));
        store.set("123:job-1".to_string(), write()).await;
        assert!(store.get("456:job-1").await.is_none());
    }
}
