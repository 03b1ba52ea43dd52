//! In-memory storage backend.
//!
//! Used by tests and local development in place of a real Space. Supports
//! scripted put faults so replication and backoff behavior can be exercised
//! without a backend.

use crate::traits::{ObjectSummary, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

/// A scripted failure for the next `put` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutFault {
    /// Permanent failure.
    Fail,
    /// Backend throttling ("SlowDown").
    RateLimit,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    cache_control: String,
    last_modified: chrono::DateTime<Utc>,
}

pub struct MemoryStorage {
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    put_faults: Mutex<VecDeque<PutFault>>,
    put_count: AtomicUsize,
}

impl MemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
            put_faults: Mutex::new(VecDeque::new()),
            put_count: AtomicUsize::new(0),
        }
    }

    /// Queue a fault consumed by the next `put` call.
    pub fn push_put_fault(&self, fault: PutFault) {
        self.put_faults
            .lock()
            .expect("fault queue poisoned")
            .push_back(fault);
    }

    /// Total `put` attempts seen (including faulted ones).
    pub fn put_attempts(&self) -> usize {
        self.put_count.load(Ordering::Relaxed)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().expect("objects lock poisoned").len()
    }

    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .expect("objects lock poisoned")
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub fn cache_control_of(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .expect("objects lock poisoned")
            .get(key)
            .map(|o| o.cache_control.clone())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<()> {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let fault = self
            .put_faults
            .lock()
            .expect("fault queue poisoned")
            .pop_front();
        match fault {
            Some(PutFault::Fail) => {
                return Err(StorageError::UploadFailed("scripted failure".to_string()))
            }
            Some(PutFault::RateLimit) => {
                return Err(StorageError::RateLimited("SlowDown".to_string()))
            }
            None => {}
        }

        let mut objects = self.objects.write().expect("objects lock poisoned");
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .read()
            .expect("objects lock poisoned")
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn head(&self, key: &str) -> StorageResult<u64> {
        self.objects
            .read()
            .expect("objects lock poisoned")
            .get(key)
            .map(|o| o.data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().expect("objects lock poisoned");
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().expect("objects lock poisoned");
        let object = objects
            .get(from_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from_key.to_string()))?;
        objects.insert(to_key.to_string(), object);
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectSummary>> {
        let objects = self.objects.read().expect("objects lock poisoned");
        let mut summaries: Vec<ObjectSummary> = objects
            .iter()
            .filter(|(key, _)| prefix.map(|p| key.starts_with(p)).unwrap_or(true))
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(summaries)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
