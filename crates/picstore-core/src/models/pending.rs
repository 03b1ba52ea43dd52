//! Deferred storage-write instructions for asynchronous transforms.

use serde::{Deserialize, Serialize};

/// Everything the callback receiver needs to finish one deferred variant write.
/// Stored under the provider's transform id (re-scoped per store) with a short
/// TTL; if the TTL expires first the variant is silently lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub bucket: String,
    /// Full tenant-scoped storage key, e.g. `123/imgs/big/@v4/....webp`.
    pub key: String,
    pub content_type: String,
    pub cache_control: String,
}

/// Cache policy applied to every stored object.
pub const CACHE_CONTROL_LONG: &str = "public, max-age=31536000";

/// Scope a provider-assigned transform id by tenant so two stores can never
/// collide even if provider ids repeat within the TTL window.
pub fn scoped_transform_id(store_id: u64, transform_id: &str) -> String {
    format!("{}:{}", store_id, transform_id)
}
