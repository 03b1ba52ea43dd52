//! Picstore storage library
//!
//! Object-storage abstraction and implementations for the upload gateway: the
//! `Storage` trait, the S3-compatible Spaces backend, an in-memory backend for
//! tests, the replicated (primary + mirrored secondaries) client, and the
//! generic object-method passthrough used by the `/s3/:method.json` endpoint.
//!
//! Keys handed to this crate are already tenant-scoped (`{store_id}/...`); key
//! generation lives in `picstore_core::keys`.

pub mod memory;
pub mod method;
pub mod replicated;
pub mod s3;
pub mod traits;

pub use memory::{MemoryStorage, PutFault};
pub use method::{run_method, MethodError};
pub use replicated::ReplicatedStorage;
pub use s3::S3Storage;
pub use traits::{ObjectSummary, Storage, StorageError, StorageResult};
