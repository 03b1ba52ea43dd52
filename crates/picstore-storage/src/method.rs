//! Raw Space method passthrough.
//!
//! Exposes a constrained subset of the S3 API as named methods with JSON
//! parameters. Only single-object operations are allowed; anything that is
//! not an `*Object*` method is rejected before it reaches the backend.

use crate::traits::{Storage, StorageError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MethodError {
    #[error("method not allowed: {0}")]
    Forbidden(String),
    #[error("unknown method: {0}")]
    NotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Backend(#[from] StorageError),
}

fn require_str<'a>(params: &'a Value, field: &str) -> Result<&'a str, MethodError> {
    params
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MethodError::InvalidParams(format!("missing field `{field}`")))
}

/// Dispatch a named object method against the storage backend.
///
/// `params` follows the S3 request shape (`Key`, `Body`, `Prefix`, ...),
/// with `Body` carried as base64.
pub async fn run_method(
    storage: &dyn Storage,
    method: &str,
    params: &Value,
) -> Result<Value, MethodError> {
    if !method.contains("Object") {
        return Err(MethodError::Forbidden(method.to_string()));
    }

    match method {
        "putObject" => {
            let key = require_str(params, "Key")?;
            let body = require_str(params, "Body")?;
            let data = BASE64
                .decode(body)
                .map_err(|e| MethodError::InvalidParams(format!("invalid `Body` base64: {e}")))?;
            let content_type = params
                .get("ContentType")
                .and_then(Value::as_str)
                .unwrap_or("application/octet-stream");
            let cache_control = params
                .get("CacheControl")
                .and_then(Value::as_str)
                .unwrap_or("");
            storage
                .put(key, Bytes::from(data), content_type, cache_control)
                .await?;
            Ok(json!({ "Key": key }))
        }
        "getObject" => {
            let key = require_str(params, "Key")?;
            let data = storage.get(key).await?;
            Ok(json!({
                "Key": key,
                "ContentLength": data.len(),
                "Body": BASE64.encode(&data),
            }))
        }
        "headObject" => {
            let key = require_str(params, "Key")?;
            let size = storage.head(key).await?;
            Ok(json!({ "ContentLength": size }))
        }
        "deleteObject" => {
            let key = require_str(params, "Key")?;
            storage.delete(key).await?;
            Ok(json!({}))
        }
        "copyObject" => {
            let key = require_str(params, "Key")?;
            let source = require_str(params, "CopySource")?;
            storage.copy(source, key).await?;
            Ok(json!({ "Key": key }))
        }
        "listObjects" => {
            let prefix = params.get("Prefix").and_then(Value::as_str);
            let contents = storage.list(prefix).await?;
            Ok(json!({ "Contents": contents }))
        }
        other => Err(MethodError::NotFound(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    #[tokio::test]
    async fn rejects_methods_without_object() {
        let storage = MemoryStorage::new("b");
        let err = run_method(&storage, "createBucket", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MethodError::Forbidden(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_object_methods() {
        let storage = MemoryStorage::new("b");
        let err = run_method(&storage, "restoreObject", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MethodError::NotFound(_)));
    }

    #[tokio::test]
    async fn put_then_get_round_trips_base64_body() {
        let storage = MemoryStorage::new("b");
        let params = json!({
            "Key": "123/@v4/a.png",
            "Body": BASE64.encode(b"png-bytes"),
            "ContentType": "image/png",
        });
        run_method(&storage, "putObject", &params).await.unwrap();

        let got = run_method(&storage, "getObject", &json!({ "Key": "123/@v4/a.png" }))
            .await
            .unwrap();
        assert_eq!(got["ContentLength"], 9);
        assert_eq!(got["Body"], BASE64.encode(b"png-bytes"));
    }

    #[tokio::test]
    async fn put_without_body_is_invalid() {
        let storage = MemoryStorage::new("b");
        let err = run_method(&storage, "putObject", &json!({ "Key": "k" }))
            .await
            .unwrap_err();
        assert!(matches!(err, MethodError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn list_objects_returns_s3_shaped_contents() {
        let storage = MemoryStorage::new("b");
        storage
            .put("123/a", Bytes::from_static(b"xy"), "image/png", "")
            .await
            .unwrap();
        let out = run_method(&storage, "listObjects", &json!({ "Prefix": "123/" }))
            .await
            .unwrap();
        let contents = out["Contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["Key"], "123/a");
        assert_eq!(contents[0]["Size"], 2);
    }
}
