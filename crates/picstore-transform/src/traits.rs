use async_trait::async_trait;
use bytes::Bytes;
use picstore_core::models::{SizeSpec, UploadedOriginal};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("provider returned status {0}")]
    UpstreamStatus(u16),
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider response missing field `{0}`")]
    MalformedResponse(&'static str),
    #[error("provider rejected image: {0}")]
    Rejected(String),
}

impl TransformError {
    /// Transient upstream conditions worth a single retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransformError::UpstreamStatus(status) => matches!(status, 503 | 504),
            TransformError::Request(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// What a provider produced for one size variant.
#[derive(Debug, Clone)]
pub enum TransformOutput {
    /// Ready image bytes.
    Bytes { data: Bytes, content_type: String },
    /// A URL the caller must download.
    Url { url: String },
    /// Job accepted, result arrives on the webhook with this id.
    Async { transform_id: String },
}

#[derive(Debug, Clone)]
pub struct VariantOutcome {
    pub spec: SizeSpec,
    pub output: TransformOutput,
}

/// An external image optimization service.
#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Produce every requested variant of the original in one provider
    /// session. Per-variant failures are skipped and logged; an error means
    /// the provider could not process the image at all.
    async fn transform(
        &self,
        original: &UploadedOriginal,
        specs: &[SizeSpec],
    ) -> Result<Vec<VariantOutcome>, TransformError>;

    /// Produce a single variant. Used for sequential mode and retries.
    async fn transform_one(
        &self,
        original: &UploadedOriginal,
        spec: &SizeSpec,
    ) -> Result<TransformOutput, TransformError>;
}
