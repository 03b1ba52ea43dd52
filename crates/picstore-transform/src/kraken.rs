//! Kraken.io provider.
//!
//! Kraken pulls the image from its public Space URL, one request per
//! variant. In webhook mode every request returns a job id and the
//! optimized body arrives later on the callback endpoint; without a
//! webhook the request blocks and returns a result URL to download.

use crate::traits::{TransformError, TransformOutput, TransformProvider, VariantOutcome};
use async_trait::async_trait;
use picstore_core::keys;
use picstore_core::models::{SizeSpec, UploadedOriginal};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://api.kraken.io/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    kraked_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct KrakenProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    api_secret: String,
    /// Host used to build the public source URL Kraken pulls from.
    public_host: String,
    /// Base URL of this service; when set, requests run in webhook mode.
    callback_base_url: Option<String>,
}

impl KrakenProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        api_secret: String,
        public_host: String,
        callback_base_url: Option<String>,
    ) -> Self {
        Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key,
            api_secret,
            public_host,
            callback_base_url,
        }
    }

    #[cfg(test)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn callback_url(&self, store_id: u64) -> Option<String> {
        self.callback_base_url.as_deref().map(|base| {
            format!(
                "{}/callback/kraken.json?store={}",
                base.trim_end_matches('/'),
                store_id
            )
        })
    }

    fn build_payload(&self, original: &UploadedOriginal, spec: &SizeSpec) -> Value {
        let source_url = keys::mount_uri(&self.public_host, original.store_id, &original.key);
        let format = if spec.next_gen { "avif" } else { "webp" };
        let mut payload = json!({
            "auth": {
                "api_key": self.api_key,
                "api_secret": self.api_secret,
            },
            "url": source_url,
            "lossy": true,
            "convert": { "format": format },
        });
        if let Some(width) = spec.max_dimension {
            payload["resize"] = json!({ "width": width, "strategy": "auto" });
        }
        match self.callback_url(original.store_id) {
            Some(callback_url) => payload["callback_url"] = json!(callback_url),
            None => payload["wait"] = json!(true),
        }
        payload
    }
}

#[async_trait]
impl TransformProvider for KrakenProvider {
    async fn transform(
        &self,
        original: &UploadedOriginal,
        specs: &[SizeSpec],
    ) -> Result<Vec<VariantOutcome>, TransformError> {
        let mut outcomes = Vec::with_capacity(specs.len());
        let mut last_error = None;
        for spec in specs {
            match self.transform_one(original, spec).await {
                Ok(output) => outcomes.push(VariantOutcome {
                    spec: spec.clone(),
                    output,
                }),
                Err(error) => {
                    warn!(label = spec.label.as_str(), %error, "kraken variant failed");
                    last_error = Some(error);
                }
            }
        }
        // Only a total failure bubbles up; partial results are still usable.
        if outcomes.is_empty() {
            if let Some(error) = last_error {
                return Err(error);
            }
        }
        Ok(outcomes)
    }

    async fn transform_one(
        &self,
        original: &UploadedOriginal,
        spec: &SizeSpec,
    ) -> Result<TransformOutput, TransformError> {
        let payload = self.build_payload(original, spec);
        let response = self
            .client
            .post(format!("{}/url", self.api_base))
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransformError::UpstreamStatus(status.as_u16()));
        }

        let body: KrakenResponse = response.json().await?;
        if let Some(id) = body.id {
            debug!(
                label = spec.label.as_str(),
                transform_id = id,
                "kraken job accepted"
            );
            return Ok(TransformOutput::Async { transform_id: id });
        }
        if body.success {
            if let Some(url) = body.kraked_url {
                return Ok(TransformOutput::Url { url });
            }
            return Err(TransformError::MalformedResponse("kraked_url"));
        }
        Err(TransformError::Rejected(
            body.message.unwrap_or_else(|| "no detail".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use picstore_core::models::SizeLabel;

    fn provider(callback: Option<&str>) -> KrakenProvider {
        KrakenProvider::new(
            reqwest::Client::new(),
            "key".to_string(),
            "secret".to_string(),
            "cdn.example.com".to_string(),
            callback.map(str::to_string),
        )
    }

    fn original() -> UploadedOriginal {
        UploadedOriginal {
            data: Bytes::from_static(b"img"),
            content_type: "image/jpeg".to_string(),
            key: "@v4/123-a.jpg".to_string(),
            store_id: 123,
            bucket: "pics-nyc3".to_string(),
        }
    }

    fn spec() -> SizeSpec {
        SizeSpec {
            label: SizeLabel::Big,
            max_dimension: Some(700),
            next_gen: false,
        }
    }

    #[test]
    fn webhook_mode_sets_scoped_callback_url() {
        let provider = provider(Some("https://storage.example.com/"));
        let payload = provider.build_payload(&original(), &spec());
        assert_eq!(
            payload["callback_url"],
            "https://storage.example.com/callback/kraken.json?store=123"
        );
        assert!(payload.get("wait").is_none());
    }

    #[test]
    fn sync_mode_waits() {
        let provider = provider(None);
        let payload = provider.build_payload(&original(), &spec());
        assert_eq!(payload["wait"], true);
        assert!(payload.get("callback_url").is_none());
    }

    #[test]
    fn payload_points_at_public_space_url() {
        let provider = provider(None);
        let payload = provider.build_payload(&original(), &spec());
        assert_eq!(
            payload["url"],
            "https://cdn.example.com/123/@v4/123-a.jpg"
        );
        assert_eq!(payload["resize"]["width"], 700);
        assert_eq!(payload["convert"]["format"], "webp");
    }

    #[test]
    fn async_response_yields_job_id() {
        let body: KrakenResponse =
            serde_json::from_str(r#"{"id":"job-1"}"#).unwrap();
        assert_eq!(body.id.as_deref(), Some("job-1"));
    }
}
