//! Cloudflare Images provider.
//!
//! The original is uploaded once, then each size variant is fetched back
//! through a flexible variant URL and returned as ready bytes. Uploaded
//! images are deleted from Cloudflare after a grace period since the CDN
//! copy lives in the Space, not in Cloudflare.

use crate::download::Downloader;
use crate::traits::{TransformError, TransformOutput, TransformProvider, VariantOutcome};
use async_trait::async_trait;
use picstore_core::models::{SizeSpec, UploadedOriginal};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DELETE_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ImagesError>,
    result: Option<ImagesResult>,
}

#[derive(Debug, Deserialize)]
struct ImagesError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResult {
    id: String,
    #[serde(default)]
    variants: Vec<String>,
}

pub struct CloudflareProvider {
    client: reqwest::Client,
    downloader: Downloader,
    api_base: String,
    account_id: String,
    api_token: String,
}

impl CloudflareProvider {
    pub fn new(client: reqwest::Client, account_id: String, api_token: String) -> Self {
        let downloader = Downloader::new(client.clone());
        Self {
            client,
            downloader,
            api_base: DEFAULT_API_BASE.to_string(),
            account_id,
            api_token,
        }
    }

    #[cfg(test)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Upload the original and return `(image_id, delivery_base)`, where
    /// `delivery_base` is the variant URL with its variant segment stripped.
    async fn upload_original(
        &self,
        original: &UploadedOriginal,
    ) -> Result<(String, String), TransformError> {
        let part = reqwest::multipart::Part::bytes(original.data.to_vec())
            .file_name(original.key.clone())
            .mime_str(&original.content_type)
            .map_err(TransformError::Request)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!(
                "{}/accounts/{}/images/v1",
                self.api_base, self.account_id
            ))
            .bearer_auth(&self.api_token)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransformError::UpstreamStatus(status.as_u16()));
        }

        let body: ImagesResponse = response.json().await?;
        if !body.success {
            let detail = body
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TransformError::Rejected(detail));
        }
        let result = body
            .result
            .ok_or(TransformError::MalformedResponse("result"))?;
        let variant = result
            .variants
            .first()
            .ok_or(TransformError::MalformedResponse("result.variants"))?;
        let delivery_base = variant
            .rsplit_once('/')
            .map(|(base, _)| base.to_string())
            .ok_or(TransformError::MalformedResponse("result.variants"))?;
        debug!(image_id = result.id, key = original.key, "uploaded to cloudflare");
        Ok((result.id, delivery_base))
    }

    fn variant_url(delivery_base: &str, spec: &SizeSpec) -> String {
        let format = if spec.next_gen { "avif" } else { "webp" };
        match spec.max_dimension {
            Some(width) => format!("{delivery_base}/w={width},fit=scale-down,format={format}"),
            None => format!("{delivery_base}/format={format}"),
        }
    }

    /// Remove the image from Cloudflare after the variants had a chance to
    /// be fetched. Best effort, off the request path.
    fn schedule_delete(&self, image_id: String) {
        let client = self.client.clone();
        let url = format!(
            "{}/accounts/{}/images/v1/{}",
            self.api_base, self.account_id, image_id
        );
        let token = self.api_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DELETE_DELAY).await;
            match client.delete(&url).bearer_auth(&token).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(image_id, "deleted from cloudflare");
                }
                Ok(response) => {
                    warn!(image_id, status = %response.status(), "cloudflare delete failed");
                }
                Err(error) => {
                    warn!(image_id, %error, "cloudflare delete failed");
                }
            }
        });
    }
}

#[async_trait]
impl TransformProvider for CloudflareProvider {
    async fn transform(
        &self,
        original: &UploadedOriginal,
        specs: &[SizeSpec],
    ) -> Result<Vec<VariantOutcome>, TransformError> {
        let (image_id, delivery_base) = self.upload_original(original).await?;

        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            let url = Self::variant_url(&delivery_base, spec);
            match self.downloader.fetch(&url).await {
                Ok(data) => outcomes.push(VariantOutcome {
                    spec: spec.clone(),
                    output: TransformOutput::Bytes {
                        data,
                        content_type: spec.content_type().to_string(),
                    },
                }),
                Err(error) => {
                    warn!(
                        label = spec.label.as_str(),
                        url, %error, "variant download failed"
                    );
                }
            }
        }

        self.schedule_delete(image_id);
        Ok(outcomes)
    }

    async fn transform_one(
        &self,
        original: &UploadedOriginal,
        spec: &SizeSpec,
    ) -> Result<TransformOutput, TransformError> {
        let (image_id, delivery_base) = self.upload_original(original).await?;
        let url = Self::variant_url(&delivery_base, spec);
        let result = self.downloader.fetch(&url).await;
        self.schedule_delete(image_id);
        let data = result?;
        Ok(TransformOutput::Bytes {
            data,
            content_type: spec.content_type().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picstore_core::models::SizeLabel;

    fn spec(label: SizeLabel, width: u32, next_gen: bool) -> SizeSpec {
        SizeSpec {
            label,
            max_dimension: Some(width),
            next_gen,
        }
    }

    #[test]
    fn variant_url_encodes_width_and_format() {
        let base = "https://imagedelivery.net/hash/img-id";
        assert_eq!(
            CloudflareProvider::variant_url(base, &spec(SizeLabel::Big, 700, false)),
            "https://imagedelivery.net/hash/img-id/w=700,fit=scale-down,format=webp"
        );
        assert_eq!(
            CloudflareProvider::variant_url(base, &spec(SizeLabel::Big, 700, true)),
            "https://imagedelivery.net/hash/img-id/w=700,fit=scale-down,format=avif"
        );
    }

    #[test]
    fn error_response_is_rejected() {
        let body: ImagesResponse = serde_json::from_str(
            r#"{"success":false,"errors":[{"code":5455,"message":"unsupported format"}],"result":null}"#,
        )
        .unwrap();
        assert!(!body.success);
        assert_eq!(body.errors[0].code, 5455);
    }

    #[test]
    fn result_parses_variants() {
        let body: ImagesResponse = serde_json::from_str(
            r#"{"success":true,"errors":[],"result":{"id":"abc","variants":["https://imagedelivery.net/h/abc/public"]}}"#,
        )
        .unwrap();
        let result = body.result.unwrap();
        assert_eq!(result.id, "abc");
        assert_eq!(result.variants.len(), 1);
    }
}
