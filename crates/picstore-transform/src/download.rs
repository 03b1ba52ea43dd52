use crate::traits::TransformError;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches image bodies from provider result URLs.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<Bytes, TransformError> {
        let response = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransformError::UpstreamStatus(status.as_u16()));
        }
        let body = response.bytes().await?;
        debug!(url, size_bytes = body.len(), "downloaded image body");
        Ok(body)
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}
