//! Credential verification against the Store API.

use picstore_core::AppError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub struct StoreAuth {
    client: reqwest::Client,
    api_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl StoreAuth {
    pub fn new(client: reqwest::Client, api_url: String, min_interval: Duration) -> Self {
        Self {
            client,
            api_url,
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Space verification calls out so bursts of uploads do not trip the
    /// Store API rate limit.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Check the `X-My-ID` / `X-Access-Token` pair for a store.
    pub async fn verify(
        &self,
        store_id: u64,
        my_id: &str,
        access_token: &str,
    ) -> Result<(), AppError> {
        self.pace().await;

        let response = self
            .client
            .get(&self.api_url)
            .header("X-Store-ID", store_id.to_string())
            .header("X-My-ID", my_id)
            .header("X-Access-Token", access_token)
            .send()
            .await
            .map_err(|e| AppError::AuthUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(store_id, "store credentials accepted");
            Ok(())
        } else if status == reqwest::StatusCode::UNAUTHORIZED {
            Err(AppError::Unauthorized)
        } else {
            Err(AppError::AuthUpstream(format!(
                "unexpected response status {} from Store API",
                status.as_u16()
            )))
        }
    }
}
