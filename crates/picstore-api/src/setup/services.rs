use crate::auth::StoreAuth;
use picstore_core::config::ProviderKind;
use picstore_core::Config;
use picstore_pipeline::{
    CallbackService, Orchestrator, OrchestratorSettings, PendingStore,
};
use picstore_storage::{ReplicatedStorage, Storage};
use picstore_transform::{CloudflareProvider, KrakenProvider, TransformProvider};
use std::sync::Arc;
use std::time::Duration;

pub fn build_services(
    config: &Arc<Config>,
    storage: Arc<ReplicatedStorage>,
) -> (Orchestrator, CallbackService, Arc<StoreAuth>) {
    let client = reqwest::Client::new();

    let provider = build_provider(config, &client);
    if provider.is_none() {
        tracing::warn!("no transform provider credentials, uploads will be zoom-only");
    }

    let pending = PendingStore::new(Duration::from_secs(config.pending_ttl_secs));
    let orchestrator = Orchestrator::new(
        Arc::clone(&storage) as Arc<dyn Storage>,
        provider,
        pending.clone(),
        OrchestratorSettings {
            public_host: config.public_host(),
            picture_sizes: config.picture_sizes.clone(),
            strategy: config.transform_strategy,
            transform_timeout: Duration::from_secs(config.transform_timeout_secs),
            variant_retry_delay: Duration::from_millis(config.variant_retry_delay_ms),
        },
    );
    let callbacks = CallbackService::new(storage as Arc<dyn Storage>, pending);
    let auth = Arc::new(StoreAuth::new(
        client,
        config.store_api_url.clone(),
        Duration::from_millis(config.auth_pace_ms),
    ));

    (orchestrator, callbacks, auth)
}

fn build_provider(
    config: &Config,
    client: &reqwest::Client,
) -> Option<Arc<dyn TransformProvider>> {
    match config.provider {
        ProviderKind::Cloudflare => {
            let account_id = config.cloudflare_account_id.clone()?;
            let api_key = config.cloudflare_api_key.clone()?;
            Some(Arc::new(CloudflareProvider::new(
                client.clone(),
                account_id,
                api_key,
            )))
        }
        ProviderKind::Kraken => {
            let api_key = config.kraken_api_key.clone()?;
            let api_secret = config.kraken_api_secret.clone()?;
            Some(Arc::new(KrakenProvider::new(
                client.clone(),
                api_key,
                api_secret,
                config.public_host(),
                config.callback_base_url.clone(),
            )))
        }
    }
}
