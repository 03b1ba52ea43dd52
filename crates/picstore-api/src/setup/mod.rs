//! Application wiring: storage clients, services, routes, server.

pub mod routes;
pub mod server;
mod services;
mod storage;

use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use picstore_core::Config;
use std::sync::Arc;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    config.validate()?;
    let config = Arc::new(config);

    let replicated = storage::build_storage(&config)?;
    let (orchestrator, callbacks, auth) = services::build_services(&config, Arc::clone(&replicated));

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        storage: replicated,
        orchestrator: Arc::new(orchestrator),
        callbacks,
        auth,
    });
    let router = routes::build_router(Arc::clone(&state));
    Ok((state, router))
}
