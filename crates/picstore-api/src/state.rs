//! Shared application state.

use crate::auth::StoreAuth;
use picstore_core::Config;
use picstore_pipeline::{CallbackService, Orchestrator};
use picstore_storage::ReplicatedStorage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<ReplicatedStorage>,
    pub orchestrator: Arc<Orchestrator>,
    pub callbacks: CallbackService,
    pub auth: Arc<StoreAuth>,
}
