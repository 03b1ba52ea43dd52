use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Store the job was started for, carried through the callback URL.
    pub store: u64,
}

/// Kraken webhook body. Only the fields the pipeline needs are read.
#[derive(Debug, Deserialize, ToSchema)]
pub struct KrakenCallback {
    pub id: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub kraked_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Async transform completion webhook.
///
/// Always answers 200: the provider must not retry, and the uploader
/// already got its response. Unknown or expired job ids are dropped.
#[utoipa::path(
    post,
    path = "/callback/kraken.json",
    tag = "callback",
    params(("store" = u64, Query, description = "Store ID the job belongs to")),
    responses((status = 200, description = "Callback accepted", body = Object))
)]
#[tracing::instrument(skip(state, body), fields(store_id = query.store, transform_id = %body.id))]
pub async fn kraken_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    Json(body): Json<KrakenCallback>,
) -> Json<Value> {
    if !body.success {
        tracing::debug!(message = ?body.message, "provider reported failure");
    }
    state
        .callbacks
        .handle(
            query.store,
            &body.id,
            body.success,
            body.kraked_url.as_deref(),
        )
        .await;
    Json(json!({}))
}
