use crate::auth::StoreContext;
use crate::error::ErrorResponse;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// Public endpoint listing, no auth.
pub async fn service_root(State(state): State<Arc<AppState>>) -> Json<Value> {
    let base = &state.config.base_uri;
    Json(json!({
        "endpoints": {
            "upload": format!("/{{store}}{base}upload.json"),
            "s3": format!("/{{store}}{base}s3/{{method}}.json"),
            "callback": "/callback/kraken.json",
        },
        "verbs": ["POST"],
    }))
}

/// Bucket and base URL for the authenticated store.
#[utoipa::path(
    get,
    path = "/{store}/v1/",
    tag = "info",
    params(("store" = u64, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Primary bucket and public base URL", body = Object),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Invalid store or missing credentials", body = ErrorResponse)
    )
)]
pub async fn store_info(
    State(state): State<Arc<AppState>>,
    ctx: StoreContext,
) -> Json<Value> {
    let config = &state.config;
    let bucket = config.bucket_for(config.primary_datacenter());
    let host = config.public_host();
    Json(json!({
        "bucket": bucket,
        "host": host,
        "baseUrl": format!("https://{}/{}/", host, ctx.store_id),
    }))
}
