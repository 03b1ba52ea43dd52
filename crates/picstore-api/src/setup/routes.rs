use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{HeaderValue, Method};
use picstore_core::Config;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub fn build_router(state: Arc<AppState>) -> Router {
    let base = state.config.base_uri.clone();
    let store_base = format!("/{{store}}{base}");
    let upload_path = format!("{store_base}upload.json");
    // Captures `putObject.json` as one segment; the handler strips the suffix.
    let s3_path = format!("{store_base}s3/{{method}}");

    // Multipart framing overhead on top of the file size limit.
    let body_limit = state.config.max_upload_size_bytes + 64 * 1024;

    Router::new()
        .route("/", get(handlers::info::service_root))
        .route("/openapi.json", get(openapi_spec))
        .route(&store_base, get(handlers::info::store_info))
        .route(&upload_path, post(handlers::upload::upload))
        .route(&s3_path, post(handlers::s3_method::run))
        .route(
            "/callback/kraken.json",
            post(handlers::callback::kraken_callback),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::api_doc::ApiDoc::openapi())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if config.cors_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
