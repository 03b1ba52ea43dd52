//! OpenAPI documentation, served at `/openapi.json`.

use crate::error;
use crate::handlers;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Picstore Storage API",
        version = "0.1.0",
        description = "Multi-tenant image upload gateway: stores originals in replicated \
            S3-compatible Spaces, derives webp/avif size variants through an external \
            optimization provider, and exposes a constrained S3 object-method passthrough. \
            Store-scoped endpoints authenticate with X-My-ID / X-Access-Token headers."
    ),
    paths(
        handlers::info::store_info,
        handlers::upload::upload,
        handlers::s3_method::run,
        handlers::callback::kraken_callback,
    ),
    components(schemas(error::ErrorResponse, picstore_core::UserMessage)),
    tags(
        (name = "info", description = "Store and service discovery"),
        (name = "upload", description = "Image upload and variant derivation"),
        (name = "s3", description = "Raw S3 object-method passthrough"),
        (name = "callback", description = "Async provider webhooks")
    )
)]
pub struct ApiDoc;
