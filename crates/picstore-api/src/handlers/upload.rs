use crate::auth::StoreContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use picstore_core::AppError;
use picstore_pipeline::{UploadOutcome, UploadRequest};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Optional folder prepended to the generated object key.
    pub directory: Option<String>,
}

/// Upload an image and produce its size variants.
///
/// The original is always stored; the response aggregates whichever
/// variants resolved in time under `picture`, keyed by size label.
#[utoipa::path(
    post,
    path = "/{store}/v1/upload.json",
    tag = "upload",
    params(
        ("store" = u64, Path, description = "Store ID"),
        ("directory" = Option<String>, Query, description = "Folder for the object key")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload stored, picture map aggregated", body = Object),
        (status = 400, description = "Invalid file or CDN write failure", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Invalid store or missing credentials", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(store_id = ctx.store_id))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    ctx: StoreContext,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, HttpAppError> {
    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => return Err(AppError::UploadRejected(error.to_string()).into()),
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("file").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|error| AppError::UploadRejected(error.to_string()))?;
        file = Some((filename, content_type, data));
        break;
    }
    let Some((filename, content_type, data)) = file else {
        return Err(AppError::UploadRejected("missing `file` field".to_string()).into());
    };
    if data.is_empty() {
        return Err(AppError::UploadRejected("empty file".to_string()).into());
    }
    if data.len() > state.config.max_upload_size_bytes {
        return Err(AppError::UploadRejected(format!(
            "file of {} bytes exceeds the {} byte limit",
            data.len(),
            state.config.max_upload_size_bytes
        ))
        .into());
    }

    let outcome = state
        .orchestrator
        .upload(UploadRequest {
            store_id: ctx.store_id,
            directory: query.directory,
            filename,
            content_type,
            data,
        })
        .await
        .map_err(|error| AppError::CdnWrite(error.to_string()))?;

    Ok(Json(outcome))
}
