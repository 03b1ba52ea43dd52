use crate::auth::StoreContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use picstore_core::config::STORE_ID_THRESHOLD;
use picstore_core::{keys, AppError};
use picstore_storage::{run_method, MethodError, Storage};
use serde_json::{json, Value};
use std::sync::Arc;

/// Prefix `Key`/`Prefix` params with the tenant directory unless the caller
/// already targets one.
fn scope_params(params: &mut Value, store_id: u64) {
    if store_id <= STORE_ID_THRESHOLD {
        return;
    }
    for field in ["Key", "Prefix"] {
        let Some(value) = params.get(field).and_then(Value::as_str) else {
            continue;
        };
        if !value.is_empty() && keys::needs_store_prefix(value) {
            let scoped = format!("{store_id}/{value}");
            params[field] = json!(scoped);
        }
    }
}

/// Run a raw S3 object method against the replicated Spaces.
#[utoipa::path(
    post,
    path = "/{store}/v1/s3/{method}.json",
    tag = "s3",
    params(
        ("store" = u64, Path, description = "Store ID"),
        ("method" = String, Path, description = "S3 object method, e.g. putObject")
    ),
    request_body(content = inline(Object), content_type = "application/json"),
    responses(
        (status = 200, description = "Method result, S3 response shape", body = Object),
        (status = 400, description = "Invalid body or backend error", body = ErrorResponse),
        (status = 403, description = "Non-object method", body = ErrorResponse),
        (status = 404, description = "Unknown method", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(store_id = ctx.store_id, method = %method))]
pub async fn run(
    State(state): State<Arc<AppState>>,
    ctx: StoreContext,
    Path((_store, method)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, HttpAppError> {
    // The route captures the whole `{method}.json` segment.
    let Some(method) = method.strip_suffix(".json").map(str::to_string) else {
        return Err(AppError::MethodNotFound(method).into());
    };
    let mut params = match payload {
        Ok(Json(value)) if value.is_object() => value,
        Ok(Json(Value::Null)) => json!({}),
        Ok(_) => return Err(AppError::InvalidBody.into()),
        // No body at all is fine; garbage is not.
        Err(JsonRejection::MissingJsonContentType(_)) => json!({}),
        Err(_) => return Err(AppError::InvalidBody.into()),
    };
    scope_params(&mut params, ctx.store_id);

    let result = run_method(state.storage.as_ref() as &dyn Storage, &method, &params).await;
    match result {
        Ok(data) => Ok(Json(data)),
        Err(MethodError::Forbidden(_)) => Err(AppError::MethodForbidden.into()),
        Err(MethodError::NotFound(name)) => Err(AppError::MethodNotFound(name).into()),
        Err(error) => Err(AppError::S3Method(error.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_get_tenant_scoped() {
        let mut params = json!({ "Key": "@v4/a.png", "Prefix": "imgs/" });
        scope_params(&mut params, 123);
        assert_eq!(params["Key"], "123/@v4/a.png");
        assert_eq!(params["Prefix"], "123/imgs/");
    }

    #[test]
    fn already_scoped_params_are_untouched() {
        let mut params = json!({ "Key": "456/@v4/a.png" });
        scope_params(&mut params, 123);
        assert_eq!(params["Key"], "456/@v4/a.png");
    }

    #[test]
    fn reserved_store_ids_skip_scoping() {
        let mut params = json!({ "Key": "@v4/a.png" });
        scope_params(&mut params, 100);
        assert_eq!(params["Key"], "@v4/a.png");
    }
}
