//! Authenticated store context extractor.
//!
//! Every store-scoped route extracts `StoreContext`: the `{store}` path
//! parameter must be a numeric store id above the reserved range, and the
//! credential headers must pass Store API verification.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::RequestPartsExt;
use picstore_core::config::STORE_ID_THRESHOLD;
use picstore_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct StoreContext {
    pub store_id: u64,
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<Arc<AppState>> for StoreContext {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = parts
            .extract::<Path<HashMap<String, String>>>()
            .await
            .map_err(|_| HttpAppError(AppError::InvalidStore))?;
        let store_id = params
            .get("store")
            .and_then(|value| value.parse::<u64>().ok())
            .ok_or(HttpAppError(AppError::InvalidStore))?;
        if store_id < STORE_ID_THRESHOLD {
            return Err(HttpAppError(AppError::InvalidStore));
        }

        let my_id = header_value(parts, "x-my-id");
        let access_token = header_value(parts, "x-access-token");
        let (Some(my_id), Some(access_token)) = (my_id, access_token) else {
            return Err(HttpAppError(AppError::MissingCredentials));
        };

        state.auth.verify(store_id, &my_id, &access_token).await?;
        Ok(StoreContext { store_id })
    }
}
