use apim_core::catalog;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use super::error::{AppError, AppResult};
use super::models::{ServiceHashRequest, ServiceHashesResponse};
use crate::state::AppState;

/// `POST /services/hashes`
pub async fn service_hashes(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ServiceHashRequest>, JsonRejection>,
) -> AppResult<Json<ServiceHashesResponse>> {
    let Some(root) = state.catalog_root.clone() else {
        return Err(AppError::NotFound(
            "Service catalog import root is not configured".to_string(),
        ));
    };
    let Ok(Json(request)) = body else {
        return Err(AppError::BadRequest("Bundle name is required".to_string()));
    };

    let bundle = request.bundle.clone();
    let hashes = tokio::task::spawn_blocking(move || catalog::hash_bundle(&root, &bundle))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Service hash task failed");
            AppError::Internal(format!("Failed to generate MD5 Hash due to {e}"))
        })??;

    Ok(Json(ServiceHashesResponse {
        bundle: request.bundle,
        count: hashes.len(),
        hashes: hashes.into(),
    }))
}
