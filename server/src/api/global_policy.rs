use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{AppError, AppResult};
use super::models::PolicyFlowsDto;
use crate::auth::RequestContext;
use crate::state::AppState;

const EMPTY_GLOBAL_POLICIES: &str = "Global policy list is empty";

/// `POST /global-policies`
///
/// Applies each named entry as its own policy mapping, using the name as the
/// display name. Responds with the created mapping id per name.
pub async fn apply_global_policies(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<BTreeMap<String, PolicyFlowsDto>>, JsonRejection>,
) -> AppResult<Json<BTreeMap<String, String>>> {
    let Ok(Json(entries)) = body else {
        return Err(AppError::BadRequest(EMPTY_GLOBAL_POLICIES.to_string()));
    };
    if entries.is_empty() || entries.values().any(PolicyFlowsDto::is_empty) {
        return Err(AppError::BadRequest(EMPTY_GLOBAL_POLICIES.to_string()));
    }

    let caller = ctx.caller();
    let mut created = BTreeMap::new();
    for (name, flows) in entries {
        let id = state
            .providers
            .policies
            .apply_gateway_global_policies(&caller, flows.into_policies(), None, Some(name.clone()))
            .await
            .map_err(|e| {
                AppError::from_provider(
                    e,
                    "User is not authorized to apply policies",
                    "Error while applying global policies",
                )
            })?;
        tracing::info!(tenant = %ctx.tenant, name = %name, id = %id, "Applied global policy");
        created.insert(name, id);
    }

    Ok(Json(created))
}
