use apim_sdk::{ApimError, DeploymentPlan};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::error::{AppError, AppResult};
use super::models::{
    GatewayPolicyDeploymentDto, GatewayPolicyMappingDataListDto, GatewayPolicyMappingsDto,
    PaginationQuery,
};
use crate::auth::RequestContext;
use crate::state::AppState;

const LIST_BASE: &str = "/gateway-policies";

const EMPTY_MAPPING: &str = "Gateway policy mapping list is empty";
const EMPTY_DEPLOYMENT: &str = "Gateway policy deployment list is empty";
const EMPTY_MAPPING_ID: &str = "Gateway policy mapping ID is empty";

const UNAUTHORIZED_APPLY: &str = "User is not authorized to apply policies";
const UNAUTHORIZED_DELETE: &str = "User is not authorized to delete policy mapping";
const UNAUTHORIZED_LIST: &str = "User is not authorized to retrieve policy mappings";
const UNAUTHORIZED_GET: &str = "User is not authorized to retrieve policy mapping";

/// `POST /gateway-policies`
pub async fn add_gateway_policies(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<GatewayPolicyMappingsDto>, JsonRejection>,
) -> AppResult<Json<GatewayPolicyMappingsDto>> {
    let Ok(Json(mut dto)) = body else {
        return Err(AppError::BadRequest(EMPTY_MAPPING.to_string()));
    };
    if !dto.has_policies() {
        return Err(AppError::BadRequest(EMPTY_MAPPING.to_string()));
    }

    let id = state
        .providers
        .policies
        .apply_gateway_global_policies(
            &ctx.caller(),
            dto.policies(),
            dto.description.clone(),
            dto.display_name.clone(),
        )
        .await
        .map_err(|e| {
            AppError::from_provider(e, UNAUTHORIZED_APPLY, "Error while adding gateway policy mapping")
        })?;

    tracing::info!(tenant = %ctx.tenant, id = %id, "Added gateway policy mapping");
    dto.id = Some(id);
    Ok(Json(dto))
}

/// `PUT /gateway-policies/{id}`
pub async fn update_gateway_policies(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(mapping_id): Path<String>,
    body: Result<Json<GatewayPolicyMappingsDto>, JsonRejection>,
) -> AppResult<Json<GatewayPolicyMappingsDto>> {
    let Ok(Json(mut dto)) = body else {
        return Err(AppError::BadRequest(EMPTY_MAPPING.to_string()));
    };
    if !dto.has_policies() {
        return Err(AppError::BadRequest(EMPTY_MAPPING.to_string()));
    }

    let id = state
        .providers
        .policies
        .update_gateway_global_policies(
            &ctx.caller(),
            &mapping_id,
            dto.policies(),
            dto.description.clone(),
            dto.display_name.clone(),
        )
        .await
        .map_err(|e| AppError::from_provider(e, UNAUTHORIZED_APPLY, "Error while applying gateway policy"))?;

    tracing::info!(tenant = %ctx.tenant, id = %id, "Updated gateway policy mapping");
    dto.id = Some(id);
    Ok(Json(dto))
}

/// `DELETE /gateway-policies/{id}`
pub async fn delete_gateway_policy(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(mapping_id): Path<String>,
) -> AppResult<StatusCode> {
    if mapping_id.trim().is_empty() {
        return Err(AppError::BadRequest(EMPTY_MAPPING_ID.to_string()));
    }

    let caller = ctx.caller();
    let to_error = |e: ApimError| {
        AppError::from_provider(e, UNAUTHORIZED_DELETE, "Error while deleting the gateway policy mapping")
    };

    let policies = state
        .providers
        .policies
        .get_gateway_policies_by_mapping_id(&caller, &mapping_id)
        .await
        .map_err(to_error)?;
    if policies.is_empty() {
        return Err(AppError::NotFound(format!(
            "Gateway policy mapping not found for the given Mapping ID : {mapping_id}"
        )));
    }

    state
        .providers
        .policies
        .delete_gateway_policy_mapping(&caller, &mapping_id)
        .await
        .map_err(to_error)?;

    tracing::info!(tenant = %ctx.tenant, id = %mapping_id, "Deleted gateway policy mapping");
    Ok(StatusCode::OK)
}

/// `GET /gateway-policies?limit&offset`
pub async fn list_gateway_policies(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> AppResult<Json<GatewayPolicyMappingDataListDto>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mappings = state
        .providers
        .policies
        .get_all_gateway_policy_mappings(&ctx.caller())
        .await
        .map_err(|e| {
            AppError::from_provider(e, UNAUTHORIZED_LIST, "Error while retrieving the gateway policy mappings")
        })?;

    Ok(Json(GatewayPolicyMappingDataListDto::page(
        LIST_BASE,
        mappings,
        query.offset.unwrap_or(0),
        query.limit,
    )))
}

/// `GET /gateway-policies/{id}`
pub async fn get_gateway_policy(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(mapping_id): Path<String>,
) -> AppResult<Json<GatewayPolicyMappingsDto>> {
    let data = state
        .providers
        .policies
        .get_gateway_policy_mapping(&ctx.caller(), &mapping_id)
        .await
        .map_err(|e| {
            AppError::from_provider(e, UNAUTHORIZED_GET, "Error while retrieving the gateway policy mapping")
        })?;

    Ok(Json(data.into()))
}

/// `POST /gateway-policies/{id}/deploy`
pub async fn deploy_gateway_policy(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(mapping_id): Path<String>,
    body: Result<Json<Vec<GatewayPolicyDeploymentDto>>, JsonRejection>,
) -> AppResult<Json<Vec<GatewayPolicyDeploymentDto>>> {
    let Ok(Json(mut deployments)) = body else {
        return Err(AppError::BadRequest(EMPTY_DEPLOYMENT.to_string()));
    };

    let plan: DeploymentPlan = deployments
        .iter()
        .map(|d| d.to_deployment(&mapping_id))
        .collect();

    state
        .providers
        .policies
        .engage_gateway_global_policies(&ctx.caller(), &mapping_id, plan)
        .await
        .map_err(|e| AppError::from_provider(e, UNAUTHORIZED_APPLY, "Error while deploying gateway policy"))?;

    for deployment in &mut deployments {
        deployment.mapping_uuid = Some(mapping_id.clone());
    }
    tracing::info!(
        tenant = %ctx.tenant,
        id = %mapping_id,
        gateways = deployments.len(),
        "Engaged gateway policy mapping"
    );
    Ok(Json(deployments))
}
