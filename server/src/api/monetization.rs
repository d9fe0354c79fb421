use apim_core::PublishOutcome;
use apim_sdk::ROLE_ADMIN;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use std::sync::Arc;

use super::error::{AppError, AppResult};
use super::models::{PublishStatusDto, UsagePublishInfoDto};
use crate::auth::RequestContext;
use crate::state::AppState;

const TRIGGER_FAILED: &str = "Could not add or derive monetization usage publish info";
const STATUS_FAILED: &str = "Could not derive monetization usage publish info";

fn require_admin(ctx: &RequestContext) -> AppResult<()> {
    if ctx.has_role(ROLE_ADMIN) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "User is not authorized to publish monetization usage".to_string(),
        ))
    }
}

/// `POST /monetization/publish-usage`
pub async fn publish_usage(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Response> {
    require_admin(&ctx)?;

    match state.publish.start_publish().await {
        Ok(PublishOutcome::Accepted(_job)) => {
            counter!("apim_usage_publish_triggers_total", "outcome" => "accepted").increment(1);
            tracing::info!(user = %ctx.user_id, "Monetization usage publish job accepted");
            let body = PublishStatusDto::new("Request Accepted", "Server is running the usage publisher");
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
        Ok(PublishOutcome::AlreadyRunning(_)) => {
            counter!("apim_usage_publish_triggers_total", "outcome" => "running").increment(1);
            let body = PublishStatusDto::new("Server could not accept the request", "A job is already running");
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
        Err(e) => {
            counter!("apim_usage_publish_triggers_total", "outcome" => "error").increment(1);
            tracing::error!(error = %e, "{}", TRIGGER_FAILED);
            Err(AppError::Internal(TRIGGER_FAILED.to_string()))
        }
    }
}

/// `GET /monetization/publish-usage/status`
pub async fn publish_usage_status(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<UsagePublishInfoDto>> {
    require_admin(&ctx)?;

    match state.publish.status().await {
        Ok(Some(info)) => Ok(Json(info.into())),
        Ok(None) => Err(AppError::NotFound(
            "Monetization usage publish info not found".to_string(),
        )),
        Err(e) => {
            tracing::error!(error = %e, "{}", STATUS_FAILED);
            Err(AppError::Internal(STATUS_FAILED.to_string()))
        }
    }
}
