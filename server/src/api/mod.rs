pub mod catalog;
pub mod error;
pub mod gateway_policy;
pub mod global_policy;
pub mod models;
pub mod monetization;

use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::state::AppState;
use models::HealthResponse;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/am/admin/v4/monetization/publish-usage",
            post(monetization::publish_usage),
        )
        .route(
            "/api/am/admin/v4/monetization/publish-usage/status",
            get(monetization::publish_usage_status),
        )
        .route(
            "/api/am/publisher/v4/gateway-policies",
            post(gateway_policy::add_gateway_policies).get(gateway_policy::list_gateway_policies),
        )
        .route(
            "/api/am/publisher/v4/gateway-policies/{id}",
            get(gateway_policy::get_gateway_policy)
                .put(gateway_policy::update_gateway_policies)
                .delete(gateway_policy::delete_gateway_policy),
        )
        .route(
            "/api/am/publisher/v4/gateway-policies/{id}/deploy",
            post(gateway_policy::deploy_gateway_policy),
        )
        .route(
            "/api/am/publisher/v4/global-policies",
            post(global_policy::apply_global_policies),
        )
        .route(
            "/api/am/service-catalog/v1/services/hashes",
            post(catalog::service_hashes),
        )
        .with_state(state)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
