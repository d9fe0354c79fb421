#![allow(missing_docs)]

pub mod api;
pub mod auth;
pub mod metrics;
pub mod state;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use auth::AuthState;
use state::AppState;

/// The API router with authentication, request metrics, body limit and access logging.
pub fn build_app(state: Arc<AppState>, auth: AuthState, max_body_size: usize) -> Router {
    api::create_router(state)
        .layer(middleware::from_fn_with_state(auth, auth::auth_middleware))
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body_size)),
        )
}
