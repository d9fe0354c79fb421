use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

use crate::auth::RequestContext;

const MAPPING_ROUTE: &str = "/api/am/publisher/v4/gateway-policies/";

/// Install the process-wide Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path_label = normalize_path(request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    // Set by the auth layer; absent when the request was rejected there.
    let tenant = response
        .extensions()
        .get::<RequestContext>()
        .map_or_else(|| "unknown".to_string(), |ctx| ctx.tenant.clone());

    let labels = [
        ("method", method.to_string()),
        ("path", path_label),
        ("status", status),
        ("tenant", tenant),
    ];

    counter!("apim_http_requests_total", &labels).increment(1);
    histogram!("apim_http_request_duration_seconds", &labels[..3]).record(duration);

    response
}

/// Collapse mapping ids so each route is one label value.
fn normalize_path(path: &str) -> String {
    match path.strip_prefix(MAPPING_ROUTE) {
        Some(rest) if !rest.is_empty() => match rest.split_once('/') {
            Some((_, tail)) => format!("{MAPPING_ROUTE}{{id}}/{tail}"),
            None => format!("{MAPPING_ROUTE}{{id}}"),
        },
        _ => path.to_string(),
    }
}

pub async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}
