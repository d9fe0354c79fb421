#![allow(missing_docs)]

use apim_config::{ApimConfig, LogFormat};
use apim_core::{default_registry, ProviderConfig, WorkerPool};
use apim_server::auth::{AuthState, JwtConfig};
use apim_server::state::AppState;
use apim_server::{build_app, metrics};
use axum::{routing::get, Router};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// APIM Server - admin, publisher and service catalog REST API.
#[derive(Parser)]
#[command(name = "apim-server")]
#[command(about = "API management control-plane server")]
struct Args {
    /// Path to configuration file
    #[arg(short = 'c', long = "config", env = "APIM_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => apim_config::load_from_file(path).map_err(|e| {
            eprintln!("Error: Failed to load config from {path}: {e}");
            e
        })?,
        None => apim_config::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {e}, using defaults");
            ApimConfig::default()
        }),
    };

    init_logging(&config);

    let registry = default_registry();
    let provider_config = ProviderConfig {
        options: config.provider.options.clone(),
    };
    let providers = registry.create(&config.provider.kind, provider_config).map_err(|e| {
        tracing::error!(provider = %config.provider.kind, available = ?registry.list(), error = %e, "Failed to create provider");
        e
    })?;
    tracing::info!(provider = %config.provider.kind, "Business provider ready");

    let pool = Arc::new(WorkerPool::new(
        "usage-publish",
        config.worker.size,
        config.worker.queue_capacity,
    ));
    let catalog_root = config.catalog.import_root_path();
    if let Some(root) = &catalog_root {
        tracing::info!(root = %root.display(), "Service catalog hashing enabled");
    }
    let state = Arc::new(
        AppState::new(providers, pool.clone(), config.monetization.publish_time_gap_days)
            .with_catalog_root(catalog_root),
    );

    let auth_state = if config.server.auth.enabled {
        let mut jwt = JwtConfig::new(config.server.auth.jwt_secret.clone());
        if !config.server.auth.issuer.is_empty() {
            jwt = jwt.with_issuer(config.server.auth.issuer.clone());
        }
        if !config.server.auth.audience.is_empty() {
            jwt = jwt.with_audience(config.server.auth.audience.clone());
        }
        AuthState::new(true, jwt)
    } else {
        tracing::warn!("Authentication disabled, every request runs as admin of the default tenant");
        AuthState::disabled()
    };

    let mut app = build_app(state, auth_state, config.server.max_body_size());
    if let Some(secs) = config.server.request_timeout_secs {
        app = app.layer(TimeoutLayer::new(Duration::from_secs(secs)));
    }
    if config.server.metrics.enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                app = app.merge(
                    Router::new()
                        .route(&config.server.metrics.path, get(metrics::metrics_handler))
                        .with_state(handle),
                );
            }
            Err(e) => tracing::warn!(error = %e, "Metrics exporter unavailable"),
        }
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("APIM Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let timeout = config.server.shutdown_timeout();
    if tokio::time::timeout(timeout, pool.shutdown()).await.is_err() {
        tracing::warn!(timeout_secs = timeout.as_secs(), "Background jobs did not finish before shutdown timeout");
    }
    tracing::info!("APIM Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}

fn init_logging(config: &ApimConfig) {
    let filter = if config.logging.filter.is_empty() {
        config.logging.level.as_str().to_string()
    } else {
        config.logging.filter.clone()
    };

    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));
    match config.logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}
