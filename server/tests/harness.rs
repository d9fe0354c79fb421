//! Test harness for in-process server testing.
//!
//! Starts the APIM server in the same process with a random port,
//! allowing fast, reliable integration tests without external processes.

#![allow(dead_code)]

use apim_core::{Providers, WorkerPool};
use apim_server::auth::{AuthState, JwtConfig};
use apim_server::build_app;
use apim_server::state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const PUBLISHER_API: &str = "/api/am/publisher/v4";
pub const ADMIN_API: &str = "/api/am/admin/v4";
pub const CATALOG_API: &str = "/api/am/service-catalog/v1";

/// Knobs for a test server; defaults to in-memory providers without auth.
pub struct TestOptions {
    pub providers: Providers,
    pub jwt_secret: Option<String>,
    pub catalog_root: Option<PathBuf>,
    pub publish_gap_days: Option<u32>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            providers: Providers::in_memory(),
            jwt_secret: None,
            catalog_root: None,
            publish_gap_days: None,
        }
    }
}

/// A test server instance running in the background.
pub struct TestServer {
    pub url: String,
    pub addr: SocketAddr,
    pub jwt_secret: Option<String>,
    client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server with in-memory providers and auth disabled.
    pub async fn start() -> Self {
        Self::start_with(TestOptions::default()).await
    }

    /// Start a server with auth enabled.
    pub async fn start_with_auth(jwt_secret: &str) -> Self {
        Self::start_with(TestOptions {
            jwt_secret: Some(jwt_secret.to_string()),
            ..TestOptions::default()
        })
        .await
    }

    /// Start a server with custom providers and auth disabled.
    pub async fn start_with_providers(providers: Providers) -> Self {
        Self::start_with(TestOptions {
            providers,
            ..TestOptions::default()
        })
        .await
    }

    pub async fn start_with(options: TestOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{}", addr);

        let pool = Arc::new(WorkerPool::new("test-publish", 1, 4));
        let state = Arc::new(
            AppState::new(options.providers, pool, options.publish_gap_days)
                .with_catalog_root(options.catalog_root),
        );

        let auth = match &options.jwt_secret {
            Some(secret) => AuthState::new(true, JwtConfig::new(secret.clone())),
            None => AuthState::disabled(),
        };
        let app = build_app(state, auth, 2 * 1024 * 1024);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self::wait_ready(&url).await;

        Self {
            url,
            addr,
            jwt_secret: options.jwt_secret,
            client: reqwest::Client::new(),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn publisher(&self, path: &str) -> String {
        format!("{}{}{}", self.url, PUBLISHER_API, path)
    }

    pub fn admin(&self, path: &str) -> String {
        format!("{}{}{}", self.url, ADMIN_API, path)
    }

    pub fn catalog(&self, path: &str) -> String {
        format!("{}{}{}", self.url, CATALOG_API, path)
    }

    /// Generate a JWT token for a given tenant and subject.
    pub fn token(&self, subject: &str, tenant: &str, roles: &[&str]) -> String {
        let secret = self
            .jwt_secret
            .as_ref()
            .expect("Server was not started with auth enabled");

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = serde_json::json!({
            "sub": subject,
            "tenant": tenant,
            "roles": roles,
            "exp": now + 3600,
            "iat": now,
        });

        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    async fn wait_ready(url: &str) {
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(format!("{}/health", url)).send().await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Server failed to start within 500ms");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A minimal valid mapping body.
pub fn mapping_body(display_name: &str) -> serde_json::Value {
    serde_json::json!({
        "displayName": display_name,
        "description": format!("{display_name} policies"),
        "policyMapping": {
            "request": [
                {"policyName": "addHeader", "policyVersion": "v1", "parameters": {"headerName": "x-env"}}
            ],
            "response": [
                {"policyName": "removeHeader", "policyVersion": "v1"}
            ]
        }
    })
}
