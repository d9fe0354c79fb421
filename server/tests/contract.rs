//! Contract tests for the APIM HTTP API.
//!
//! These tests drive a real server over HTTP with in-memory providers and
//! verify status codes, bodies and provider interactions per endpoint.

mod harness;

use apim_core::{catalog::ServiceHashes, MemoryGatewayPolicies, Providers};
use apim_sdk::{
    ApimError, ApimResult, Caller, DeploymentPlan, GatewayPolicyData, GatewayPolicyProvider,
    OperationPolicy, UsagePublisher,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use harness::{mapping_body, TestOptions, TestServer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn create_mapping(server: &TestServer, name: &str) -> String {
    let resp = server
        .client()
        .post(server.publisher("/gateway-policies"))
        .json(&mapping_body(name))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn deploy(server: &TestServer, id: &str, label: &str, on: bool) -> reqwest::Response {
    server
        .client()
        .post(server.publisher(&format!("/gateway-policies/{id}/deploy")))
        .json(&json!([{"gatewayLabel": label, "gatewayDeployment": on}]))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn contract_health() {
    let server = TestServer::start().await;
    let resp = server.client().get(format!("{}/health", server.url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

// ============================================================================
// Gateway policy mappings
// ============================================================================

#[tokio::test]
async fn contract_mapping_lifecycle() {
    let server = TestServer::start().await;
    let id = create_mapping(&server, "edge").await;

    // Content echoes what was applied.
    let resp = server
        .client()
        .get(server.publisher(&format!("/gateway-policies/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let content: Value = resp.json().await.unwrap();
    assert_eq!(content["id"], id);
    assert_eq!(content["displayName"], "edge");
    assert_eq!(content["policyMapping"]["request"][0]["policyName"], "addHeader");
    assert_eq!(content["policyMapping"]["request"][0]["parameters"]["headerName"], "x-env");
    assert_eq!(content["policyMapping"]["response"][0]["policyName"], "removeHeader");

    // Update replaces the policies and keeps the id.
    let resp = server
        .client()
        .put(server.publisher(&format!("/gateway-policies/{id}")))
        .json(&json!({
            "displayName": "edge-v2",
            "policyMapping": {"fault": [{"policyName": "jsonFault"}]}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["id"], id);

    let content: Value = server
        .client()
        .get(server.publisher(&format!("/gateway-policies/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(content["displayName"], "edge-v2");
    assert_eq!(content["policyMapping"]["request"], json!([]));
    assert_eq!(content["policyMapping"]["fault"][0]["policyVersion"], "v1");

    // Delete, then it is gone.
    let resp = server
        .client()
        .delete(server.publisher(&format!("/gateway-policies/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = server
        .client()
        .get(server.publisher(&format!("/gateway-policies/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn contract_missing_or_empty_mapping_rejected() {
    let server = TestServer::start().await;

    for body in [None, Some(json!({"displayName": "x"})), Some(json!({"policyMapping": {}}))] {
        let mut req = server.client().post(server.publisher("/gateway-policies"));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        assert_eq!(resp.status(), 400);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["error"], "Gateway policy mapping list is empty");
        assert_eq!(err["code"], 400);
    }
}

#[tokio::test]
async fn contract_update_unknown_mapping_is_not_found() {
    let server = TestServer::start().await;
    let resp = server
        .client()
        .put(server.publisher("/gateway-policies/does-not-exist"))
        .json(&mapping_body("ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn contract_delete_unknown_mapping() {
    let server = TestServer::start().await;
    let resp = server
        .client()
        .delete(server.publisher("/gateway-policies/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(
        err["error"],
        "Gateway policy mapping not found for the given Mapping ID : nope"
    );
}

#[tokio::test]
async fn contract_delete_blank_id() {
    let server = TestServer::start().await;
    let resp = server
        .client()
        .delete(server.publisher("/gateway-policies/%20"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn contract_list_defaults_to_everything() {
    let server = TestServer::start().await;
    for i in 0..12 {
        create_mapping(&server, &format!("m{i}")).await;
    }

    let body: Value = server
        .client()
        .get(server.publisher("/gateway-policies"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 12);
    assert_eq!(body["pagination"]["limit"], 12);
    assert_eq!(body["pagination"]["total"], 12);
    assert_eq!(body["pagination"]["next"], "");
    assert_eq!(body["list"][0]["displayName"], "m0");
    assert_eq!(body["list"][0]["appliedGatewayLabels"], json!([]));
}

#[tokio::test]
async fn contract_list_pages() {
    let server = TestServer::start().await;
    for i in 0..5 {
        create_mapping(&server, &format!("m{i}")).await;
    }

    let body: Value = server
        .client()
        .get(server.publisher("/gateway-policies?limit=2&offset=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["list"][0]["displayName"], "m2");
    assert_eq!(body["list"][1]["displayName"], "m3");
    assert_eq!(body["pagination"]["next"], "/gateway-policies?limit=2&offset=4");
    assert_eq!(body["pagination"]["previous"], "/gateway-policies?limit=2&offset=0");

    let resp = server
        .client()
        .get(server.publisher("/gateway-policies?limit=-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn contract_deploy_and_undeploy() {
    let server = TestServer::start().await;
    let id = create_mapping(&server, "edge").await;

    let resp = deploy(&server, &id, "Default", true).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body[0]["mappingUUID"], id);
    assert_eq!(body[0]["gatewayLabel"], "Default");
    assert_eq!(body[0]["gatewayDeployment"], true);

    let list: Value = server
        .client()
        .get(server.publisher("/gateway-policies"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["list"][0]["appliedGatewayLabels"], json!(["Default"]));

    // A deployed mapping cannot be deleted.
    let resp = server
        .client()
        .delete(server.publisher(&format!("/gateway-policies/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Another mapping cannot take the same gateway.
    let other = create_mapping(&server, "other").await;
    assert_eq!(deploy(&server, &other, "Default", true).await.status(), 409);

    assert_eq!(deploy(&server, &id, "Default", false).await.status(), 200);
    assert_eq!(deploy(&server, &other, "Default", true).await.status(), 200);

    let resp = server
        .client()
        .delete(server.publisher(&format!("/gateway-policies/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn contract_deploy_requires_body() {
    let server = TestServer::start().await;
    let id = create_mapping(&server, "edge").await;

    let resp = server
        .client()
        .post(server.publisher(&format!("/gateway-policies/{id}/deploy")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"], "Gateway policy deployment list is empty");
}

#[tokio::test]
async fn contract_global_policies() {
    let server = TestServer::start().await;

    let resp = server
        .client()
        .post(server.publisher("/global-policies"))
        .json(&json!({
            "cors": {"request": [{"policyName": "cors"}]},
            "audit": {"response": [{"policyName": "auditLog"}], "fault": [{"policyName": "auditFault"}]}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let created: Value = resp.json().await.unwrap();
    let cors_id = created["cors"].as_str().unwrap();
    assert!(created["audit"].is_string());

    let content: Value = server
        .client()
        .get(server.publisher(&format!("/gateway-policies/{cors_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(content["displayName"], "cors");

    let resp = server
        .client()
        .post(server.publisher("/global-policies"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

/// Counts delete calls on top of the in-memory store.
struct CountingPolicies {
    inner: MemoryGatewayPolicies,
    deletes: AtomicUsize,
}

#[async_trait]
impl GatewayPolicyProvider for CountingPolicies {
    async fn apply_gateway_global_policies(
        &self,
        caller: &Caller,
        policies: Vec<OperationPolicy>,
        description: Option<String>,
        display_name: Option<String>,
    ) -> ApimResult<String> {
        self.inner
            .apply_gateway_global_policies(caller, policies, description, display_name)
            .await
    }

    async fn update_gateway_global_policies(
        &self,
        caller: &Caller,
        mapping_id: &str,
        policies: Vec<OperationPolicy>,
        description: Option<String>,
        display_name: Option<String>,
    ) -> ApimResult<String> {
        self.inner
            .update_gateway_global_policies(caller, mapping_id, policies, description, display_name)
            .await
    }

    async fn get_gateway_policies_by_mapping_id(
        &self,
        caller: &Caller,
        mapping_id: &str,
    ) -> ApimResult<Vec<OperationPolicy>> {
        self.inner.get_gateway_policies_by_mapping_id(caller, mapping_id).await
    }

    async fn delete_gateway_policy_mapping(&self, caller: &Caller, mapping_id: &str) -> ApimResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_gateway_policy_mapping(caller, mapping_id).await
    }

    async fn get_all_gateway_policy_mappings(&self, caller: &Caller) -> ApimResult<Vec<GatewayPolicyData>> {
        self.inner.get_all_gateway_policy_mappings(caller).await
    }

    async fn get_gateway_policy_mapping(&self, caller: &Caller, mapping_id: &str) -> ApimResult<GatewayPolicyData> {
        self.inner.get_gateway_policy_mapping(caller, mapping_id).await
    }

    async fn engage_gateway_global_policies(
        &self,
        caller: &Caller,
        mapping_id: &str,
        plan: DeploymentPlan,
    ) -> ApimResult<()> {
        self.inner.engage_gateway_global_policies(caller, mapping_id, plan).await
    }
}

#[tokio::test]
async fn contract_delete_calls_provider_once() {
    let policies = Arc::new(CountingPolicies {
        inner: MemoryGatewayPolicies::new(),
        deletes: AtomicUsize::new(0),
    });
    let server =
        TestServer::start_with_providers(Providers::in_memory().with_policies(policies.clone())).await;

    let resp = server
        .client()
        .delete(server.publisher("/gateway-policies/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(policies.deletes.load(Ordering::SeqCst), 0);

    let id = create_mapping(&server, "edge").await;
    let resp = server
        .client()
        .delete(server.publisher(&format!("/gateway-policies/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(policies.deletes.load(Ordering::SeqCst), 1);
}

/// Rejects every call as an authorization failure or an outage.
struct RejectingPolicies {
    error: ApimError,
}

#[async_trait]
impl GatewayPolicyProvider for RejectingPolicies {
    async fn apply_gateway_global_policies(
        &self,
        _caller: &Caller,
        _policies: Vec<OperationPolicy>,
        _description: Option<String>,
        _display_name: Option<String>,
    ) -> ApimResult<String> {
        Err(self.error.clone())
    }

    async fn update_gateway_global_policies(
        &self,
        _caller: &Caller,
        _mapping_id: &str,
        _policies: Vec<OperationPolicy>,
        _description: Option<String>,
        _display_name: Option<String>,
    ) -> ApimResult<String> {
        Err(self.error.clone())
    }

    async fn get_gateway_policies_by_mapping_id(
        &self,
        _caller: &Caller,
        _mapping_id: &str,
    ) -> ApimResult<Vec<OperationPolicy>> {
        Err(self.error.clone())
    }

    async fn delete_gateway_policy_mapping(&self, _caller: &Caller, _mapping_id: &str) -> ApimResult<()> {
        Err(self.error.clone())
    }

    async fn get_all_gateway_policy_mappings(&self, _caller: &Caller) -> ApimResult<Vec<GatewayPolicyData>> {
        Err(self.error.clone())
    }

    async fn get_gateway_policy_mapping(&self, _caller: &Caller, _mapping_id: &str) -> ApimResult<GatewayPolicyData> {
        Err(self.error.clone())
    }

    async fn engage_gateway_global_policies(
        &self,
        _caller: &Caller,
        _mapping_id: &str,
        _plan: DeploymentPlan,
    ) -> ApimResult<()> {
        Err(self.error.clone())
    }
}

#[tokio::test]
async fn contract_provider_errors_are_classified() {
    let denied = Providers::in_memory().with_policies(Arc::new(RejectingPolicies {
        error: ApimError::unauthorized("bob"),
    }));
    let server = TestServer::start_with_providers(denied).await;

    let resp = server.client().get(server.publisher("/gateway-policies")).send().await.unwrap();
    assert_eq!(resp.status(), 403);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"], "User is not authorized to retrieve policy mappings");

    let resp = server
        .client()
        .post(server.publisher("/gateway-policies"))
        .json(&mapping_body("edge"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let down = Providers::in_memory().with_policies(Arc::new(RejectingPolicies {
        error: ApimError::unavailable("store offline"),
    }));
    let server = TestServer::start_with_providers(down).await;

    let resp = server
        .client()
        .get(server.publisher("/gateway-policies/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"], "Error while retrieving the gateway policy mapping");
}

// ============================================================================
// Monetization
// ============================================================================

async fn wait_for_idle(server: &TestServer) -> Value {
    for _ in 0..100 {
        let resp = server
            .client()
            .get(server.admin("/monetization/publish-usage/status"))
            .send()
            .await
            .unwrap();
        if resp.status() == 200 {
            let body: Value = resp.json().await.unwrap();
            if body["state"] == "IDLE" {
                return body;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("usage publish job did not finish");
}

#[tokio::test]
async fn contract_publish_usage() {
    let server = TestServer::start().await;

    let resp = server
        .client()
        .get(server.admin("/monetization/publish-usage/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = server
        .client()
        .post(server.admin("/monetization/publish-usage"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "Request Accepted", "message": "Server is running the usage publisher"}));

    let status = wait_for_idle(&server).await;
    assert_eq!(status["id"], "USAGE_PUBLISHER");
    assert_eq!(status["status"], "ACCEPTED");
    assert!(status["lastPublishTime"].as_i64().unwrap() % 1000 == 0);
}

#[tokio::test]
async fn contract_publish_seeds_configured_gap() {
    let server = TestServer::start_with(TestOptions {
        publish_gap_days: Some(3),
        providers: Providers::in_memory().with_usage_publisher(Arc::new(FailingPublisher)),
        ..TestOptions::default()
    })
    .await;

    let resp = server
        .client()
        .post(server.admin("/monetization/publish-usage"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    // A failed run keeps the seeded window start.
    let status = wait_for_idle(&server).await;
    assert_eq!(status["status"], "ERROR");
    let gap = status["startedTime"].as_i64().unwrap() - status["lastPublishTime"].as_i64().unwrap();
    assert_eq!(gap, 3 * 24 * 60 * 60 * 1000);
}

struct FailingPublisher;

#[async_trait]
impl UsagePublisher for FailingPublisher {
    async fn publish_usage(&self, _from: i64, _to: i64) -> ApimResult<()> {
        Err(ApimError::unavailable("billing engine offline"))
    }
}

/// Holds every publish until a permit is released.
struct GatedPublisher {
    gate: tokio::sync::Semaphore,
}

#[async_trait]
impl UsagePublisher for GatedPublisher {
    async fn publish_usage(&self, _from: i64, _to: i64) -> ApimResult<()> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ApimError::internal(e.to_string()))?;
        Ok(())
    }
}

#[tokio::test]
async fn contract_publish_while_running() {
    let publisher = Arc::new(GatedPublisher {
        gate: tokio::sync::Semaphore::new(0),
    });
    let server =
        TestServer::start_with_providers(Providers::in_memory().with_usage_publisher(publisher.clone()))
            .await;

    let first = server
        .client()
        .post(server.admin("/monetization/publish-usage"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 202);

    let status: Value = server
        .client()
        .get(server.admin("/monetization/publish-usage/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["state"], "RUNNING");
    assert_eq!(status["status"], "INPROGRESS");

    let second = server
        .client()
        .post(server.admin("/monetization/publish-usage"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 500);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["status"], "Server could not accept the request");
    assert_eq!(body["message"], "A job is already running");

    publisher.gate.add_permits(1);
    let status = wait_for_idle(&server).await;
    assert_eq!(status["status"], "ACCEPTED");
}

// ============================================================================
// Service catalog hashes
// ============================================================================

#[tokio::test]
async fn contract_service_hashes() {
    let root = tempfile::tempdir().unwrap();
    let service = root.path().join("bundle-1").join("petstore");
    std::fs::create_dir_all(&service).unwrap();
    std::fs::write(service.join("definition.yaml"), "openapi: 3.0.1").unwrap();
    std::fs::write(service.join("metadata.yaml"), "name: Petstore\nversion: v1\n").unwrap();

    let server = TestServer::start_with(TestOptions {
        catalog_root: Some(root.path().to_path_buf()),
        ..TestOptions::default()
    })
    .await;

    let resp = server
        .client()
        .post(server.catalog("/services/hashes"))
        .json(&json!({"bundle": "bundle-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 1);

    let mut expected = ServiceHashes::new();
    apim_core::generate_hash(&root.path().join("bundle-1"), &mut expected).unwrap();
    assert_eq!(body["hashes"]["Petstore-v1"], expected.get("Petstore-v1").unwrap());
    assert_eq!(body["hashes"]["Petstore-v1"].as_str().unwrap().len(), 64);

    for (bundle, status) in [("../etc", 400), ("missing", 404)] {
        let resp = server
            .client()
            .post(server.catalog("/services/hashes"))
            .json(&json!({ "bundle": bundle }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), status, "bundle {bundle}");
    }
}

#[tokio::test]
async fn contract_service_hashes_disabled() {
    let server = TestServer::start().await;
    let resp = server
        .client()
        .post(server.catalog("/services/hashes"))
        .json(&json!({"bundle": "anything"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ============================================================================
// Router level
// ============================================================================

#[tokio::test]
async fn router_rejects_malformed_json() {
    let pool = Arc::new(apim_core::WorkerPool::new("router-test", 1, 1));
    let state = Arc::new(apim_server::state::AppState::new(Providers::in_memory(), pool, None));
    let app = apim_server::build_app(state, apim_server::auth::AuthState::disabled(), 1024);

    let req = Request::builder()
        .method("POST")
        .uri("/api/am/publisher/v4/gateway-policies")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Gateway policy mapping list is empty");

    // Bodies over the limit never reach the handler.
    let big = json!({"description": "x".repeat(4096), "policyMapping": {"request": [{"policyName": "a"}]}});
    let req = Request::builder()
        .method("POST")
        .uri("/api/am/publisher/v4/gateway-policies")
        .header("content-type", "application/json")
        .body(Body::from(big.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
