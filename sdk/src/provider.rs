use async_trait::async_trait;

use crate::error::ApimResult;
use crate::types::{Caller, DeploymentPlan, GatewayPolicyData, OperationPolicy, UsagePublishInfo};

/// Admin-side business operations backing the monetization endpoints.
#[async_trait]
pub trait AdminProvider: Send + Sync {
    async fn get_usage_publish_info(&self) -> ApimResult<Option<UsagePublishInfo>>;

    async fn add_usage_publish_info(&self, info: &UsagePublishInfo) -> ApimResult<()>;

    async fn update_usage_publish_info(&self, info: &UsagePublishInfo) -> ApimResult<()>;
}

/// Publisher-side gateway policy operations.
///
/// Every call is scoped to `caller.tenant`; a mapping id from another tenant is
/// reported as not found.
#[async_trait]
pub trait GatewayPolicyProvider: Send + Sync {
    /// Store a new mapping and return its generated id.
    async fn apply_gateway_global_policies(
        &self,
        caller: &Caller,
        policies: Vec<OperationPolicy>,
        description: Option<String>,
        display_name: Option<String>,
    ) -> ApimResult<String>;

    /// Replace the contents of an existing mapping and return its id.
    async fn update_gateway_global_policies(
        &self,
        caller: &Caller,
        mapping_id: &str,
        policies: Vec<OperationPolicy>,
        description: Option<String>,
        display_name: Option<String>,
    ) -> ApimResult<String>;

    /// Policies of a mapping; empty when the mapping does not exist.
    async fn get_gateway_policies_by_mapping_id(
        &self,
        caller: &Caller,
        mapping_id: &str,
    ) -> ApimResult<Vec<OperationPolicy>>;

    async fn delete_gateway_policy_mapping(&self, caller: &Caller, mapping_id: &str) -> ApimResult<()>;

    async fn get_all_gateway_policy_mappings(&self, caller: &Caller) -> ApimResult<Vec<GatewayPolicyData>>;

    async fn get_gateway_policy_mapping(&self, caller: &Caller, mapping_id: &str) -> ApimResult<GatewayPolicyData>;

    /// Deploy and undeploy a mapping on gateway environments.
    async fn engage_gateway_global_policies(
        &self,
        caller: &Caller,
        mapping_id: &str,
        plan: DeploymentPlan,
    ) -> ApimResult<()>;
}

/// Sink that pushes usage records to the billing engine for a time window.
///
/// `from` and `to` are Unix epoch milliseconds.
#[async_trait]
pub trait UsagePublisher: Send + Sync {
    async fn publish_usage(&self, from: i64, to: i64) -> ApimResult<()>;
}
