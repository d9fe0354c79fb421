use async_trait::async_trait;
use apim_sdk::{
    AdminProvider, ApimError, ApimResult, Caller, DeploymentPlan, GatewayPolicyData,
    GatewayPolicyProvider, OperationPolicy, UsagePublishInfo,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Mappings and label ownership of one tenant.
#[derive(Debug, Default)]
struct TenantPolicies {
    /// Kept in creation order so listings are stable.
    mappings: Vec<GatewayPolicyData>,
    /// Gateway label -> id of the mapping deployed on it.
    label_owners: HashMap<String, String>,
}

impl TenantPolicies {
    fn find(&self, mapping_id: &str) -> Option<&GatewayPolicyData> {
        self.mappings.iter().find(|m| m.mapping_id == mapping_id)
    }

    fn find_mut(&mut self, mapping_id: &str) -> Option<&mut GatewayPolicyData> {
        self.mappings.iter_mut().find(|m| m.mapping_id == mapping_id)
    }
}

/// Gateway policy store partitioned by tenant domain.
///
/// Partitions are created lazily on first access; a mapping id is only visible
/// inside the tenant that created it.
pub struct MemoryGatewayPolicies {
    tenants: RwLock<HashMap<String, Arc<RwLock<TenantPolicies>>>>,
}

impl Default for MemoryGatewayPolicies {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGatewayPolicies {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }

    async fn tenant(&self, tenant: &str) -> Arc<RwLock<TenantPolicies>> {
        {
            let tenants = self.tenants.read().await;
            if let Some(t) = tenants.get(tenant) {
                return t.clone();
            }
        }

        let mut tenants = self.tenants.write().await;
        if let Some(t) = tenants.get(tenant) {
            return t.clone();
        }

        let t = Arc::new(RwLock::new(TenantPolicies::default()));
        tenants.insert(tenant.to_string(), t.clone());
        tracing::debug!(tenant = %tenant, "Created gateway policy partition");
        t
    }

    /// Tenants that have touched the store.
    pub async fn tenants(&self) -> Vec<String> {
        self.tenants.read().await.keys().cloned().collect()
    }

    fn require_manage(caller: &Caller, action: &str) -> ApimResult<()> {
        if caller.can_manage_policies() {
            Ok(())
        } else {
            Err(ApimError::unauthorized(format!(
                "user '{}' may not {action} gateway policies",
                caller.username
            )))
        }
    }

    fn require_view(caller: &Caller) -> ApimResult<()> {
        if caller.can_view_policies() {
            Ok(())
        } else {
            Err(ApimError::unauthorized(format!(
                "user '{}' may not view gateway policies",
                caller.username
            )))
        }
    }

    fn validate_policies(policies: &[OperationPolicy]) -> ApimResult<()> {
        if policies.is_empty() {
            return Err(ApimError::invalid_argument("gateway policy mapping has no policies"));
        }
        for policy in policies {
            if policy.policy_name.trim().is_empty() {
                return Err(ApimError::invalid_argument("policy name must not be blank"));
            }
            if policy.policy_version.trim().is_empty() {
                return Err(ApimError::invalid_argument(format!(
                    "policy '{}' has a blank version",
                    policy.policy_name
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GatewayPolicyProvider for MemoryGatewayPolicies {
    async fn apply_gateway_global_policies(
        &self,
        caller: &Caller,
        policies: Vec<OperationPolicy>,
        description: Option<String>,
        display_name: Option<String>,
    ) -> ApimResult<String> {
        Self::require_manage(caller, "apply")?;
        Self::validate_policies(&policies)?;

        let mapping_id = Uuid::new_v4().to_string();
        let tenant = self.tenant(&caller.tenant).await;
        tenant.write().await.mappings.push(GatewayPolicyData {
            mapping_id: mapping_id.clone(),
            tenant: caller.tenant.clone(),
            description,
            display_name,
            policies,
            applied_gateway_labels: BTreeSet::new(),
        });

        tracing::debug!(tenant = %caller.tenant, mapping_id = %mapping_id, "Stored gateway policy mapping");
        Ok(mapping_id)
    }

    async fn update_gateway_global_policies(
        &self,
        caller: &Caller,
        mapping_id: &str,
        policies: Vec<OperationPolicy>,
        description: Option<String>,
        display_name: Option<String>,
    ) -> ApimResult<String> {
        Self::require_manage(caller, "update")?;
        Self::validate_policies(&policies)?;

        let tenant = self.tenant(&caller.tenant).await;
        let mut tenant = tenant.write().await;
        let mapping = tenant
            .find_mut(mapping_id)
            .ok_or_else(|| ApimError::not_found(format!("gateway policy mapping {mapping_id}")))?;

        mapping.policies = policies;
        mapping.description = description;
        mapping.display_name = display_name;
        Ok(mapping.mapping_id.clone())
    }

    async fn get_gateway_policies_by_mapping_id(
        &self,
        caller: &Caller,
        mapping_id: &str,
    ) -> ApimResult<Vec<OperationPolicy>> {
        Self::require_view(caller)?;

        let tenant = self.tenant(&caller.tenant).await;
        let tenant = tenant.read().await;
        Ok(tenant
            .find(mapping_id)
            .map(|m| m.policies.clone())
            .unwrap_or_default())
    }

    async fn delete_gateway_policy_mapping(&self, caller: &Caller, mapping_id: &str) -> ApimResult<()> {
        Self::require_manage(caller, "delete")?;

        let tenant = self.tenant(&caller.tenant).await;
        let mut tenant = tenant.write().await;
        let mapping = tenant
            .find(mapping_id)
            .ok_or_else(|| ApimError::not_found(format!("gateway policy mapping {mapping_id}")))?;

        if mapping.is_deployed() {
            let labels: Vec<_> = mapping.applied_gateway_labels.iter().cloned().collect();
            return Err(ApimError::conflict(format!(
                "gateway policy mapping {mapping_id} is deployed to {}; undeploy it first",
                labels.join(", ")
            )));
        }

        tenant.mappings.retain(|m| m.mapping_id != mapping_id);
        Ok(())
    }

    async fn get_all_gateway_policy_mappings(&self, caller: &Caller) -> ApimResult<Vec<GatewayPolicyData>> {
        Self::require_view(caller)?;

        let tenant = self.tenant(&caller.tenant).await;
        let mappings = tenant.read().await.mappings.clone();
        Ok(mappings)
    }

    async fn get_gateway_policy_mapping(&self, caller: &Caller, mapping_id: &str) -> ApimResult<GatewayPolicyData> {
        Self::require_view(caller)?;

        let tenant = self.tenant(&caller.tenant).await;
        let tenant = tenant.read().await;
        tenant
            .find(mapping_id)
            .cloned()
            .ok_or_else(|| ApimError::not_found(format!("gateway policy mapping {mapping_id}")))
    }

    async fn engage_gateway_global_policies(
        &self,
        caller: &Caller,
        mapping_id: &str,
        plan: DeploymentPlan,
    ) -> ApimResult<()> {
        Self::require_manage(caller, "deploy")?;

        let tenant = self.tenant(&caller.tenant).await;
        let mut tenant = tenant.write().await;
        if tenant.find(mapping_id).is_none() {
            return Err(ApimError::not_found(format!("gateway policy mapping {mapping_id}")));
        }

        // Validate the whole plan before touching any label.
        for deployment in plan.get(true) {
            if let Some(owner) = tenant.label_owners.get(&deployment.gateway_label) {
                if owner != mapping_id {
                    return Err(ApimError::already_exists(format!(
                        "gateway '{}' already has policy mapping {owner} deployed",
                        deployment.gateway_label
                    )));
                }
            }
        }

        for deployment in plan.get(false) {
            if tenant.label_owners.get(&deployment.gateway_label).map(String::as_str) == Some(mapping_id) {
                tenant.label_owners.remove(&deployment.gateway_label);
            }
        }
        for deployment in plan.get(true) {
            tenant
                .label_owners
                .insert(deployment.gateway_label.clone(), mapping_id.to_string());
        }

        let mapping = tenant
            .find_mut(mapping_id)
            .ok_or_else(|| ApimError::internal(format!("gateway policy mapping {mapping_id} vanished")))?;
        for deployment in plan.get(false) {
            mapping.applied_gateway_labels.remove(&deployment.gateway_label);
        }
        for deployment in plan.get(true) {
            mapping
                .applied_gateway_labels
                .insert(deployment.gateway_label.clone());
        }

        tracing::info!(
            tenant = %caller.tenant,
            mapping_id = %mapping_id,
            deployed = plan.deploy.len(),
            undeployed = plan.undeploy.len(),
            "Engaged gateway policy mapping"
        );
        Ok(())
    }
}

/// Admin store holding the single usage publish record.
#[derive(Default)]
pub struct MemoryAdmin {
    publish_info: RwLock<Option<UsagePublishInfo>>,
}

impl MemoryAdmin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminProvider for MemoryAdmin {
    async fn get_usage_publish_info(&self) -> ApimResult<Option<UsagePublishInfo>> {
        Ok(self.publish_info.read().await.clone())
    }

    async fn add_usage_publish_info(&self, info: &UsagePublishInfo) -> ApimResult<()> {
        let mut slot = self.publish_info.write().await;
        if slot.is_some() {
            return Err(ApimError::already_exists(format!("usage publish info {}", info.id)));
        }
        *slot = Some(info.clone());
        Ok(())
    }

    async fn update_usage_publish_info(&self, info: &UsagePublishInfo) -> ApimResult<()> {
        let mut slot = self.publish_info.write().await;
        match slot.as_mut() {
            Some(existing) if existing.id == info.id => {
                *existing = info.clone();
                Ok(())
            }
            _ => Err(ApimError::not_found(format!("usage publish info {}", info.id))),
        }
    }
}
