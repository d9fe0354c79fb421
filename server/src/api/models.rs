use apim_sdk::{
    GatewayPolicyData, GatewayPolicyDeployment, OperationPolicy, PolicyDirection, UsagePublishInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_POLICY_VERSION: &str = "v1";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============================================================================
// Monetization
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishStatusDto {
    pub status: String,
    pub message: String,
}

impl PublishStatusDto {
    pub fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePublishInfoDto {
    pub id: String,
    pub state: String,
    pub status: String,
    pub started_time: i64,
    pub last_publish_time: i64,
}

impl From<UsagePublishInfo> for UsagePublishInfoDto {
    fn from(info: UsagePublishInfo) -> Self {
        Self {
            id: info.id,
            state: info.state.as_str().to_string(),
            status: info.status.as_str().to_string(),
            started_time: info.started_time,
            last_publish_time: info.last_publish_time,
        }
    }
}

// ============================================================================
// Gateway policies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPolicyDto {
    pub policy_name: String,
    #[serde(default = "default_policy_version")]
    pub policy_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

fn default_policy_version() -> String {
    DEFAULT_POLICY_VERSION.to_string()
}

impl OperationPolicyDto {
    fn into_policy(self, direction: PolicyDirection) -> OperationPolicy {
        OperationPolicy {
            direction,
            policy_name: self.policy_name,
            policy_version: self.policy_version,
            policy_id: self.policy_id,
            parameters: self.parameters,
        }
    }
}

impl From<&OperationPolicy> for OperationPolicyDto {
    fn from(policy: &OperationPolicy) -> Self {
        Self {
            policy_name: policy.policy_name.clone(),
            policy_version: policy.policy_version.clone(),
            policy_id: policy.policy_id.clone(),
            parameters: policy.parameters.clone(),
        }
    }
}

/// Policies attached to each message flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyFlowsDto {
    pub request: Vec<OperationPolicyDto>,
    pub response: Vec<OperationPolicyDto>,
    pub fault: Vec<OperationPolicyDto>,
}

impl PolicyFlowsDto {
    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.response.is_empty() && self.fault.is_empty()
    }

    /// Flatten into request, response then fault policies, keeping order within each flow.
    pub fn into_policies(self) -> Vec<OperationPolicy> {
        let Self {
            request,
            response,
            fault,
        } = self;
        request
            .into_iter()
            .map(|p| p.into_policy(PolicyDirection::Request))
            .chain(response.into_iter().map(|p| p.into_policy(PolicyDirection::Response)))
            .chain(fault.into_iter().map(|p| p.into_policy(PolicyDirection::Fault)))
            .collect()
    }

    pub fn from_policies<'a>(policies: impl IntoIterator<Item = &'a OperationPolicy>) -> Self {
        let mut flows = Self::default();
        for policy in policies {
            let dto = OperationPolicyDto::from(policy);
            match policy.direction {
                PolicyDirection::Request => flows.request.push(dto),
                PolicyDirection::Response => flows.response.push(dto),
                PolicyDirection::Fault => flows.fault.push(dto),
            }
        }
        flows
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPolicyMappingsDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub applied_gateway_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_mapping: Option<PolicyFlowsDto>,
}

impl GatewayPolicyMappingsDto {
    pub fn has_policies(&self) -> bool {
        self.policy_mapping.as_ref().is_some_and(|flows| !flows.is_empty())
    }

    pub fn policies(&self) -> Vec<OperationPolicy> {
        self.policy_mapping
            .clone()
            .map(PolicyFlowsDto::into_policies)
            .unwrap_or_default()
    }
}

impl From<GatewayPolicyData> for GatewayPolicyMappingsDto {
    fn from(data: GatewayPolicyData) -> Self {
        Self {
            policy_mapping: Some(PolicyFlowsDto::from_policies(&data.policies)),
            id: Some(data.mapping_id),
            description: data.description,
            display_name: data.display_name,
            applied_gateway_labels: data.applied_gateway_labels.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPolicyMappingInfoDto {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub applied_gateway_labels: Vec<String>,
}

impl From<GatewayPolicyData> for GatewayPolicyMappingInfoDto {
    fn from(data: GatewayPolicyData) -> Self {
        Self {
            id: data.mapping_id,
            description: data.description,
            display_name: data.display_name,
            applied_gateway_labels: data.applied_gateway_labels.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDto {
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
    /// Link to the next page, empty on the last page.
    pub next: String,
    /// Link to the previous page, empty on the first page.
    pub previous: String,
}

impl PaginationDto {
    pub fn new(base: &str, offset: usize, limit: usize, total: usize) -> Self {
        let next = if limit > 0 && offset.saturating_add(limit) < total {
            page_link(base, limit, offset + limit)
        } else {
            String::new()
        };
        let previous = if offset > 0 {
            page_link(base, limit, offset.saturating_sub(limit))
        } else {
            String::new()
        };
        Self {
            offset,
            limit,
            total,
            next,
            previous,
        }
    }
}

fn page_link(base: &str, limit: usize, offset: usize) -> String {
    format!("{base}?limit={limit}&offset={offset}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPolicyMappingDataListDto {
    pub count: usize,
    pub list: Vec<GatewayPolicyMappingInfoDto>,
    pub pagination: PaginationDto,
}

impl GatewayPolicyMappingDataListDto {
    /// One page of `mappings`. `limit` defaults to the full list.
    pub fn page(
        base: &str,
        mappings: Vec<GatewayPolicyData>,
        offset: usize,
        limit: Option<usize>,
    ) -> Self {
        let total = mappings.len();
        let limit = limit.unwrap_or(total);
        let list: Vec<GatewayPolicyMappingInfoDto> = mappings
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(GatewayPolicyMappingInfoDto::from)
            .collect();

        Self {
            count: list.len(),
            list,
            pagination: PaginationDto::new(base, offset, limit, total),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPolicyDeploymentDto {
    #[serde(rename = "mappingUUID", default, skip_serializing_if = "Option::is_none")]
    pub mapping_uuid: Option<String>,
    pub gateway_label: String,
    pub gateway_deployment: bool,
}

impl GatewayPolicyDeploymentDto {
    pub fn to_deployment(&self, mapping_id: &str) -> GatewayPolicyDeployment {
        GatewayPolicyDeployment {
            mapping_id: mapping_id.to_string(),
            gateway_label: self.gateway_label.clone(),
            deploy: self.gateway_deployment,
        }
    }
}

// ============================================================================
// Service catalog
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHashRequest {
    pub bundle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHashesResponse {
    pub bundle: String,
    pub count: usize,
    pub hashes: BTreeMap<String, String>,
}
