use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Tenant domain used when a request carries no tenant of its own.
pub const DEFAULT_TENANT: &str = "carbon.super";

/// Identifier of the single usage publish record kept by the admin provider.
pub const USAGE_PUBLISH_JOB_NAME: &str = "USAGE_PUBLISHER";

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PUBLISHER: &str = "publisher";
pub const ROLE_CREATOR: &str = "creator";

/// Identity and tenant of the user a provider call is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Caller {
    pub tenant: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl Caller {
    #[must_use]
    pub fn new(tenant: impl Into<String>, username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            tenant: tenant.into(),
            username: username.into(),
            roles,
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Publishers and admins may create, change, deploy and delete gateway policies.
    #[must_use]
    pub fn can_manage_policies(&self) -> bool {
        self.is_admin() || self.has_role(ROLE_PUBLISHER)
    }

    #[must_use]
    pub fn can_view_policies(&self) -> bool {
        self.can_manage_policies() || self.has_role(ROLE_CREATOR)
    }
}

// ============================================================================
// Gateway policies
// ============================================================================

/// Message flow an operation policy is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PolicyDirection {
    Request,
    Response,
    Fault,
}

impl PolicyDirection {
    pub const ALL: [Self; 3] = [Self::Request, Self::Response, Self::Fault];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Fault => "fault",
        }
    }
}

impl fmt::Display for PolicyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "response" => Ok(Self::Response),
            "fault" => Ok(Self::Fault),
            _ => Err(format!("unknown policy direction: {s}")),
        }
    }
}

/// A single policy attached to a request, response or fault flow.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperationPolicy {
    pub direction: PolicyDirection,
    pub policy_name: String,
    pub policy_version: String,
    pub policy_id: Option<String>,
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl OperationPolicy {
    #[must_use]
    pub fn new(direction: PolicyDirection, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            direction,
            policy_name: name.into(),
            policy_version: version.into(),
            policy_id: None,
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, key: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }
}

/// A stored gateway policy mapping.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GatewayPolicyData {
    pub mapping_id: String,
    pub tenant: String,
    pub description: Option<String>,
    pub display_name: Option<String>,
    /// Policies in flow order; the relative order within one direction is significant.
    pub policies: Vec<OperationPolicy>,
    pub applied_gateway_labels: BTreeSet<String>,
}

impl GatewayPolicyData {
    /// Policies attached to one flow, in their configured order.
    pub fn policies_for(&self, direction: PolicyDirection) -> impl Iterator<Item = &OperationPolicy> {
        self.policies.iter().filter(move |p| p.direction == direction)
    }

    #[must_use]
    pub fn is_deployed(&self) -> bool {
        !self.applied_gateway_labels.is_empty()
    }
}

/// Deploy or undeploy intent of one mapping on one gateway environment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GatewayPolicyDeployment {
    pub mapping_id: String,
    pub gateway_label: String,
    pub deploy: bool,
}

/// Deployments grouped by intent: `deploy` holds the `true` entries, `undeploy` the `false` ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub deploy: Vec<GatewayPolicyDeployment>,
    pub undeploy: Vec<GatewayPolicyDeployment>,
}

impl DeploymentPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deploy.is_empty() && self.undeploy.is_empty()
    }

    #[must_use]
    pub fn get(&self, deploy: bool) -> &[GatewayPolicyDeployment] {
        if deploy {
            &self.deploy
        } else {
            &self.undeploy
        }
    }
}

impl FromIterator<GatewayPolicyDeployment> for DeploymentPlan {
    fn from_iter<I: IntoIterator<Item = GatewayPolicyDeployment>>(iter: I) -> Self {
        let mut plan = Self::default();
        for deployment in iter {
            if deployment.deploy {
                plan.deploy.push(deployment);
            } else {
                plan.undeploy.push(deployment);
            }
        }
        plan
    }
}

// ============================================================================
// Monetization usage publishing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PublishState {
    Initiated,
    Running,
    Idle,
}

impl PublishState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::Running => "RUNNING",
            Self::Idle => "IDLE",
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PublishStatus {
    InProgress,
    Accepted,
    Error,
}

impl PublishStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "INPROGRESS",
            Self::Accepted => "ACCEPTED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping record of the monetization usage publisher.
///
/// Timestamps are Unix epoch milliseconds (UTC).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsagePublishInfo {
    pub id: String,
    pub state: PublishState,
    pub status: PublishStatus,
    pub started_time: i64,
    pub last_publish_time: i64,
}

impl UsagePublishInfo {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == PublishState::Running
    }
}
