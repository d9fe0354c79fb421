#![doc = include_str!("../README.md")]

mod error;
mod provider;
mod types;

pub use error::{ApimError, ApimResult, ErrorKind};
pub use provider::{AdminProvider, GatewayPolicyProvider, UsagePublisher};
pub use types::{
    Caller, DeploymentPlan, GatewayPolicyData, GatewayPolicyDeployment, OperationPolicy,
    PolicyDirection, PublishState, PublishStatus, UsagePublishInfo, DEFAULT_TENANT, ROLE_ADMIN,
    ROLE_CREATOR, ROLE_PUBLISHER, USAGE_PUBLISH_JOB_NAME,
};
