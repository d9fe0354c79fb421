use std::collections::HashMap;
use std::sync::Arc;

use apim_sdk::{AdminProvider, ApimError, ApimResult, GatewayPolicyProvider, UsagePublisher};
use serde::{Deserialize, Serialize};

use super::memory::{MemoryAdmin, MemoryGatewayPolicies};
use super::publisher::LoggingUsagePublisher;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub options: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.options.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
    }
}

/// The business backend the REST layer delegates to.
#[derive(Clone)]
pub struct Providers {
    pub admin: Arc<dyn AdminProvider>,
    pub policies: Arc<dyn GatewayPolicyProvider>,
    pub usage_publisher: Arc<dyn UsagePublisher>,
}

impl Providers {
    /// In-memory backend with a logging usage publisher.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            admin: Arc::new(MemoryAdmin::new()),
            policies: Arc::new(MemoryGatewayPolicies::new()),
            usage_publisher: Arc::new(LoggingUsagePublisher::new()),
        }
    }

    #[must_use]
    pub fn with_usage_publisher(mut self, publisher: Arc<dyn UsagePublisher>) -> Self {
        self.usage_publisher = publisher;
        self
    }

    #[must_use]
    pub fn with_policies(mut self, policies: Arc<dyn GatewayPolicyProvider>) -> Self {
        self.policies = policies;
        self
    }
}

pub type ProviderFactory = fn(ProviderConfig) -> ApimResult<Providers>;

pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, factory: ProviderFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str, config: ProviderConfig) -> ApimResult<Providers> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ApimError::not_found(format!("provider '{name}' not registered")))?;
        factory(config)
    }

    pub fn list(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

pub fn default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    registry.register("memory", |config| {
        let publisher = config
            .get_str("usage_publisher")
            .unwrap_or_else(|| "log".to_string());
        match publisher.as_str() {
            "log" => Ok(Providers::in_memory()),
            other => Err(ApimError::invalid_argument(format!(
                "memory provider does not support usage publisher '{other}'"
            ))),
        }
    });

    registry
}
