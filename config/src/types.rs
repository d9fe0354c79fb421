use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::ConfigError;

pub const DEFAULT_MAX_BODY_SIZE_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
/// Upper bound for `monetization.publish_time_gap_days`.
pub const MAX_PUBLISH_TIME_GAP_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApimConfig {
    pub server: ServerConfig,
    pub provider: ProviderSettings,
    pub monetization: MonetizationConfig,
    pub worker: WorkerConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

impl ApimConfig {
    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.auth.enabled && self.server.auth.jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "server.auth.jwt_secret is required when auth is enabled".to_string(),
            ));
        }
        if self.worker.size == 0 {
            return Err(ConfigError::InvalidValue("worker.size must be at least 1".to_string()));
        }
        if self.worker.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "worker.queue_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(days) = self.monetization.publish_time_gap_days {
            if days > MAX_PUBLISH_TIME_GAP_DAYS {
                return Err(ConfigError::InvalidValue(format!(
                    "monetization.publish_time_gap_days must be at most {MAX_PUBLISH_TIME_GAP_DAYS}, got {days}"
                )));
            }
        }
        if self.provider.kind.trim().is_empty() {
            return Err(ConfigError::InvalidValue("provider.kind must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Graceful shutdown timeout in seconds. Default: 30.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_timeout_secs: Option<u64>,
    /// Prometheus metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Body size limit in bytes for JSON requests. Default: 2MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_size_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9443,
            auth: AuthConfig::default(),
            request_timeout_secs: None,
            shutdown_timeout_secs: None,
            metrics: MetricsConfig::default(),
            max_body_size_bytes: None,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_bytes.unwrap_or(DEFAULT_MAX_BODY_SIZE_BYTES)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

/// Bearer token settings. `issuer` and `audience` are only checked when non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Business backend selection, resolved through the provider registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: String,
    pub options: HashMap<String, serde_json::Value>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            options: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonetizationConfig {
    /// Days of usage covered by the first publish run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time_gap_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub size: usize,
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            size: 1,
            queue_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory holding extracted service bundles. Hashing is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_root: Option<String>,
}

impl CatalogConfig {
    /// `import_root` with a leading `~` expanded.
    #[must_use]
    pub fn import_root_path(&self) -> Option<PathBuf> {
        self.import_root
            .as_deref()
            .filter(|root| !root.trim().is_empty())
            .map(|root| PathBuf::from(shellexpand::tilde(root).as_ref()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            filter: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}
