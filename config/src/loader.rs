use crate::{ApimConfig, ConfigError};
use regex::Regex;
use std::path::PathBuf;

pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(".config/apim/apim.yaml"));
        }
        search_paths.push(PathBuf::from("./apim.yaml"));

        #[cfg(unix)]
        search_paths.insert(0, PathBuf::from("/etc/apim/apim.yaml"));

        Self {
            explicit_file: None,
            search_paths,
        }
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.explicit_file = Some(PathBuf::from(path));
        self
    }

    pub fn load(&self) -> Result<ApimConfig, ConfigError> {
        let explicit = self
            .explicit_file
            .clone()
            .or_else(|| std::env::var("APIM_CONFIG").ok().map(PathBuf::from));

        let mut config = ApimConfig::default();
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
            config = self.parse_yaml(&content)?;
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        } else {
            for path in &self.search_paths {
                if path.exists() {
                    if let Ok(content) = std::fs::read_to_string(path) {
                        config = self.merge_yaml(&config, &content)?;
                        tracing::debug!(path = %path.display(), "Merged configuration file");
                    }
                }
            }
        }

        self.apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn parse_yaml(&self, content: &str) -> Result<ApimConfig, ConfigError> {
        let expanded = self.expand_env_vars(content)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn merge_yaml(&self, base: &ApimConfig, content: &str) -> Result<ApimConfig, ConfigError> {
        let overlay = self.parse_yaml(content)?;
        Ok(self.merge_configs(base, &overlay))
    }

    /// Overlay the sections of `overlay` that differ from the defaults.
    fn merge_configs(&self, base: &ApimConfig, overlay: &ApimConfig) -> ApimConfig {
        let defaults = ApimConfig::default();
        let mut result = base.clone();

        if overlay.server.host != defaults.server.host {
            result.server.host = overlay.server.host.clone();
        }
        if overlay.server.port != defaults.server.port {
            result.server.port = overlay.server.port;
        }
        if overlay.server.auth.enabled {
            result.server.auth = overlay.server.auth.clone();
        }
        if overlay.server.request_timeout_secs.is_some() {
            result.server.request_timeout_secs = overlay.server.request_timeout_secs;
        }
        if overlay.server.shutdown_timeout_secs.is_some() {
            result.server.shutdown_timeout_secs = overlay.server.shutdown_timeout_secs;
        }
        if overlay.server.max_body_size_bytes.is_some() {
            result.server.max_body_size_bytes = overlay.server.max_body_size_bytes;
        }
        if overlay.server.metrics.enabled != defaults.server.metrics.enabled
            || overlay.server.metrics.path != defaults.server.metrics.path
        {
            result.server.metrics = overlay.server.metrics.clone();
        }
        if overlay.provider != defaults.provider {
            result.provider = overlay.provider.clone();
        }
        if overlay.monetization != defaults.monetization {
            result.monetization = overlay.monetization.clone();
        }
        if overlay.worker != defaults.worker {
            result.worker = overlay.worker.clone();
        }
        if overlay.catalog != defaults.catalog {
            result.catalog = overlay.catalog.clone();
        }
        if overlay.logging.level != defaults.logging.level
            || overlay.logging.format != defaults.logging.format
            || !overlay.logging.filter.is_empty()
        {
            result.logging = overlay.logging.clone();
        }

        result
    }

    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;
        Ok(re
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_default()
            })
            .to_string())
    }

    fn apply_env_overrides(&self, config: &mut ApimConfig) {
        if let Ok(host) = std::env::var("APIM_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("APIM_PORT") {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        if let Ok(secret) = std::env::var("APIM_JWT_SECRET") {
            if !secret.is_empty() {
                config.server.auth.enabled = true;
            }
            config.server.auth.jwt_secret = secret;
        }
        if let Ok(level) = std::env::var("APIM_LOG_LEVEL") {
            if let Ok(l) = serde_yaml::from_str(&level) {
                config.logging.level = l;
            }
        }
        if let Ok(days) = std::env::var("APIM_PUBLISH_GAP_DAYS") {
            match days.parse() {
                Ok(d) => config.monetization.publish_time_gap_days = Some(d),
                Err(_) => tracing::warn!(value = %days, "Ignoring invalid APIM_PUBLISH_GAP_DAYS"),
            }
        }
        if let Ok(workers) = std::env::var("APIM_WORKERS") {
            if let Ok(n) = workers.parse() {
                config.worker.size = n;
            }
        }
        if let Ok(root) = std::env::var("APIM_CATALOG_ROOT") {
            if !root.is_empty() {
                config.catalog.import_root = Some(root);
            }
        }
        if let Ok(kind) = std::env::var("APIM_PROVIDER") {
            if !kind.is_empty() {
                config.provider.kind = kind;
            }
        }
    }
}
