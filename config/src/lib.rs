//! APIM Configuration System
//!
//! Provides unified YAML-based configuration for the APIM server.
//!
//! # Configuration Loading Priority
//!
//! 1. Compiled-in defaults
//! 2. `/etc/apim/apim.yaml` (system-wide)
//! 3. `~/.config/apim/apim.yaml` (user)
//! 4. `./apim.yaml` (project-local)
//! 5. `--config` or `APIM_CONFIG=/path/to/config.yaml` (explicit, replaces 2-4)
//! 6. Environment variables (highest priority)
//!
//! # Example Configuration
//!
//! ```yaml
//! server:
//!   host: "0.0.0.0"
//!   port: 9443
//!   auth:
//!     enabled: true
//!     jwt_secret: "${APIM_JWT_SECRET}"
//!
//! monetization:
//!   publish_time_gap_days: 7
//!
//! worker:
//!   size: 2
//!   queue_capacity: 32
//!
//! catalog:
//!   import_root: "~/apim/bundles"
//! ```

#![allow(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::*;

/// Load configuration from default locations.
///
/// Searches for config files in order and merges them.
/// Environment variables override file values.
pub fn load() -> Result<ApimConfig, ConfigError> {
    ConfigLoader::new().load()
}

/// Load configuration from a specific file.
pub fn load_from_file(path: &str) -> Result<ApimConfig, ConfigError> {
    ConfigLoader::new().with_file(path).load()
}
