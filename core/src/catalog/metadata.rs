//! Service bundle metadata files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::CatalogError;

/// Bundle files whose name starts with this prefix carry the service metadata.
pub const METADATA_FILE_PREFIX: &str = "metadata";

/// The subset of a bundle's metadata file used to identify the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceMetadata {
    pub key: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub service_url: Option<String>,
    pub definition_type: Option<String>,
}

impl ServiceMetadata {
    /// Parse a metadata file. `.json` files are read as JSON, everything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&raw).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| CatalogError::Metadata {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// The explicit `key` when set, otherwise one generated from name and version.
    #[must_use]
    pub fn service_key(&self) -> Option<String> {
        match self.key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Some(key.to_string()),
            _ => generate_service_key(self),
        }
    }
}

/// `{name}-{version}`, or `None` when either part is blank.
#[must_use]
pub fn generate_service_key(metadata: &ServiceMetadata) -> Option<String> {
    let name = metadata.name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let version = metadata.version.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    Some(format!("{name}-{version}"))
}

pub(crate) fn is_metadata_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(METADATA_FILE_PREFIX))
}

/// Derive the service key from the metadata files among `files`.
///
/// Later metadata files win. Unreadable or unparsable ones are logged and skipped.
pub(crate) fn key_from_files(files: &[PathBuf]) -> Option<String> {
    let mut key = None;
    for file in files.iter().filter(|f| is_metadata_file(f)) {
        match ServiceMetadata::from_file(file) {
            Ok(metadata) => {
                if let Some(derived) = metadata.service_key() {
                    key = Some(derived);
                }
            }
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "Failed to fetch metadata information");
            }
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_key_wins() {
        let metadata = ServiceMetadata {
            key: Some("pizza-shop-1".into()),
            name: Some("PizzaShop".into()),
            version: Some("1.0.0".into()),
            ..Default::default()
        };
        assert_eq!(metadata.service_key().as_deref(), Some("pizza-shop-1"));
    }

    #[test]
    fn blank_key_falls_back_to_name_and_version() {
        let metadata = ServiceMetadata {
            key: Some("  ".into()),
            name: Some("PizzaShop".into()),
            version: Some("1.0.0".into()),
            ..Default::default()
        };
        assert_eq!(metadata.service_key().as_deref(), Some("PizzaShop-1.0.0"));
    }

    #[test]
    fn no_key_without_version() {
        let metadata = ServiceMetadata {
            name: Some("PizzaShop".into()),
            ..Default::default()
        };
        assert_eq!(metadata.service_key(), None);
    }

    #[test]
    fn reads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("metadata.yaml");
        fs::write(&yaml, "name: Petstore\nversion: v2\ndisplayName: Pet Store\n").unwrap();
        let parsed = ServiceMetadata::from_file(&yaml).unwrap();
        assert_eq!(parsed.display_name.as_deref(), Some("Pet Store"));
        assert_eq!(parsed.service_key().as_deref(), Some("Petstore-v2"));

        let json = dir.path().join("metadata.json");
        fs::write(&json, r#"{"key": "petstore-json", "serviceUrl": "http://localhost"}"#).unwrap();
        let parsed = ServiceMetadata::from_file(&json).unwrap();
        assert_eq!(parsed.service_key().as_deref(), Some("petstore-json"));
    }

    #[test]
    fn malformed_metadata_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ServiceMetadata::from_file(&path),
            Err(CatalogError::Metadata { .. })
        ));
        assert_eq!(key_from_files(&[path]), None);
    }
}
