//! Service catalog content hashing.
//!
//! A bundle directory holds one subdirectory per service. Each service is keyed
//! by its metadata file and fingerprinted with the MD5 digests of its first two
//! files in name order.

mod hash;
mod metadata;

pub use hash::{file_checksum, generate_hash, hash_bundle, hash_service_dir, resolve_bundle};
pub use metadata::{generate_service_key, ServiceMetadata, METADATA_FILE_PREFIX};

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("service directory {} has {found} file(s), at least 2 are required", dir.display())]
    InsufficientFiles { dir: PathBuf, found: usize },

    #[error("invalid metadata file {}: {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },

    #[error("invalid bundle name: {0}")]
    InvalidBundle(String),

    #[error("bundle not found: {0}")]
    BundleNotFound(String),
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InsufficientFiles { .. } | Self::Metadata { .. } | Self::InvalidBundle(_) => 400,
            Self::BundleNotFound(_) => 404,
            Self::Io { .. } => 500,
        }
    }
}

/// Service key to concatenated MD5 hex digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServiceHashes {
    entries: BTreeMap<String, String>,
}

impl ServiceHashes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the previous hash stored under `key`, if any.
    pub fn insert(&mut self, key: String, hash: String) -> Option<String> {
        self.entries.insert(key, hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl From<ServiceHashes> for BTreeMap<String, String> {
    fn from(hashes: ServiceHashes) -> Self {
        hashes.entries
    }
}
