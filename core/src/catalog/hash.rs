use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::metadata::key_from_files;
use super::{CatalogError, ServiceHashes};

const READ_CHUNK: usize = 1024;

/// Hash every service directory directly under `path` into `hashes`.
///
/// Directories are visited in name order, so a key shared by two services
/// ends up with the hash of the later one. Directories without a derivable
/// service key are skipped.
pub fn generate_hash(path: &Path, hashes: &mut ServiceHashes) -> Result<(), CatalogError> {
    for dir in sorted_entries(path, |p| p.is_dir())? {
        match hash_service_dir(&dir)? {
            Some((key, hash)) => {
                tracing::debug!(dir = %dir.display(), key = %key, "Hashed service directory");
                if hashes.insert(key.clone(), hash).is_some() {
                    tracing::warn!(key = %key, dir = %dir.display(), "Duplicate service key, keeping later directory");
                }
            }
            None => {
                tracing::warn!(dir = %dir.display(), "No service key could be derived, skipping directory");
            }
        }
    }
    Ok(())
}

/// Key and hash of one service directory, or `None` when no key can be derived.
///
/// The hash is the hex MD5 of the first entry followed by that of the second,
/// entries ordered by name. Nested directories count as entries, so one sorting
/// into the first two positions fails the directory with an I/O error.
pub fn hash_service_dir(dir: &Path) -> Result<Option<(String, String)>, CatalogError> {
    let entries = sorted_entries(dir, |_| true)?;
    if entries.len() < 2 {
        return Err(CatalogError::InsufficientFiles {
            dir: dir.to_path_buf(),
            found: entries.len(),
        });
    }

    let files: Vec<PathBuf> = entries.iter().filter(|p| p.is_file()).cloned().collect();
    let Some(key) = key_from_files(&files) else {
        return Ok(None);
    };

    let hash = format!("{}{}", file_checksum(&entries[0])?, file_checksum(&entries[1])?);
    Ok(Some((key, hash)))
}

/// Lowercase hex MD5 of a file, streamed in 1 KiB reads.
pub fn file_checksum(path: &Path) -> Result<String, CatalogError> {
    if path.is_dir() {
        return Err(CatalogError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
        ));
    }
    let mut file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).map_err(|e| CatalogError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Resolve a bundle name to a directory under `root`.
///
/// The name must be a single path component.
pub fn resolve_bundle(root: &Path, bundle: &str) -> Result<PathBuf, CatalogError> {
    let name = bundle.trim();
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(CatalogError::InvalidBundle(bundle.to_string()));
    }

    let dir = root.join(name);
    if !dir.is_dir() {
        return Err(CatalogError::BundleNotFound(name.to_string()));
    }
    Ok(dir)
}

/// Fresh hash map for the bundle `bundle` under `root`.
pub fn hash_bundle(root: &Path, bundle: &str) -> Result<ServiceHashes, CatalogError> {
    let dir = resolve_bundle(root, bundle)?;
    let mut hashes = ServiceHashes::new();
    generate_hash(&dir, &mut hashes)?;
    tracing::info!(bundle = %bundle, services = hashes.len(), "Generated service hashes");
    Ok(hashes)
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CatalogError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CatalogError::io(dir, e))?.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}
