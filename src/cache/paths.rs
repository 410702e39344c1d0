// Cache path utilities.
// One cache file per scanning identity, named by a one-way hash of that identity.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use sha2::{Digest, Sha256};

/// Get the base cache directory (~/.cache/ghtally on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ghtally").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Lowercase hex SHA-256 of `value`.
pub fn identity_hash(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Path to the lines-of-code cache for `identity` inside `dir`.
pub fn cache_file_path(dir: &Path, identity: &str) -> PathBuf {
    dir.join(format!("{}.txt", identity_hash(identity)))
}
