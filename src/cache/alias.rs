//! Reverse lookup from commit hashes to cached pseudo-versions
//!
//! A caller asking for a commit we have already resolved should not pay
//! for a backend round trip: the `@v` directory is scanned for a cached
//! pseudo-version whose short-hash tail matches the requested hash.

use crate::module::RevInfo;
use crate::version;
use std::fs;
use tracing::debug;

use super::disk::{DiskCache, Lookup};

/// Look up `rev` as a full or prefix commit hash against already-cached
/// pseudo-versions for `path`. Non-hex input, input shorter than a short
/// hash, and a missing artifact directory are all misses.
pub(crate) fn lookup(disk: &DiskCache, path: &str, rev: &str) -> Lookup<RevInfo> {
    if rev.len() < version::SHORT_HASH_LEN || !version::all_hex(rev) {
        return Lookup::Miss { file: None };
    }
    let short = &rev[..version::SHORT_HASH_LEN];

    let Some(dir) = disk.version_dir(path) else {
        return Lookup::Miss { file: None };
    };
    let Ok(entries) = fs::read_dir(&dir) else {
        return Lookup::Miss { file: None };
    };

    let suffix = format!("-{short}.info");
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(stem) = name.strip_suffix(".info") {
            if name.ends_with(&suffix) && version::is_pseudo(stem) {
                debug!("resolved {path} {rev} via cached pseudo-version {stem}");
                return disk.read_stat(path, stem);
            }
        }
    }
    Lookup::Miss { file: None }
}
