//! On-disk artifact cache with atomic publication
//!
//! Artifacts live under `ROOT/cache/download/<path>/@v/<version>.<suffix>`;
//! extracted source trees under `ROOT/<path>@<version>/`. A published file
//! is never rewritten in place: updates go to a sibling temp file and are
//! renamed over the target, so readers only ever observe complete files.

use crate::error::{QuarryError, QuarryResult};
use crate::module::RevInfo;
use crate::version;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::alias;

/// Marker prefix of legacy auto-generated manifest entries; entries carrying
/// it are treated as absent and regenerated.
const LEGACY_MANIFEST_PREFIX: &[u8] = b"//vgo 0.0.";

/// Result of a cache file lookup
#[derive(Debug)]
pub enum Lookup<T> {
    /// Entry present and well-formed
    Hit { file: PathBuf, value: T },
    /// Entry absent or unusable; `file` names the target a later write may
    /// publish, when one exists
    Miss { file: Option<PathBuf> },
}

impl<T> Lookup<T> {
    /// The value on a hit, discarding file bookkeeping
    pub fn value(self) -> Option<T> {
        match self {
            Lookup::Hit { value, .. } => Some(value),
            Lookup::Miss { .. } => None,
        }
    }
}

/// Read/write access to individual artifact files
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: Option<PathBuf>,
}

impl DiskCache {
    /// Create a cache rooted at `root`; `None` disables disk caching
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// The `@v` directory holding artifact files for `path`
    pub(crate) fn version_dir(&self, path: &str) -> Option<PathBuf> {
        Some(self.root.as_ref()?.join("cache/download").join(path).join("@v"))
    }

    /// Target file for `(path, rev, suffix)`; `None` when disk caching is
    /// disabled or `rev` is not a canonical version
    pub(crate) fn artifact_file(&self, path: &str, rev: &str, suffix: &str) -> Option<PathBuf> {
        if !version::is_canonical(rev) {
            return None;
        }
        Some(self.version_dir(path)?.join(format!("{rev}.{suffix}")))
    }

    /// Read a raw artifact file
    pub fn read(&self, path: &str, rev: &str, suffix: &str) -> Lookup<Vec<u8>> {
        let Some(file) = self.artifact_file(path, rev, suffix) else {
            return Lookup::Miss { file: None };
        };
        match fs::read(&file) {
            Ok(data) => Lookup::Hit { file, value: data },
            Err(_) => Lookup::Miss { file: Some(file) },
        }
    }

    /// Atomically publish `data` at `file`
    ///
    /// The temp file is created in the target's own directory so the final
    /// rename cannot cross filesystems. Racing writers converge: the last
    /// rename wins and every observable file is complete.
    pub fn write(&self, file: &Path, data: &[u8]) -> QuarryResult<()> {
        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| QuarryError::io(format!("creating {}", dir.display()), e))?;

        let base = file.file_name().and_then(|n| n.to_str()).unwrap_or("artifact");
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{base}.tmp-"))
            .tempfile_in(dir)
            .map_err(|e| QuarryError::io(format!("creating temp file in {}", dir.display()), e))?;
        tmp.write_all(data)
            .map_err(|e| QuarryError::io(format!("writing {}", file.display()), e))?;
        tmp.flush()
            .map_err(|e| QuarryError::io(format!("writing {}", file.display()), e))?;
        tmp.persist(file)
            .map_err(|e| QuarryError::io(format!("publishing {}", file.display()), e.error))?;
        debug!("cached {}", file.display());
        Ok(())
    }

    /// Read a cached stat result
    ///
    /// Falls back to the commit-hash alias index when `rev` is not a
    /// canonical version. A malformed entry is a miss, not an error.
    pub fn read_stat(&self, path: &str, rev: &str) -> Lookup<RevInfo> {
        match self.read(path, rev, "info") {
            Lookup::Hit { file, value } => match serde_json::from_slice(&value) {
                Ok(info) => Lookup::Hit { file, value: info },
                Err(_) => {
                    debug!("malformed stat entry {}", file.display());
                    Lookup::Miss { file: Some(file) }
                }
            },
            Lookup::Miss { file } => match alias::lookup(self, path, rev) {
                hit @ Lookup::Hit { .. } => hit,
                Lookup::Miss { .. } => Lookup::Miss { file },
            },
        }
    }

    /// Write a stat cache entry; no-op when `file` is `None`
    pub fn write_stat(&self, file: Option<&Path>, info: &RevInfo) -> QuarryResult<()> {
        let Some(file) = file else { return Ok(()) };
        let data = serde_json::to_vec(info)?;
        self.write(file, &data)
    }

    /// Read a cached manifest
    ///
    /// An entry beginning with the legacy auto-generated prefix is treated
    /// as absent so it gets regenerated.
    pub fn read_go_mod(&self, path: &str, rev: &str) -> Lookup<Vec<u8>> {
        match self.read(path, rev, "mod") {
            Lookup::Hit { file, value } if value.starts_with(LEGACY_MANIFEST_PREFIX) => {
                debug!("ignoring legacy manifest {}", file.display());
                Lookup::Miss { file: Some(file) }
            }
            other => other,
        }
    }

    /// Write a manifest cache entry; no-op when `file` is `None`
    pub fn write_go_mod(&self, file: Option<&Path>, data: &[u8]) -> QuarryResult<()> {
        let Some(file) = file else { return Ok(()) };
        self.write(file, data)
    }
}
