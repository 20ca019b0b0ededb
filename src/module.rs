//! Module identity and revision metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::version;

/// Identity of a module at an exact version
///
/// `path` is an opaque slash-delimited hierarchical identifier. `version`
/// is a canonical version, or a lockfile key such as `v1.0.0/go.mod` for
/// the manifest hash of that version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    pub path: String,
    pub version: String,
}

impl ModuleId {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

/// Metadata for a resolved revision
///
/// Serialized as JSON for the on-disk `.info` artifacts; field names and
/// the RFC 3339 time format are fixed by the cache layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RevInfo {
    /// Canonical version for this revision
    pub version: String,
    /// Full commit identifier
    pub name: String,
    /// Abbreviated commit identifier
    pub short: String,
    /// Commit time
    pub time: DateTime<Utc>,
}

/// Ordering used for lockfile serialization: path lexically, then version
///
/// A version may carry a `/file` suffix (manifest lockfile keys); the
/// semver prefix orders first so `v1.0.0` sorts before `v1.0.0/go.mod`
/// and after `v0.9.0/go.mod`.
pub fn compare(a: &ModuleId, b: &ModuleId) -> Ordering {
    a.path.cmp(&b.path).then_with(|| {
        let (va, fa) = split_version(&a.version);
        let (vb, fb) = split_version(&b.version);
        version::compare(va, vb)
            .then_with(|| va.cmp(vb))
            .then_with(|| fa.cmp(fb))
    })
}

fn split_version(v: &str) -> (&str, &str) {
    match v.find('/') {
        Some(i) => (&v[..i], &v[i..]),
        None => (v, ""),
    }
}
