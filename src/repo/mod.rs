//! Version-control backend contract and its caching facade
//!
//! A [`Repo`] resolves revisions and produces artifacts for a single
//! module; [`CachingRepo`] wraps one with the disk-first, single-flight
//! caching discipline.

mod facade;

pub use facade::CachingRepo;

use crate::error::QuarryResult;
use crate::module::RevInfo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A version-control backend serving one module
///
/// Implementations wrap a concrete VCS (git, mercurial, an archive server)
/// and may reach the network from any method. They must be safe for
/// simultaneous use by multiple tasks.
#[async_trait]
pub trait Repo: Send + Sync {
    /// Canonical path of the module this backend serves
    fn module_path(&self) -> &str;

    /// Known versions whose string form starts with `prefix`, in
    /// unspecified order
    async fn versions(&self, prefix: &str) -> QuarryResult<Vec<String>>;

    /// Resolve any acceptable revision string (tag, branch, commit hash,
    /// semver) to canonical revision metadata
    async fn stat(&self, rev: &str) -> QuarryResult<RevInfo>;

    /// The most recent commit suitable for a pseudo-version
    async fn latest(&self) -> QuarryResult<RevInfo>;

    /// Manifest bytes for a canonical revision
    async fn go_mod(&self, rev: &str) -> QuarryResult<Vec<u8>>;

    /// Produce a zip archive under `tmpdir` whose entries are all prefixed
    /// `<modulepath>@<version>/`, returning the archive's path
    async fn zip(&self, version: &str, tmpdir: &Path) -> QuarryResult<PathBuf>;
}
