//! Caching facade over a backend repository
//!
//! Routes each operation through the on-disk cache first, the per-process
//! single-flight cache second, and the backend last, cross-populating
//! entries under canonical version keys along the way.

use crate::cache::{DiskCache, FlightCache, Lookup};
use crate::config::Config;
use crate::error::{QuarryError, QuarryResult};
use crate::module::RevInfo;
use crate::sumdb::SumDb;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Repo;

/// Memoized operation results
///
/// One flat keyspace serves every operation so that a resolved revision
/// can seed lookups under its canonical version with a single store. Each
/// record packs the result and the error together: failures are memoized
/// too, so a broken revision does not thrash the backend.
#[derive(Clone)]
enum Cached {
    Versions(Result<Vec<String>, Arc<QuarryError>>),
    Info(Result<RevInfo, Arc<QuarryError>>),
    Manifest(Result<Vec<u8>, Arc<QuarryError>>),
}

/// Cache around an underlying [`Repo`]
///
/// Avoids redundant backend calls for `versions`, `stat`, `latest` and
/// `go_mod` (but not `zip`), and is safe for simultaneous use by multiple
/// tasks, so one instance can be shared per module path.
pub struct CachingRepo {
    path: String,
    backend: Arc<dyn Repo>,
    flight: FlightCache<Cached>,
    disk: DiskCache,
    sums: Arc<SumDb>,
    quiet: bool,
}

impl CachingRepo {
    pub fn new(backend: Arc<dyn Repo>, config: &Config, sums: Arc<SumDb>) -> Self {
        Self {
            path: backend.module_path().to_string(),
            backend,
            flight: FlightCache::new(),
            disk: DiskCache::new(config.cache_root.clone()),
            sums,
            quiet: config.quiet,
        }
    }

    /// Produce a stat result: disk first, then the backend, persisting and
    /// cross-seeding under the canonical version on success.
    async fn stat_fresh(&self, rev: &str) -> QuarryResult<RevInfo> {
        let file = match self.disk.read_stat(&self.path, rev) {
            Lookup::Hit { value, .. } => return Ok(value),
            Lookup::Miss { file } => file,
        };

        if !self.quiet {
            eprintln!("quarry: finding {} {}", self.path, rev);
        }
        let info = self.backend.stat(rev).await?;

        if let Err(e) = self.disk.write_stat(file.as_deref(), &info) {
            eprintln!("quarry: writing stat cache: {e}");
        }
        if info.version != rev {
            // We resolved, say, 1234abcdef to v0.0.0-20180604122334-1234abcdef78.
            // Persist under the canonical version too, so a later lookup by
            // commit hash resolves from disk, and seed the in-process cache
            // under the proper key.
            if let Lookup::Miss { file } = self.disk.read_stat(&self.path, &info.version) {
                let _ = self.disk.write_stat(file.as_deref(), &info);
            }
            let seed = Cached::Info(Ok(info.clone()));
            self.flight
                .do_once(&format!("stat:{}", info.version), || async move { seed })
                .await;
        }
        Ok(info)
    }

    /// Produce a manifest: disk first (verifying cached bytes against the
    /// lockfile), then the backend under the canonical version.
    async fn go_mod_fresh(&self, rev: &str) -> QuarryResult<Vec<u8>> {
        let file = match self.disk.read_go_mod(&self.path, rev) {
            Lookup::Hit { value, .. } => {
                self.sums.check_manifest(&self.path, rev, &value);
                return Ok(value);
            }
            Lookup::Miss { file } => file,
        };

        // Convert rev to the canonical version so the lockfile check below
        // uses the right identifier.
        let info = self.stat(rev).await?;
        let rev = info.version;

        let data = self.backend.go_mod(&rev).await?;
        self.sums.check_manifest(&self.path, &rev, &data);
        if let Err(e) = self.disk.write_go_mod(file.as_deref(), &data) {
            eprintln!("quarry: writing manifest cache: {e}");
        }
        Ok(data)
    }
}

#[async_trait]
impl Repo for CachingRepo {
    fn module_path(&self) -> &str {
        &self.path
    }

    async fn versions(&self, prefix: &str) -> QuarryResult<Vec<String>> {
        let c = self
            .flight
            .do_once(&format!("versions:{prefix}"), || async {
                Cached::Versions(self.backend.versions(prefix).await.map_err(Arc::new))
            })
            .await;
        let Cached::Versions(res) = c else {
            unreachable!("versions key holds a non-versions record")
        };
        res.map_err(QuarryError::Shared)
    }

    async fn stat(&self, rev: &str) -> QuarryResult<RevInfo> {
        let c = self
            .flight
            .do_once(&format!("stat:{rev}"), || async {
                Cached::Info(self.stat_fresh(rev).await.map_err(Arc::new))
            })
            .await;
        let Cached::Info(res) = c else {
            unreachable!("stat key holds a non-stat record")
        };
        res.map_err(QuarryError::Shared)
    }

    async fn latest(&self) -> QuarryResult<RevInfo> {
        let c = self
            .flight
            .do_once("latest:", || async {
                if !self.quiet {
                    eprintln!("quarry: finding {} latest", self.path);
                }
                match self.backend.latest().await {
                    Ok(info) => {
                        // Seed the likely future stat call and make sure the
                        // canonical version has a disk entry.
                        let seed = Cached::Info(Ok(info.clone()));
                        self.flight
                            .do_once(&format!("stat:{}", info.version), || async move { seed })
                            .await;
                        if let Lookup::Miss { file } = self.disk.read_stat(&self.path, &info.version)
                        {
                            let _ = self.disk.write_stat(file.as_deref(), &info);
                        }
                        Cached::Info(Ok(info))
                    }
                    Err(e) => Cached::Info(Err(Arc::new(e))),
                }
            })
            .await;
        let Cached::Info(res) = c else {
            unreachable!("latest key holds a non-stat record")
        };
        res.map_err(QuarryError::Shared)
    }

    async fn go_mod(&self, rev: &str) -> QuarryResult<Vec<u8>> {
        let c = self
            .flight
            .do_once(&format!("gomod:{rev}"), || async {
                Cached::Manifest(self.go_mod_fresh(rev).await.map_err(Arc::new))
            })
            .await;
        let Cached::Manifest(res) = c else {
            unreachable!("gomod key holds a non-manifest record")
        };
        res.map_err(QuarryError::Shared)
    }

    async fn zip(&self, version: &str, tmpdir: &Path) -> QuarryResult<PathBuf> {
        self.backend.zip(version, tmpdir).await
    }
}
