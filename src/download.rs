//! Zip download, verification and extraction into the module cache
//!
//! Fetches run backend zip → shape check → hash → lockfile check → atomic
//! install. Verification happens before publication, so the durable cache
//! is either empty or complete; a failure leaves only a temp file behind.

use crate::cache::DiskCache;
use crate::config::Config;
use crate::error::{QuarryError, QuarryResult};
use crate::hash;
use crate::module::ModuleId;
use crate::repo::Repo;
use crate::sumdb::SumDb;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use zip::ZipArchive;

/// Fetches module archives into the extracted-tree cache
pub struct Downloader {
    root: PathBuf,
    disk: DiskCache,
    sums: Arc<SumDb>,
    quiet: bool,
}

impl Downloader {
    /// Create a downloader; requires a configured cache root
    pub fn new(config: &Config, sums: Arc<SumDb>) -> QuarryResult<Self> {
        let root = config.cache_root.clone().ok_or(QuarryError::NoCacheRoot)?;
        Ok(Self {
            disk: DiskCache::new(Some(root.clone())),
            root,
            sums,
            quiet: config.quiet,
        })
    }

    /// Download `id` into the local cache, returning the root of the
    /// module's extracted file tree
    ///
    /// The zip is fetched only when neither the extracted tree nor the
    /// cached archive exists. The extracted tree is always verified against
    /// the lockfile before returning.
    pub async fn download(&self, id: &ModuleId, repo: &dyn Repo) -> QuarryResult<PathBuf> {
        let tree = format!("{}@{}", id.path, id.version);
        let dir = self.root.join(&tree);
        if dir_is_empty(&dir) {
            let zipfile = self
                .root
                .join("cache/download")
                .join(&id.path)
                .join("@v")
                .join(format!("{}.zip", id.version));
            if zipfile.exists() {
                // Preinitialized cache, or the extracted tree was removed
                // while the download was kept.
                if !self.quiet {
                    eprintln!("quarry: extracting {} {}", id.path, id.version);
                }
            } else {
                if let Some(parent) = zipfile.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| QuarryError::io(format!("creating {}", parent.display()), e))?;
                }
                if !self.quiet {
                    eprintln!("quarry: downloading {} {}", id.path, id.version);
                }
                self.download_zip(id, repo, &zipfile).await?;
            }
            unpack(&dir, &zipfile, &tree)?;
        }
        self.sums.check_zip(id, &self.disk);
        Ok(dir)
    }

    /// Fetch, verify and install the zip for `id` at `target`
    async fn download_zip(&self, id: &ModuleId, repo: &dyn Repo, target: &Path) -> QuarryResult<()> {
        let tmpfile = repo.zip(&id.version, &std::env::temp_dir()).await?;
        // Removed on every exit path; only the verified copy survives.
        let tmpfile = tempfile::TempPath::from_path(tmpfile);

        // Double-check the archive shape before trusting it.
        let file = fs::File::open(&tmpfile)
            .map_err(|e| QuarryError::io(format!("opening {}", tmpfile.display()), e))?;
        let archive = ZipArchive::new(file)?;
        let prefix = format!("{}@{}", id.path, id.version);
        for name in archive.file_names() {
            if !name.starts_with(&prefix) {
                return Err(QuarryError::ZipShape {
                    module: id.to_string(),
                    entry: name.to_string(),
                });
            }
        }
        drop(archive);

        let h = hash::hash_zip(&tmpfile)?;
        // Check before installing the zip file.
        self.sums.check_one(id, &h);

        fs::copy(&tmpfile, target)
            .map_err(|e| QuarryError::io(format!("copying to {}", target.display()), e))?;
        let mut hashfile = target.as_os_str().to_owned();
        hashfile.push("hash");
        let hashfile = PathBuf::from(hashfile);
        fs::write(&hashfile, &h)
            .map_err(|e| QuarryError::io(format!("writing {}", hashfile.display()), e))?;
        debug!("downloaded {id} ({h})");
        Ok(())
    }

    /// The recorded checksum for the downloaded copy of `id`, if present in
    /// the download cache
    pub fn sum(&self, id: &ModuleId) -> Option<String> {
        let file = self.disk.artifact_file(&id.path, &id.version, "ziphash")?;
        let data = fs::read_to_string(file).ok()?;
        Some(data.trim().to_string())
    }
}

fn dir_is_empty(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Extract `zipfile` into `dir`, stripping the `<path>@<version>` prefix
/// from entry names. Entries outside the prefix or containing `..` path
/// segments are rejected.
fn unpack(dir: &Path, zipfile: &Path, prefix: &str) -> QuarryResult<()> {
    let file = fs::File::open(zipfile)
        .map_err(|e| QuarryError::io(format!("opening {}", zipfile.display()), e))?;
    let mut archive = ZipArchive::new(file)?;
    fs::create_dir_all(dir).map_err(|e| QuarryError::io(format!("creating {}", dir.display()), e))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let rel = name
            .strip_prefix(prefix)
            .map(|r| r.trim_start_matches('/'))
            .ok_or_else(|| QuarryError::ZipShape {
                module: prefix.to_string(),
                entry: name.clone(),
            })?;
        if rel.split('/').any(|seg| seg == "..") {
            return Err(QuarryError::ZipShape {
                module: prefix.to_string(),
                entry: name.clone(),
            });
        }

        let dest = dir.join(rel);
        if rel.is_empty() || entry.is_dir() {
            fs::create_dir_all(&dest)
                .map_err(|e| QuarryError::io(format!("creating {}", dest.display()), e))?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QuarryError::io(format!("creating {}", parent.display()), e))?;
        }
        let mut out = fs::File::create(&dest)
            .map_err(|e| QuarryError::io(format!("creating {}", dest.display()), e))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| QuarryError::io(format!("extracting {name}"), e))?;
    }
    Ok(())
}
