//! Algorithm-1 content hashing for module archives and manifests
//!
//! The digest is an outer SHA-256 over one `"<hex>  <name>\n"` line per
//! file, sorted by name, where each line carries the SHA-256 of that
//! file's content. Rendered as `"h1:"` followed by standard base64.

use crate::error::{QuarryError, QuarryResult};
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;
use zip::ZipArchive;

/// Tag of the only hash algorithm trusted for integrity comparison
pub const PREFIX: &str = "h1:";

/// Algorithm-1 hash over the full content of a zip archive
pub fn hash_zip(zipfile: &Path) -> QuarryResult<String> {
    let file = File::open(zipfile)
        .map_err(|e| QuarryError::io(format!("opening {}", zipfile.display()), e))?;
    let mut archive = ZipArchive::new(file)?;

    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();

    let mut outer = Sha256::new();
    for name in &names {
        let mut entry = archive.by_name(name)?;
        let mut inner = Sha256::new();
        io::copy(&mut entry, &mut inner)
            .map_err(|e| QuarryError::io(format!("hashing {name} in {}", zipfile.display()), e))?;
        outer.update(format!("{}  {}\n", hex::encode(inner.finalize()), name));
    }
    Ok(finish(outer))
}

/// Algorithm-1 hash of manifest bytes, as the single virtual file `go.mod`
pub fn hash_manifest(data: &[u8]) -> String {
    let mut inner = Sha256::new();
    inner.update(data);
    let mut outer = Sha256::new();
    outer.update(format!("{}  go.mod\n", hex::encode(inner.finalize())));
    finish(outer)
}

fn finish(outer: Sha256) -> String {
    format!("{PREFIX}{}", general_purpose::STANDARD.encode(outer.finalize()))
}
