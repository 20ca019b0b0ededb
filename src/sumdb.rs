//! Project-wide integrity store mirroring the lockfile
//!
//! Loads lazily on first verification, records a hash for every module the
//! project touches, and rewrites the lockfile at shutdown only when its
//! canonical serialization changed. A mismatch against a recorded
//! algorithm-1 hash aborts: the lockfile is a safety gate, not an advisory.

use crate::cache::DiskCache;
use crate::error::{QuarryError, QuarryResult};
use crate::hash;
use crate::module::{self, ModuleId};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Integrity store backed by the project lockfile (`<project>.sum`)
///
/// Shared project-wide: one instance verifies every module the project
/// uses, with all checks serialized under its lock.
pub struct SumDb {
    file: Option<PathBuf>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Recorded hashes per module; `None` until first use
    map: Option<HashMap<ModuleId, Vec<String>>>,
    /// Legacy sibling file migrated into the map, deleted at flush
    legacy: Option<PathBuf>,
}

impl SumDb {
    /// Create a store over the given lockfile; `None` disables verification
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            file,
            state: Mutex::new(State::default()),
        }
    }

    /// Load the lockfile on first use; returns the map, or `None` when
    /// verification is disabled. Must be called with the state lock held.
    fn loaded<'a>(&self, state: &'a mut State) -> Option<&'a mut HashMap<ModuleId, Vec<String>>> {
        let file = self.file.as_deref()?;
        if state.map.is_none() {
            let mut map = HashMap::new();
            match fs::read_to_string(file) {
                Ok(data) => parse_sum(file, &data, &mut map),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => panic!("quarry: reading {}: {e}", file.display()),
            }

            // Migrate the legacy verification file; it is removed by the
            // next flush.
            let alt = legacy_path(file);
            if let Ok(data) = fs::read_to_string(&alt) {
                debug!("migrating legacy verification file {}", alt.display());
                parse_sum(&alt, &data, &mut map);
                state.legacy = Some(alt);
            }
            state.map = Some(map);
        }
        state.map.as_mut()
    }

    /// Verify hash `h` for `id`, recording it if previously unseen
    ///
    /// Aborts with a diagnostic naming the module and both hashes when `h`
    /// conflicts with a recorded algorithm-1 hash.
    pub fn check_one(&self, id: &ModuleId, h: &str) {
        let mut state = self.state.lock().expect("sumdb lock poisoned");
        let Some(map) = self.loaded(&mut state) else {
            return;
        };

        let recorded = map.entry(id.clone()).or_default();
        for vh in recorded.iter() {
            if vh == h {
                return;
            }
            if vh.starts_with(hash::PREFIX) {
                panic!(
                    "quarry: verifying {id}: checksum mismatch\n\tdownloaded: {h}\n\tlockfile:   {vh}"
                );
            }
        }
        if !recorded.is_empty() {
            eprintln!(
                "quarry: warning: verifying {id}: unknown hashes in lockfile: {}; adding {h}",
                recorded.join(", ")
            );
        }
        recorded.push(h.to_string());
        debug!("recorded {id} {h}");
    }

    /// Verify the downloaded zip for `id` against its recorded hash
    ///
    /// A missing `.ziphash` file is tolerated: an extracted tree can exist
    /// without download metadata.
    pub fn check_zip(&self, id: &ModuleId, disk: &DiskCache) {
        let Some(file) = disk.artifact_file(&id.path, &id.version, "ziphash") else {
            return;
        };
        let data = match fs::read_to_string(&file) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => panic!("quarry: verifying {id}: {e}"),
        };
        let h = data.trim();
        if !h.starts_with(hash::PREFIX) {
            panic!("quarry: verifying {id}: unexpected ziphash: {h:?}");
        }
        self.check_one(id, h);
    }

    /// Verify manifest bytes for `(path, version)` against the lockfile
    pub fn check_manifest(&self, path: &str, version: &str, data: &[u8]) {
        let h = hash::hash_manifest(data);
        self.check_one(&ModuleId::new(path, format!("{version}/go.mod")), &h);
    }

    /// Rewrite the lockfile if its canonical serialization changed, then
    /// remove the migrated legacy file
    ///
    /// Serialization is deterministic: modules in path-then-version order,
    /// each hash list ascending, one `path version hash` line each.
    pub fn flush(&self) -> QuarryResult<()> {
        let mut state = self.state.lock().expect("sumdb lock poisoned");
        let Some(file) = self.file.as_deref() else {
            return Ok(());
        };
        let Some(map) = self.loaded(&mut state) else {
            return Ok(());
        };

        let mut entries: Vec<(ModuleId, Vec<String>)> =
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| module::compare(&a.0, &b.0));

        let mut buf = String::new();
        for (id, mut hashes) in entries {
            hashes.sort();
            for h in hashes {
                buf.push_str(&format!("{} {} {h}\n", id.path, id.version));
            }
        }

        if fs::read(file).unwrap_or_default() != buf.as_bytes() {
            fs::write(file, buf.as_bytes())
                .map_err(|e| QuarryError::io(format!("writing {}", file.display()), e))?;
            debug!("rewrote {}", file.display());
        }

        if let Some(legacy) = state.legacy.take() {
            let _ = fs::remove_file(&legacy);
        }
        Ok(())
    }
}

/// Parse lockfile lines (`path version hash` triples) into `map`
///
/// Blank lines are skipped; duplicate keys append; any other field count
/// aborts with a file:line diagnostic.
fn parse_sum(file: &Path, data: &str, map: &mut HashMap<ModuleId, Vec<String>>) {
    for (lineno, line) in data.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [path, ver, h] => map
                .entry(ModuleId::new(*path, *ver))
                .or_default()
                .push((*h).to_string()),
            _ => panic!(
                "quarry: malformed lockfile:\n{}:{}: wrong number of fields {}",
                file.display(),
                lineno + 1,
                fields.len()
            ),
        }
    }
}

/// Legacy verification file sibling to the lockfile (`<base>.modverify`)
fn legacy_path(sum_file: &Path) -> PathBuf {
    let s = sum_file.to_string_lossy();
    match s.strip_suffix(".sum") {
        Some(base) => PathBuf::from(format!("{base}.modverify")),
        None => PathBuf::from(format!("{s}.modverify")),
    }
}
