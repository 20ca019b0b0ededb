//! Quarry - module artifact cache and integrity layer
//!
//! Sits between a dependency resolver and a family of version-control
//! backends, turning "metadata / manifest / source tree for module `P` at
//! revision `R`" requests into cached, integrity-verified local artifacts.
//! Duplicate concurrent requests collapse onto one backend call, revision
//! aliases resolve to canonical versions, and a cryptographic lockfile
//! pins the content hash of every module the project has ever used.

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod hash;
pub mod module;
pub mod repo;
pub mod sumdb;
pub mod version;

pub use config::Config;
pub use download::Downloader;
pub use error::{QuarryError, QuarryResult};
pub use module::{ModuleId, RevInfo};
pub use repo::{CachingRepo, Repo};
pub use sumdb::SumDb;
