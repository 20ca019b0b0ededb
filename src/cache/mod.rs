//! Two-tier caching: durable artifact files plus per-process memoization
//!
//! [`DiskCache`] owns the on-disk artifact layout with atomic publication.
//! [`FlightCache`] collapses duplicate concurrent lookups so each backend
//! call runs at most once per process. The alias index shortcuts
//! commit-hash lookups to already-cached pseudo-versions, avoiding network
//! traffic for commits the cache has already resolved.

mod alias;
mod disk;
mod flight;

pub use disk::{DiskCache, Lookup};
pub use flight::FlightCache;
