//! Artifact caching
//!
//! Two layers keep transcoded artifacts around:
//!
//! - [`ProtectedLruCache`]: bounded in-memory index of fingerprint to
//!   artifact path, evicting least recently used entries
//! - [`ArtifactStore`]: the on-disk namespace the index points into
//!
//! # Eviction and protection
//!
//! | Evicted entry | Index | Artifact file |
//! |---------------|-------|---------------|
//! | Unprotected | removed | deleted |
//! | Protected | removed | kept, re-indexed by the next disk probe |

pub mod lru;
pub mod store;

pub use lru::{CacheStats, EvictionHandler, ProtectedLruCache, ProtectionGuard};
pub use store::{format_bytes, ArtifactStore, StoredArtifact};
