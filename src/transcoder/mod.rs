//! Transcode orchestration
//!
//! [`Transcoder`] is the single service object that owns the artifact
//! index, the single-flight locks and the encoder. Create one at startup and
//! clone the handle into every request.
//!
//! Serving a job runs, under the job's fingerprint lock:
//!
//! 1. index lookup
//! 2. disk probe of the canonical artifact path (re-indexes on hit)
//! 3. encode into a staging file, publish, index
//!
//! Callers that stream the artifact should hold an [`ArtifactLease`] (or
//! call `protect`/`unprotect` themselves) until they are done, so eviction
//! cannot delete the file underneath them.

mod service;

pub use service::{Transcoder, TranscoderStats};

use crate::cache::ProtectionGuard;
use crate::job::Fingerprint;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// How a served artifact was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServeOutcome {
    /// Found in the index
    CacheHit,
    /// Found on disk and re-indexed
    Rehydrated,
    /// Produced by the encoder for this request
    Encoded,
}

impl fmt::Display for ServeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CacheHit => "cache hit",
            Self::Rehydrated => "rehydrated",
            Self::Encoded => "encoded",
        };
        write!(f, "{}", name)
    }
}

/// A finished artifact ready to be streamed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub fingerprint: Fingerprint,
    pub path: PathBuf,
    /// Content-type hint for the response
    pub content_type: &'static str,
    pub outcome: ServeOutcome,
}

/// An artifact that stays exempt from deletion while the lease lives
#[derive(Debug)]
pub struct ArtifactLease {
    artifact: Artifact,
    _protection: ProtectionGuard,
}

impl ArtifactLease {
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn path(&self) -> &std::path::Path {
        &self.artifact.path
    }
}

impl std::ops::Deref for ArtifactLease {
    type Target = Artifact;

    fn deref(&self) -> &Artifact {
        &self.artifact
    }
}
