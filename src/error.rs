//! Error types for segforge
//!
//! All modules use `SegforgeResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for segforge operations
pub type SegforgeResult<T> = Result<T, SegforgeError>;

/// All errors that can occur in segforge
#[derive(Error, Debug)]
pub enum SegforgeError {
    // Job errors
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    // Encoder errors
    #[error("Encode failed for {fingerprint}: {diagnostics}")]
    EncodeFailed {
        fingerprint: String,
        diagnostics: String,
    },

    #[error("Encoder reported success but produced no usable artifact at {0}")]
    ArtifactMissing(PathBuf),

    #[error("Failed to launch encoder {binary}")]
    EncoderSpawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    // Storage errors
    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl SegforgeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a storage error with context
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Create an encode failure carrying the encoder's diagnostic output
    pub fn encode_failed(fingerprint: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::EncodeFailed {
            fingerprint: fingerprint.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Whether this error means the artifact could not be produced or stored.
    ///
    /// Encoder and storage failures are handled the same way: nothing is
    /// cached and the next request for the fingerprint encodes afresh.
    pub fn is_encode_failure(&self) -> bool {
        matches!(
            self,
            Self::EncodeFailed { .. }
                | Self::ArtifactMissing(_)
                | Self::EncoderSpawn { .. }
                | Self::Storage { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EncoderSpawn { .. } => {
                Some("Install ffmpeg or set encoder.binary in the config file")
            }
            Self::UnknownProfile(_) => Some("Run: segforge profiles"),
            Self::ConfigInvalid { .. } => Some("Run: segforge config init --force"),
            _ => None,
        }
    }
}
