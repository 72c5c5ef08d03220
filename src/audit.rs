//! Audit journal for encode events
//!
//! Each produced or failed artifact becomes one JSON line in
//! `~/.local/state/segforge/audit.log`, keyed by fingerprint. Opt-in via
//! `general.audit_log`.

use crate::config::{schema::Config, ConfigManager};
use crate::job::Fingerprint;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Something that happened to an artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuditEvent {
    EncodeCompleted {
        source: String,
        profile: String,
        window: String,
        path: PathBuf,
    },
    EncodeFailed {
        source: String,
        error: String,
    },
    /// An artifact left by an earlier process was re-indexed
    ArtifactRehydrated { path: PathBuf },
}

impl AuditEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EncodeCompleted { .. } => "encode.completed",
            Self::EncodeFailed { .. } => "encode.failed",
            Self::ArtifactRehydrated { .. } => "artifact.rehydrated",
        }
    }
}

#[derive(Serialize)]
struct Entry<'a> {
    timestamp: String,
    event: &'static str,
    fingerprint: &'a Fingerprint,
    data: &'a AuditEvent,
}

/// Append-only journal of artifact events
#[derive(Debug, Clone)]
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(),
        }
    }

    /// Journal writing to an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            path: path.into(),
        }
    }

    /// Record `event` for `fingerprint`.
    ///
    /// IO and serialization failures are logged and dropped; the journal
    /// never fails a request.
    pub async fn record(&self, fingerprint: &Fingerprint, event: AuditEvent) {
        if !self.enabled {
            return;
        }

        let entry = Entry {
            timestamp: Utc::now().to_rfc3339(),
            event: event.name(),
            fingerprint,
            data: &event,
        };

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize {} audit entry: {}", event.name(), e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
