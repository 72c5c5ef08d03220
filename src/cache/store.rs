//! On-disk artifact namespace
//!
//! Artifacts live flat in one directory, named `<fingerprint>.<ext>`. The
//! encoder writes to `<fingerprint>.partial.<ext>` and the file is renamed
//! into place only once complete, so anything found under a canonical name
//! is a finished artifact.

use crate::cache::lru::EvictionHandler;
use crate::error::{SegforgeError, SegforgeResult};
use crate::job::{Container, Fingerprint};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const STAGING_MARKER: &str = ".partial";

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// A finished artifact found on disk
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub fingerprint: Fingerprint,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Owner of the artifact directory and its naming contract
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the artifact directory if needed
    pub async fn ensure_dir(&self) -> SegforgeResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            SegforgeError::storage(
                format!("creating artifact directory {}", self.root.display()),
                e,
            )
        })
    }

    /// Where the finished artifact for a fingerprint lives
    pub fn canonical_path(&self, fingerprint: &Fingerprint, container: Container) -> PathBuf {
        self.root
            .join(format!("{}.{}", fingerprint, container.extension()))
    }

    /// Where the encoder writes before the artifact is published
    pub fn staging_path(&self, fingerprint: &Fingerprint, container: Container) -> PathBuf {
        self.root.join(format!(
            "{}{}.{}",
            fingerprint,
            STAGING_MARKER,
            container.extension()
        ))
    }

    /// Whether a complete artifact exists at `path`
    pub async fn probe(&self, path: &Path) -> SegforgeResult<bool> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SegforgeError::storage(
                format!("probing artifact {}", path.display()),
                e,
            )),
        }
    }

    /// Move a finished staging file to its canonical name
    pub async fn publish(&self, staging: &Path, canonical: &Path) -> SegforgeResult<()> {
        if !self.probe(staging).await? {
            return Err(SegforgeError::ArtifactMissing(staging.to_path_buf()));
        }

        fs::rename(staging, canonical).await.map_err(|e| {
            SegforgeError::storage(
                format!(
                    "publishing {} to {}",
                    staging.display(),
                    canonical.display()
                ),
                e,
            )
        })?;

        debug!("Published {}", canonical.display());
        Ok(())
    }

    /// Remove a file, ignoring failures
    pub async fn discard(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    /// List finished artifacts, skipping staging files and foreign names
    pub async fn list(&self) -> SegforgeResult<Vec<StoredArtifact>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SegforgeError::storage("reading artifact directory", e)),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SegforgeError::storage("reading artifact entry", e))?
        {
            let path = entry.path();
            let Some(fingerprint) = Self::parse_name(&path) else {
                continue;
            };
            let meta = entry
                .metadata()
                .await
                .map_err(|e| SegforgeError::storage(format!("stat {}", path.display()), e))?;
            if !meta.is_file() {
                continue;
            }

            let modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            artifacts.push(StoredArtifact {
                fingerprint,
                path,
                size_bytes: meta.len(),
                modified,
            });
        }

        artifacts.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(artifacts)
    }

    /// Remove every artifact and staging file, returning how many were removed
    pub async fn clear(&self) -> SegforgeResult<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(SegforgeError::storage("reading artifact directory", e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SegforgeError::storage("reading artifact entry", e))?
        {
            let path = entry.path();
            if Self::parse_name(&path).is_none() && !Self::is_staging(&path) {
                continue;
            }
            fs::remove_file(&path)
                .await
                .map_err(|e| SegforgeError::storage(format!("removing {}", path.display()), e))?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Fingerprint of a canonical artifact name
    fn parse_name(path: &Path) -> Option<Fingerprint> {
        let ext = path.extension()?.to_str()?;
        if ext != "mp4" && ext != "ts" {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok()
    }

    fn is_staging(path: &Path) -> bool {
        path.file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.ends_with(STAGING_MARKER))
    }
}

impl EvictionHandler for ArtifactStore {
    fn on_evict(&self, fingerprint: &Fingerprint, location: &Path) {
        match std::fs::remove_file(location) {
            Ok(()) => debug!("Deleted evicted artifact {}", fingerprint.short()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to delete evicted artifact {}: {}",
                location.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::sample_fingerprint;
    use tempfile::TempDir;

    fn store() -> (ArtifactStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (ArtifactStore::new(dir.path()), dir)
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn naming_contract() {
        let (store, dir) = store();
        let fp = sample_fingerprint(10.0, 5.0);

        let mp4 = store.canonical_path(&fp, Container::Mp4);
        assert_eq!(mp4, dir.path().join(format!("{}.mp4", fp)));

        let ts = store.canonical_path(&fp, Container::MpegTs);
        assert_eq!(ts.extension().unwrap(), "ts");

        let staging = store.staging_path(&fp, Container::Mp4);
        assert_ne!(staging, mp4);
        assert!(ArtifactStore::is_staging(&staging));
        assert!(ArtifactStore::parse_name(&staging).is_none());
        assert_eq!(ArtifactStore::parse_name(&mp4), Some(fp));
    }

    #[tokio::test]
    async fn probe_ignores_missing_and_empty() {
        let (store, dir) = store();
        let path = dir.path().join("x.mp4");
        assert!(!store.probe(&path).await.unwrap());

        std::fs::write(&path, b"").unwrap();
        assert!(!store.probe(&path).await.unwrap());

        std::fs::write(&path, b"data").unwrap();
        assert!(store.probe(&path).await.unwrap());
    }

    #[tokio::test]
    async fn publish_renames_staging() {
        let (store, _dir) = store();
        let fp = sample_fingerprint(1.0, 2.0);
        let staging = store.staging_path(&fp, Container::Mp4);
        let canonical = store.canonical_path(&fp, Container::Mp4);

        let err = store.publish(&staging, &canonical).await.unwrap_err();
        assert!(matches!(err, SegforgeError::ArtifactMissing(_)));

        std::fs::write(&staging, b"moov").unwrap();
        store.publish(&staging, &canonical).await.unwrap();
        assert!(!staging.exists());
        assert!(store.probe(&canonical).await.unwrap());
    }

    #[tokio::test]
    async fn list_and_clear() {
        let (store, dir) = store();
        let a = sample_fingerprint(1.0, 2.0);
        let b = sample_fingerprint(3.0, 2.0);
        std::fs::write(store.canonical_path(&a, Container::Mp4), b"a").unwrap();
        std::fs::write(store.canonical_path(&b, Container::MpegTs), b"bb").unwrap();
        std::fs::write(store.staging_path(&b, Container::Mp4), b"partial").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|s| s.fingerprint == a && s.size_bytes == 1));

        assert_eq!(store.clear().await.unwrap(), 3);
        assert!(dir.path().join("notes.txt").exists());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_missing_dir_is_empty() {
        let store = ArtifactStore::new("/nonexistent/segforge-artifacts");
        assert!(store.list().await.unwrap().is_empty());
    }

    #[test]
    fn eviction_deletes_file() {
        let (store, dir) = store();
        let fp = sample_fingerprint(1.0, 2.0);
        let path = dir.path().join("victim.mp4");
        std::fs::write(&path, b"x").unwrap();

        store.on_evict(&fp, &path);
        assert!(!path.exists());

        // Already gone: no panic, no error
        store.on_evict(&fp, &path);
    }
}
