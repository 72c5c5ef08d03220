//! The transcoder service

use crate::audit::{AuditEvent, AuditLog};
use crate::cache::{ArtifactStore, CacheStats, ProtectedLruCache};
use crate::config::schema::{Config, EncoderConfig};
use crate::encoder::{EncodePlan, Encoder, FfmpegEncoder};
use crate::error::{SegforgeError, SegforgeResult};
use crate::flight::LockRegistry;
use crate::job::{Fingerprint, Job};
use crate::transcoder::{Artifact, ArtifactLease, ServeOutcome};
use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters and sizes of a running transcoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscoderStats {
    pub cache: CacheStats,
    /// Fingerprints with a lock entry
    pub locks: usize,
    pub hits: u64,
    pub rehydrations: u64,
    pub encodes: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    rehydrations: AtomicU64,
    encodes: AtomicU64,
    failures: AtomicU64,
}

struct Shared {
    cache: Arc<ProtectedLruCache>,
    locks: LockRegistry,
    store: ArtifactStore,
    encoder: Arc<dyn Encoder>,
    settings: EncoderConfig,
    audit: AuditLog,
    lock_reap_threshold: usize,
    counters: Counters,
}

/// Cloneable handle to the process-wide transcoder
#[derive(Clone)]
pub struct Transcoder {
    shared: Arc<Shared>,
}

impl Transcoder {
    /// Build a transcoder from config with the given encoder
    pub fn new(config: &Config, encoder: Arc<dyn Encoder>) -> Self {
        let store = ArtifactStore::new(config.cache.artifact_dir());
        let cache = Arc::new(ProtectedLruCache::new(
            config.cache.capacity,
            Arc::new(store.clone()),
        ));

        Self {
            shared: Arc::new(Shared {
                cache,
                locks: LockRegistry::new(),
                store,
                encoder,
                settings: config.encoder.clone(),
                audit: AuditLog::new(config),
                lock_reap_threshold: config.cache.lock_reap_threshold,
                counters: Counters::default(),
            }),
        }
    }

    /// Build a transcoder that runs the configured ffmpeg binary
    pub fn from_config(config: &Config) -> Self {
        let encoder = Arc::new(FfmpegEncoder::new(config.encoder.binary.clone()));
        Self::new(config, encoder)
    }

    /// Produce or fetch the artifact for `job`.
    ///
    /// Concurrent calls for the same fingerprint run one at a time, and only
    /// the first to find neither an index entry nor a file on disk encodes.
    /// The work runs on its own task: dropping this future does not cancel an
    /// encode that has started.
    pub async fn serve(&self, job: &Job) -> SegforgeResult<Artifact> {
        let shared = Arc::clone(&self.shared);
        let job = job.clone();

        let result = tokio::spawn(async move { shared.produce(job).await })
            .await
            .map_err(|e| SegforgeError::TaskFailed(e.to_string()))?;

        self.maybe_reap_locks();
        result
    }

    /// Protect the job's artifact, then serve it.
    ///
    /// Protection ends when the lease is dropped, or immediately if serving
    /// fails.
    pub async fn checkout(&self, job: &Job) -> SegforgeResult<ArtifactLease> {
        let protection = self.shared.cache.protect_guard(self.fingerprint(job));
        let artifact = self.serve(job).await?;
        Ok(ArtifactLease {
            artifact,
            _protection: protection,
        })
    }

    /// Serve several jobs concurrently, results in input order
    pub async fn prefetch(&self, jobs: &[Job]) -> Vec<SegforgeResult<Artifact>> {
        join_all(jobs.iter().map(|job| self.serve(job))).await
    }

    /// Identity of `job` under this transcoder's encoder settings
    pub fn fingerprint(&self, job: &Job) -> Fingerprint {
        job.fingerprint(&self.shared.settings)
    }

    /// Exempt a fingerprint's artifact from deletion until `unprotect`
    pub fn protect(&self, fingerprint: &Fingerprint) {
        self.shared.cache.protect(fingerprint);
    }

    pub fn unprotect(&self, fingerprint: &Fingerprint) {
        self.shared.cache.unprotect(fingerprint);
    }

    /// Indexed artifact location, without touching disk
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<PathBuf> {
        self.shared.cache.get(fingerprint)
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.shared.store
    }

    pub fn cache(&self) -> &ProtectedLruCache {
        &self.shared.cache
    }

    pub fn stats(&self) -> TranscoderStats {
        let c = &self.shared.counters;
        TranscoderStats {
            cache: self.shared.cache.stats(),
            locks: self.shared.locks.len(),
            hits: c.hits.load(Ordering::Relaxed),
            rehydrations: c.rehydrations.load(Ordering::Relaxed),
            encodes: c.encodes.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
        }
    }

    fn maybe_reap_locks(&self) {
        let threshold = self.shared.lock_reap_threshold;
        if threshold > 0 && self.shared.locks.len() > threshold {
            self.shared.locks.reap_idle();
        }
    }
}

impl Shared {
    async fn produce(&self, job: Job) -> SegforgeResult<Artifact> {
        let fingerprint = job.fingerprint(&self.settings);
        let _flight = self.locks.acquire(fingerprint).await;

        let artifact = |path: PathBuf, outcome: ServeOutcome| Artifact {
            fingerprint,
            path,
            content_type: job.container.content_type(),
            outcome,
        };

        if let Some(path) = self.cache.get(&fingerprint) {
            debug!("Cache hit for {}", fingerprint.short());
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(artifact(path, ServeOutcome::CacheHit));
        }

        let canonical = self.store.canonical_path(&fingerprint, job.container);
        let on_disk = self
            .store
            .probe(&canonical)
            .await
            .inspect_err(|_| {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
            })?;

        if on_disk {
            debug!("Rehydrating {} from {}", fingerprint.short(), canonical.display());
            self.cache.put(fingerprint, canonical.clone());
            self.counters.rehydrations.fetch_add(1, Ordering::Relaxed);
            self.audit
                .record(
                    &fingerprint,
                    AuditEvent::ArtifactRehydrated {
                        path: canonical.clone(),
                    },
                )
                .await;
            return Ok(artifact(canonical, ServeOutcome::Rehydrated));
        }

        match self.encode(&job, &fingerprint, &canonical).await {
            Ok(()) => {
                self.cache.put(fingerprint, canonical.clone());
                self.counters.encodes.fetch_add(1, Ordering::Relaxed);
                self.audit
                    .record(
                        &fingerprint,
                        AuditEvent::EncodeCompleted {
                            source: job.url.clone(),
                            profile: job.profile.name.clone(),
                            window: job.window.to_string(),
                            path: canonical.clone(),
                        },
                    )
                    .await;
                Ok(artifact(canonical, ServeOutcome::Encoded))
            }
            Err(e) => {
                warn!("Encode of {} failed: {}", fingerprint.short(), e);
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                self.audit
                    .record(
                        &fingerprint,
                        AuditEvent::EncodeFailed {
                            source: job.url.clone(),
                            error: e.to_string(),
                        },
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Run the encoder into a staging file and publish it
    async fn encode(
        &self,
        job: &Job,
        fingerprint: &Fingerprint,
        canonical: &std::path::Path,
    ) -> SegforgeResult<()> {
        self.store.ensure_dir().await?;

        let staging = self.store.staging_path(fingerprint, job.container);
        let plan = EncodePlan::derive(job, &self.settings, staging.clone());

        info!(
            "Encoding {} with {} ({} {} {})",
            fingerprint.short(),
            self.encoder.name(),
            job.profile.name,
            job.media,
            job.window
        );

        let result = match self.encoder.encode(&plan).await {
            Ok(()) => self.store.publish(&staging, canonical).await,
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.store.discard(&staging).await;
        }
        result
    }
}
