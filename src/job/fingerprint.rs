//! Deterministic job identity
//!
//! The fingerprint is a SHA256 digest over a canonical, length-prefixed
//! encoding of everything that changes the encoder's output bytes: the job
//! and the encoder settings it is encoded with. Only parameters that reach
//! the encoder are hashed, in the form the encoder sees them. Audio-only jobs
//! ignore video parameters (and the reverse), the container is reduced to its
//! muxer plus whether fragments are emitted, and the init probe length only
//! counts for whole-asset requests. Field order is fixed by this module,
//! floats are hashed by their exact bit pattern, and the profile's display
//! name is left out.

use crate::config::schema::EncoderConfig;
use crate::error::{SegforgeError, SegforgeResult};
use crate::job::{Job, Window};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Bumped whenever the canonical encoding changes
const ENCODING_TAG: &[u8] = b"segforge-job-v2";

/// SHA256 identity of a job
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a job as encoded with `settings`
    pub fn of(job: &Job, settings: &EncoderConfig) -> Self {
        let mut enc = CanonicalEncoder::new();

        enc.str(&job.url);
        match job.window {
            Window::Whole => {
                enc.tag(0);
                enc.f64(settings.init_probe_secs);
            }
            Window::Range { start, duration } => {
                enc.tag(1);
                enc.f64(start);
                enc.f64(duration);
            }
        }

        enc.tag(job.media.tag());
        let p = &job.profile;
        if job.media.has_video() {
            enc.u32(p.width);
            enc.u32(p.height);
            enc.u32(p.video_bitrate_kbps);
            enc.str(&p.video_codec);
            enc.f64(p.fps);
            enc.str(&settings.preset);
            enc.str(&settings.pixel_format);
        }
        if job.media.has_audio() {
            enc.u32(p.audio_bitrate_kbps);
            enc.str(&p.audio_codec);
            enc.u32(p.audio_sample_rate);
            enc.tag(p.audio_channels);
        }

        enc.str(job.container.muxer());
        enc.tag(u8::from(job.wants_fragments()));

        Self(enc.finish())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl FromStr for Fingerprint {
    type Err = SegforgeError;

    fn from_str(s: &str) -> SegforgeResult<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| SegforgeError::InvalidJob(format!("bad fingerprint '{}': {}", s, e)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Length-prefixed field writer feeding the hasher
struct CanonicalEncoder {
    hasher: Sha256,
}

impl CanonicalEncoder {
    fn new() -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ENCODING_TAG);
        Self { hasher }
    }

    fn tag(&mut self, v: u8) {
        self.hasher.update([v]);
    }

    fn u32(&mut self, v: u32) {
        self.hasher.update(v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        // -0.0 and 0.0 mean the same instant
        let v = if v == 0.0 { 0.0 } else { v };
        self.hasher.update(v.to_bits().to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.hasher.update((s.len() as u64).to_le_bytes());
        self.hasher.update(s.as_bytes());
    }

    fn finish(self) -> [u8; 32] {
        let digest = self.hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}
