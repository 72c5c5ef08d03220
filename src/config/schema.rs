//! Configuration schema for segforge
//!
//! Configuration is stored at `~/.config/segforge/config.toml`

use crate::job::Profile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Artifact cache settings
    pub cache: CacheConfig,

    /// External encoder settings
    pub encoder: EncoderConfig,

    /// Extra or overriding encoding profiles, keyed by name
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Check values serde cannot constrain, returning the first problem
    pub fn problems(&self) -> Option<String> {
        if self.cache.capacity == 0 {
            return Some("cache.capacity must be at least 1".to_string());
        }
        if !self.encoder.init_probe_secs.is_finite() || self.encoder.init_probe_secs <= 0.0 {
            return Some("encoder.init_probe_secs must be positive".to_string());
        }
        if self.encoder.binary.trim().is_empty() {
            return Some("encoder.binary must not be empty".to_string());
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Some(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        None
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Append encode events to the audit journal
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: false,
        }
    }
}

/// Artifact cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of indexed artifacts
    pub capacity: usize,

    /// Directory holding artifacts (default: system temp dir)
    pub artifact_dir: Option<PathBuf>,

    /// Reap idle fingerprint locks once the table grows past this size
    /// (0 = never)
    pub lock_reap_threshold: usize,
}

impl CacheConfig {
    /// Resolved artifact directory
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("segforge"))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            artifact_dir: None,
            lock_reap_threshold: 0,
        }
    }
}

/// External encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder executable
    pub binary: String,

    /// Video encoder speed preset
    pub preset: String,

    /// Output pixel format
    pub pixel_format: String,

    /// Seconds of media encoded for init segments
    pub init_probe_secs: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            preset: "ultrafast".to_string(),
            pixel_format: "yuv420p".to_string(),
            init_probe_secs: 0.1,
        }
    }
}
