//! Named encoding presets

use crate::error::{SegforgeError, SegforgeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named set of encoding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Preset name; filled from the table key when loaded from config
    #[serde(default)]
    pub name: String,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Video bitrate in kbit/s
    pub video_bitrate_kbps: u32,
    /// Audio bitrate in kbit/s
    pub audio_bitrate_kbps: u32,
    /// Encoder name for the video stream (e.g. libx264)
    pub video_codec: String,
    /// Encoder name for the audio stream (e.g. aac)
    pub audio_codec: String,
    /// Output frame rate
    pub fps: f64,
    /// Audio sample rate in Hz
    pub audio_sample_rate: u32,
    /// Audio channel count
    #[serde(default = "default_channels")]
    pub audio_channels: u8,
}

fn default_channels() -> u8 {
    2
}

impl Profile {
    fn preset(name: &str, width: u32, height: u32, video_kbps: u32, audio_kbps: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            video_bitrate_kbps: video_kbps,
            audio_bitrate_kbps: audio_kbps,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            fps: 25.0,
            audio_sample_rate: 44_100,
            audio_channels: default_channels(),
        }
    }

    /// Reject parameter sets the encoder cannot honour
    pub fn validate(&self) -> SegforgeResult<()> {
        let invalid = |reason: &str| {
            Err(SegforgeError::InvalidJob(format!(
                "profile '{}': {}",
                self.name, reason
            )))
        };

        if self.width == 0 || self.height == 0 {
            return invalid("resolution must be non-zero");
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return invalid("frame rate must be positive");
        }
        if self.audio_sample_rate == 0 || self.audio_channels == 0 {
            return invalid("audio sample rate and channels must be non-zero");
        }
        if self.video_codec.is_empty() || self.audio_codec.is_empty() {
            return invalid("codec identifiers must be set");
        }
        Ok(())
    }
}

/// Lookup table of known profiles
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileRegistry {
    /// The built-in presets
    pub fn builtin() -> Self {
        let profiles = [
            Profile::preset("720p", 1280, 720, 2200, 128),
            Profile::preset("480p", 854, 480, 1500, 128),
            Profile::preset("360p", 640, 360, 800, 64),
            Profile::preset("240p", 426, 240, 400, 64),
        ]
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect();

        Self { profiles }
    }

    /// Built-in presets overlaid with user-defined ones
    pub fn with_overrides(overrides: &BTreeMap<String, Profile>) -> SegforgeResult<Self> {
        let mut registry = Self::builtin();
        for (name, profile) in overrides {
            let mut profile = profile.clone();
            profile.name = name.clone();
            profile.validate()?;
            registry.profiles.insert(name.clone(), profile);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Look up a profile, failing with `UnknownProfile`
    pub fn resolve(&self, name: &str) -> SegforgeResult<&Profile> {
        self.get(name)
            .ok_or_else(|| SegforgeError::UnknownProfile(name.to_string()))
    }

    /// Profiles in name order
    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
