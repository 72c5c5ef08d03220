//! Transcode job description
//!
//! A [`Job`] is the fully validated request handed to the transcoder: which
//! source to read, which slice of it, and how to encode it. Jobs are
//! immutable and identified by their [`Fingerprint`].

pub mod fingerprint;
pub mod profile;

pub use fingerprint::Fingerprint;
pub use profile::{Profile, ProfileRegistry};

use crate::config::schema::EncoderConfig;
use crate::error::{SegforgeError, SegforgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which elementary streams the output carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSelector {
    /// Video only (audio excluded)
    Video,
    /// Audio only (video excluded)
    Audio,
    /// Both video and audio
    Combined,
}

impl MediaSelector {
    /// Stable tag used in the fingerprint encoding
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Self::Video => 0,
            Self::Audio => 1,
            Self::Combined => 2,
        }
    }

    pub fn has_video(&self) -> bool {
        matches!(self, Self::Video | Self::Combined)
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, Self::Audio | Self::Combined)
    }
}

impl fmt::Display for MediaSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Combined => "combined",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for MediaSelector {
    type Err = SegforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "combined" => Ok(Self::Combined),
            other => Err(SegforgeError::InvalidJob(format!(
                "unknown media selector '{}'",
                other
            ))),
        }
    }
}

/// Output container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Container {
    /// Progressive MP4
    Mp4,
    /// Fragmented MP4 (CMAF-style segments)
    FragmentedMp4,
    /// MPEG transport stream
    MpegTs,
}

impl Container {
    /// ffmpeg muxer that writes this container
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::MpegTs => "mpegts",
            Self::Mp4 | Self::FragmentedMp4 => "mp4",
        }
    }

    /// File extension of artifacts in this container
    pub fn extension(&self) -> &'static str {
        match self {
            Self::MpegTs => "ts",
            Self::Mp4 | Self::FragmentedMp4 => "mp4",
        }
    }

    /// Content-type hint for the file-serving layer
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::MpegTs => "video/MP2T",
            Self::Mp4 | Self::FragmentedMp4 => "video/mp4",
        }
    }

    /// Whether the container is muxed by the MP4 muxer
    pub fn is_mp4(&self) -> bool {
        matches!(self, Self::Mp4 | Self::FragmentedMp4)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mp4 => "mp4",
            Self::FragmentedMp4 => "fmp4",
            Self::MpegTs => "ts",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Container {
    type Err = SegforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(Self::Mp4),
            "fmp4" | "fragmented-mp4" => Ok(Self::FragmentedMp4),
            "ts" | "mpegts" => Ok(Self::MpegTs),
            other => Err(SegforgeError::InvalidJob(format!(
                "unknown container '{}'",
                other
            ))),
        }
    }
}

/// Playback window of the source to encode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Window {
    /// Whole asset / initialization segment request
    Whole,
    /// Trimmed range in seconds
    Range { start: f64, duration: f64 },
}

impl Window {
    /// Build a window from raw request values.
    ///
    /// A negative start selects the whole asset regardless of duration, so
    /// every init request for the same source shares one identity.
    pub fn from_parts(start: f64, duration: f64) -> SegforgeResult<Self> {
        if !start.is_finite() || !duration.is_finite() {
            return Err(SegforgeError::InvalidJob(
                "window start and duration must be finite".to_string(),
            ));
        }
        if start < 0.0 {
            return Ok(Self::Whole);
        }
        if duration <= 0.0 {
            return Err(SegforgeError::InvalidJob(format!(
                "segment duration must be positive, got {}",
                duration
            )));
        }
        Ok(Self::Range { start, duration })
    }

    pub fn is_whole(&self) -> bool {
        matches!(self, Self::Whole)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whole => write!(f, "init"),
            Self::Range { start, duration } => write!(f, "{}:{}", start, duration),
        }
    }
}

/// A validated transcode request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Source media URL (anything the encoder can open)
    pub url: String,
    /// Slice of the source to encode
    pub window: Window,
    /// Encoding preset
    pub profile: Profile,
    /// Streams to keep
    pub media: MediaSelector,
    /// Output container
    pub container: Container,
    /// Emit fragmented output (only meaningful for MP4 segments)
    pub fragmented: bool,
}

impl Job {
    /// Create a new job, validating the fields the encoder depends on
    pub fn new(
        url: impl Into<String>,
        window: Window,
        profile: Profile,
        media: MediaSelector,
        container: Container,
        fragmented: bool,
    ) -> SegforgeResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SegforgeError::InvalidJob("source URL is empty".to_string()));
        }
        if window.is_whole() && container == Container::MpegTs {
            return Err(SegforgeError::InvalidJob(
                "init segments are always MP4".to_string(),
            ));
        }
        profile.validate()?;

        Ok(Self {
            url,
            window,
            profile,
            media,
            container,
            fragmented,
        })
    }

    /// Compute the job's identity under the given encoder settings
    pub fn fingerprint(&self, settings: &EncoderConfig) -> Fingerprint {
        Fingerprint::of(self, settings)
    }

    /// Whether the encoder should emit fragmented MP4
    pub fn wants_fragments(&self) -> bool {
        !self.window.is_whole()
            && (self.container == Container::FragmentedMp4
                || (self.container == Container::Mp4 && self.fragmented))
    }
}
