//! Segforge - on-demand media segment transcoder
//!
//! Turns (source, time window, output profile) requests into encoded
//! artifacts on disk, encoding each distinct request at most once and
//! keeping a bounded, protection-aware index of what has been produced.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod flight;
pub mod job;
pub mod transcoder;

pub use error::{SegforgeError, SegforgeResult};
pub use job::{Container, Fingerprint, Job, MediaSelector, Profile, Window};
pub use transcoder::{Artifact, ArtifactLease, ServeOutcome, Transcoder};
