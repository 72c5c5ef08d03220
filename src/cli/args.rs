//! CLI argument definitions using clap derive

use crate::error::SegforgeResult;
use crate::job::{Container, Job, MediaSelector, ProfileRegistry, Window};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Segforge - on-demand media segment transcoder
///
/// Encodes time windows of a source into cached artifacts, once per
/// distinct request.
#[derive(Parser, Debug)]
#[command(name = "segforge")]
#[command(
    author,
    version,
    about = "Segforge - on-demand media segment transcoder",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SEGFORGE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode (or fetch) the artifact for a job
    Transcode(TranscodeArgs),

    /// Print a job's fingerprint without encoding
    Fingerprint(JobArgs),

    /// List encoding profiles
    Profiles,

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Inspect or clear the artifact directory
    Cache(CacheArgs),
}

/// Job description shared by commands that build a job
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Source media URL or path
    pub url: String,

    /// Encoding profile name
    #[arg(short, long, default_value = "480p")]
    pub profile: String,

    /// Streams to keep
    #[arg(short, long, default_value = "combined")]
    pub media: MediaArg,

    /// Output container
    #[arg(long, default_value = "mp4")]
    pub container: ContainerArg,

    /// Window start in seconds; negative requests the init segment
    #[arg(short, long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub start: f64,

    /// Window duration in seconds
    #[arg(short, long, default_value_t = 0.0)]
    pub duration: f64,

    /// Emit fragmented MP4
    #[arg(long)]
    pub fragmented: bool,
}

impl JobArgs {
    /// Resolve the profile and validate into a job
    pub fn to_job(&self, profiles: &ProfileRegistry) -> SegforgeResult<Job> {
        let profile = profiles.resolve(&self.profile)?.clone();
        let window = Window::from_parts(self.start, self.duration)?;
        Job::new(
            self.url.clone(),
            window,
            profile,
            self.media.into(),
            self.container.into(),
            self.fragmented,
        )
    }
}

/// Arguments for the transcode command
#[derive(Args, Debug)]
pub struct TranscodeArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MediaArg {
    Video,
    Audio,
    Combined,
}

impl From<MediaArg> for MediaSelector {
    fn from(arg: MediaArg) -> Self {
        match arg {
            MediaArg::Video => MediaSelector::Video,
            MediaArg::Audio => MediaSelector::Audio,
            MediaArg::Combined => MediaSelector::Combined,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ContainerArg {
    Mp4,
    Fmp4,
    Ts,
}

impl From<ContainerArg> for Container {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Mp4 => Container::Mp4,
            ContainerArg::Fmp4 => Container::FragmentedMp4,
            ContainerArg::Ts => Container::MpegTs,
        }
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List artifacts on disk
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete every artifact on disk
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
