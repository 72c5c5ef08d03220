//! Encoder argument derivation
//!
//! Turns a job into the exact ffmpeg argument list. The mapping is a pure
//! function of the job and the encoder settings, so the same fingerprint
//! always produces the same command line.

use crate::config::schema::EncoderConfig;
use crate::job::{Fingerprint, Job, MediaSelector, Window};
use std::path::PathBuf;

/// Everything the encoder needs to produce one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct EncodePlan {
    /// Identity of the job being encoded
    pub fingerprint: Fingerprint,
    /// Source media the encoder reads
    pub source: String,
    /// File the encoder must write
    pub output: PathBuf,
    /// Full argument list, output path last
    pub args: Vec<String>,
}

impl EncodePlan {
    /// Derive the plan for `job`, writing to `output`
    pub fn derive(job: &Job, settings: &EncoderConfig, output: PathBuf) -> Self {
        let p = &job.profile;
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            job.url.clone(),
        ];

        if job.media.has_video() {
            args.extend([
                "-preset".into(),
                settings.preset.clone(),
                "-vf".into(),
                format!("scale={}:{}", p.width, p.height),
                "-b:v".into(),
                format!("{}k", p.video_bitrate_kbps),
                "-r".into(),
                format!("{:.6}", p.fps),
                "-pix_fmt".into(),
                settings.pixel_format.clone(),
                "-c:v".into(),
                p.video_codec.clone(),
            ]);
        }

        if job.media.has_audio() {
            args.extend([
                "-b:a".into(),
                format!("{}k", p.audio_bitrate_kbps),
                "-ac".into(),
                p.audio_channels.to_string(),
                "-ar".into(),
                p.audio_sample_rate.to_string(),
                "-c:a".into(),
                p.audio_codec.clone(),
            ]);
        }

        match job.media {
            MediaSelector::Audio => args.push("-vn".into()),
            MediaSelector::Video => args.push("-an".into()),
            MediaSelector::Combined => {}
        }

        match job.window {
            Window::Range { start, duration } => {
                args.extend([
                    "-ss".into(),
                    format!("{:.6}", start),
                    "-t".into(),
                    format!("{:.6}", duration),
                ]);
                if job.wants_fragments() {
                    args.extend(["-movflags".into(), "+frag_keyframe+empty_moov".into()]);
                }
            }
            Window::Whole => {
                // Init segments only need the headers; encode a sliver
                args.extend(["-t".into(), format!("{:.6}", settings.init_probe_secs)]);
                if job.container.is_mp4() {
                    args.extend(["-movflags".into(), "+faststart".into()]);
                }
            }
        }

        args.extend(["-f".into(), job.container.muxer().into()]);
        args.push(output.display().to_string());

        Self {
            fingerprint: job.fingerprint(settings),
            source: job.url.clone(),
            output,
            args,
        }
    }

    /// Value following `flag`, if present
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::sample_job;
    use crate::job::Container;

    fn plan(job: &Job) -> EncodePlan {
        EncodePlan::derive(job, &EncoderConfig::default(), PathBuf::from("/tmp/out.mp4"))
    }

    #[test]
    fn combined_segment() {
        let plan = plan(&sample_job(10.0, 5.0));

        assert_eq!(plan.arg_value("-i"), Some("https://media.example.com/movie.mkv"));
        assert_eq!(plan.arg_value("-vf"), Some("scale=854:480"));
        assert_eq!(plan.arg_value("-b:v"), Some("1500k"));
        assert_eq!(plan.arg_value("-b:a"), Some("128k"));
        assert_eq!(plan.arg_value("-r"), Some("25.000000"));
        assert_eq!(plan.arg_value("-pix_fmt"), Some("yuv420p"));
        assert_eq!(plan.arg_value("-ac"), Some("2"));
        assert_eq!(plan.arg_value("-ar"), Some("44100"));
        assert_eq!(plan.arg_value("-c:v"), Some("libx264"));
        assert_eq!(plan.arg_value("-c:a"), Some("aac"));
        assert_eq!(plan.arg_value("-ss"), Some("10.000000"));
        assert_eq!(plan.arg_value("-t"), Some("5.000000"));
        assert_eq!(plan.arg_value("-f"), Some("mp4"));
        assert!(!plan.has_flag("-movflags"));
        assert!(!plan.has_flag("-vn"));
        assert!(!plan.has_flag("-an"));
        assert_eq!(plan.args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn fragmented_segment_flags() {
        let mut job = sample_job(4.0, 4.0);
        job.fragmented = true;
        let plan = plan(&job);
        assert_eq!(plan.arg_value("-movflags"), Some("+frag_keyframe+empty_moov"));
    }

    #[test]
    fn init_segment_is_faststart_without_seek() {
        let mut job = sample_job(0.0, 1.0);
        job.window = Window::Whole;
        job.media = MediaSelector::Video;
        job.fragmented = true;
        let plan = plan(&job);

        assert!(!plan.has_flag("-ss"));
        assert_eq!(plan.arg_value("-t"), Some("0.100000"));
        assert_eq!(plan.arg_value("-movflags"), Some("+faststart"));
        assert!(plan.has_flag("-an"));
        assert!(!plan.has_flag("-c:a"));
    }

    #[test]
    fn transport_stream_uses_mpegts_muxer() {
        let mut job = sample_job(20.0, 6.0);
        job.container = Container::MpegTs;
        job.fragmented = true;
        let plan = plan(&job);

        assert_eq!(plan.arg_value("-f"), Some("mpegts"));
        assert!(!plan.has_flag("-movflags"));
    }

    #[test]
    fn audio_only_excludes_video() {
        let mut job = sample_job(0.0, 6.0);
        job.media = MediaSelector::Audio;
        let plan = plan(&job);

        assert!(plan.has_flag("-vn"));
        assert!(!plan.has_flag("-vf"));
        assert!(!plan.has_flag("-preset"));
        assert_eq!(plan.arg_value("-c:a"), Some("aac"));
    }

    #[test]
    fn derivation_is_deterministic() {
        let job = sample_job(7.5, 2.5);
        assert_eq!(plan(&job), plan(&job));
        assert_eq!(
            plan(&job).fingerprint,
            job.fingerprint(&EncoderConfig::default())
        );
    }
}
