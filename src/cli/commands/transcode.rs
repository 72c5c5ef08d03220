//! Transcode command - encode or fetch one artifact

use crate::cli::args::TranscodeArgs;
use crate::config::Config;
use crate::error::SegforgeResult;
use crate::job::ProfileRegistry;
use crate::transcoder::{ServeOutcome, Transcoder};
use console::style;
use tracing::debug;

/// Execute the transcode command
pub async fn execute(args: TranscodeArgs, config: &Config) -> SegforgeResult<()> {
    let profiles = ProfileRegistry::with_overrides(&config.profiles)?;
    let job = args.job.to_job(&profiles)?;
    debug!("Serving job {:?}", job);

    let transcoder = Transcoder::from_config(config);
    let artifact = transcoder.serve(&job).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
        return Ok(());
    }

    let marker = match artifact.outcome {
        ServeOutcome::Encoded => style("✓").green(),
        ServeOutcome::Rehydrated | ServeOutcome::CacheHit => style("•").cyan(),
    };
    println!("{} {}", marker, artifact.path.display());
    println!("  {:<14} {}", "fingerprint", artifact.fingerprint);
    println!("  {:<14} {}", "content type", artifact.content_type);
    println!("  {:<14} {}", "outcome", artifact.outcome);

    Ok(())
}
