//! Fingerprint command - print a job's identity and artifact path

use crate::cache::ArtifactStore;
use crate::cli::args::JobArgs;
use crate::config::Config;
use crate::error::SegforgeResult;
use crate::job::ProfileRegistry;

/// Execute the fingerprint command
pub async fn execute(args: JobArgs, config: &Config) -> SegforgeResult<()> {
    let profiles = ProfileRegistry::with_overrides(&config.profiles)?;
    let job = args.to_job(&profiles)?;
    let fingerprint = job.fingerprint(&config.encoder);
    let store = ArtifactStore::new(config.cache.artifact_dir());

    println!("{}", fingerprint);
    println!(
        "{}",
        store.canonical_path(&fingerprint, job.container).display()
    );
    Ok(())
}
