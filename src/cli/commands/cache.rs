//! Cache command - inspect or clear the artifact directory

use crate::cache::{format_bytes, ArtifactStore, StoredArtifact};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::SegforgeResult;
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> SegforgeResult<()> {
    let store = ArtifactStore::new(config.cache.artifact_dir());

    match args.action {
        CacheAction::List { format } => list_artifacts(&store, format).await,
        CacheAction::Clear { yes } => clear_artifacts(&store, yes).await,
    }
}

/// List artifacts on disk
async fn list_artifacts(store: &ArtifactStore, format: OutputFormat) -> SegforgeResult<()> {
    let artifacts = store.list().await?;

    match format {
        OutputFormat::Table => print_artifact_table(store, &artifacts),
        OutputFormat::Json => print_artifact_json(&artifacts)?,
        OutputFormat::Plain => print_artifact_plain(&artifacts),
    }

    Ok(())
}

fn print_artifact_table(store: &ArtifactStore, artifacts: &[StoredArtifact]) {
    if artifacts.is_empty() {
        println!("No artifacts in {}", store.root().display());
        return;
    }

    println!("{:<16} {:<6} {:>10} {:<20}", "FINGERPRINT", "TYPE", "SIZE", "MODIFIED");
    println!("{}", "-".repeat(56));

    for artifact in artifacts {
        let ext = artifact
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("?");
        println!(
            "{:<16} {:<6} {:>10} {:<20}",
            artifact.fingerprint.short(),
            ext,
            format_bytes(artifact.size_bytes),
            artifact.modified.format("%Y-%m-%d %H:%M")
        );
    }

    let total: u64 = artifacts.iter().map(|a| a.size_bytes).sum();
    println!();
    println!(
        "Total: {} artifact(s), {} in {}",
        artifacts.len(),
        format_bytes(total),
        store.root().display()
    );
}

fn print_artifact_json(artifacts: &[StoredArtifact]) -> SegforgeResult<()> {
    #[derive(serde::Serialize)]
    struct ArtifactJson {
        fingerprint: String,
        path: String,
        size_bytes: u64,
        modified: String,
    }

    let json: Vec<ArtifactJson> = artifacts
        .iter()
        .map(|a| ArtifactJson {
            fingerprint: a.fingerprint.to_string(),
            path: a.path.display().to_string(),
            size_bytes: a.size_bytes,
            modified: a.modified.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_artifact_plain(artifacts: &[StoredArtifact]) {
    for artifact in artifacts {
        println!("{}", artifact.path.display());
    }
}

/// Delete every artifact
async fn clear_artifacts(store: &ArtifactStore, skip_confirm: bool) -> SegforgeResult<()> {
    let artifacts = store.list().await?;

    if artifacts.is_empty() {
        println!("No artifacts to clear.");
        return Ok(());
    }

    let total: u64 = artifacts.iter().map(|a| a.size_bytes).sum();
    println!(
        "This will remove {} artifact(s) ({}) from {}",
        artifacts.len(),
        format_bytes(total),
        store.root().display()
    );
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = store.clear().await?;
    println!("{} removed {} file(s)", style("✓").green(), removed);

    Ok(())
}
