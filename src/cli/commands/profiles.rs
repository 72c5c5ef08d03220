//! Profiles command - list built-in and configured encoding profiles

use crate::config::Config;
use crate::error::SegforgeResult;
use crate::job::{Profile, ProfileRegistry};
use console::style;

/// Execute the profiles command
pub async fn execute(config: &Config) -> SegforgeResult<()> {
    let registry = ProfileRegistry::with_overrides(&config.profiles)?;

    println!(
        "{:<10} {:<11} {:<8} {:<8} {:<12} {:<6}",
        "NAME", "RESOLUTION", "VIDEO", "AUDIO", "CODECS", "FPS"
    );
    println!("{}", "-".repeat(60));

    for profile in registry.iter() {
        let name = if config.profiles.contains_key(&profile.name) {
            style(profile.name.as_str()).cyan().to_string()
        } else {
            profile.name.clone()
        };
        println!("{}", row(&name, profile));
    }

    println!();
    println!("Total: {} profile(s)", registry.len());
    Ok(())
}

fn row(name: &str, p: &Profile) -> String {
    format!(
        "{:<10} {:<11} {:<8} {:<8} {:<12} {:<6}",
        name,
        format!("{}x{}", p.width, p.height),
        format!("{}k", p.video_bitrate_kbps),
        format!("{}k", p.audio_bitrate_kbps),
        format!("{}/{}", p.video_codec, p.audio_codec),
        p.fps
    )
}
