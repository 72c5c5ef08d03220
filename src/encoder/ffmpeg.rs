//! ffmpeg process encoder

use crate::encoder::{diagnostic_tail, EncodePlan, Encoder};
use crate::error::{SegforgeError, SegforgeResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

/// Encoder that shells out to an ffmpeg binary
pub struct FfmpegEncoder {
    binary: String,
}

impl FfmpegEncoder {
    /// Create an encoder running `binary` (a name on PATH or a full path)
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, plan: &EncodePlan) -> SegforgeResult<()> {
        debug!("Executing: {} {:?}", self.binary, plan.args);
        let started = Instant::now();

        let output = Command::new(&self.binary)
            .args(&plan.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SegforgeError::EncoderSpawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        if output.status.success() {
            info!(
                "Encoded {} in {:.1}s",
                plan.fingerprint.short(),
                started.elapsed().as_secs_f64()
            );
            Ok(())
        } else {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            Err(SegforgeError::encode_failed(
                plan.fingerprint.to_string(),
                format!("{} ({}):\n{}", self.binary, status, diagnostic_tail(&stdout, &stderr)),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
