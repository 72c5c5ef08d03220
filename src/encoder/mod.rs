//! External encoder integration
//!
//! The transcoder never touches media bytes itself. It derives an
//! [`EncodePlan`] from the job and hands it to an [`Encoder`], which runs to
//! completion and either leaves a file at `plan.output` or reports why not.

mod ffmpeg;
pub mod plan;

pub use ffmpeg::FfmpegEncoder;
pub use plan::EncodePlan;

use crate::error::SegforgeResult;
use async_trait::async_trait;

/// Max number of output lines to include in encode error messages.
const ERROR_TAIL_LINES: usize = 50;

/// Something that turns an encode plan into an artifact file
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Run the plan to completion.
    ///
    /// Success means the process exited cleanly; the caller still verifies
    /// that `plan.output` holds data before publishing it.
    async fn encode(&self, plan: &EncodePlan) -> SegforgeResult<()>;

    /// Human-readable encoder name for logs
    fn name(&self) -> &'static str;
}

/// Extract the useful tail of encoder output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn diagnostic_tail(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail = if total > ERROR_TAIL_LINES {
        &lines[total - ERROR_TAIL_LINES..]
    } else {
        &lines[..]
    };
    tail.join("\n")
}
