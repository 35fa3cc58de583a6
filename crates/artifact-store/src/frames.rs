//! Frame extraction via the ffmpeg CLI
//!
//! Strategies are tried in order; the first success short-circuits. Accurate
//! output-side seeking decodes up to the timestamp and is the reliable
//! default; fast input-side seeking jumps to the nearest keyframe first and
//! rescues containers where the accurate path stalls or errors.

use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};
use ugc_common::{PipelineError, Result};

struct FrameStrategy {
    name: &'static str,
    build_args: fn(&Path, f64, &Path) -> Vec<String>,
}

const STRATEGIES: &[FrameStrategy] = &[
    FrameStrategy {
        name: "accurate-seek",
        build_args: accurate_seek_args,
    },
    FrameStrategy {
        name: "fast-seek",
        build_args: fast_seek_args,
    },
];

fn accurate_seek_args(video: &Path, timestamp: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video.display().to_string(),
        "-ss".to_string(),
        timestamp.to_string(),
        "-vframes".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        output.display().to_string(),
    ]
}

fn fast_seek_args(video: &Path, timestamp: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        timestamp.to_string(),
        "-i".to_string(),
        video.display().to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        output.display().to_string(),
    ]
}

/// Extract a single frame at `timestamp` seconds into `output`
pub(crate) async fn extract_frame(video: &Path, timestamp: f64, output: &Path) -> Result<()> {
    let mut last_failure = String::new();

    for strategy in STRATEGIES {
        let args = (strategy.build_args)(video, timestamp, output);
        debug!("Extracting frame at {}s via {}", timestamp, strategy.name);

        match Command::new("ffmpeg").args(&args).output().await {
            Ok(out) if out.status.success() && output.exists() => {
                return Ok(());
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                last_failure = format!("ffmpeg exited with {}: {}", out.status, stderr.trim());
            }
            Err(e) => {
                last_failure = format!("failed to spawn ffmpeg: {e}");
            }
        }

        warn!(
            "Frame extraction via {} failed at {}s, retrying with next strategy: {}",
            strategy.name, timestamp, last_failure
        );
    }

    Err(PipelineError::FrameExtraction {
        timestamp,
        reason: format!("all extraction strategies failed, last: {last_failure}"),
    })
}
