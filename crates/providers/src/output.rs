//! Provider output extraction
//!
//! Providers have shipped several output key names across versions. Each
//! capability models its known shapes as explicit variants; an output
//! matching none of them is an `UnexpectedOutputShape`, never a guess.

use serde::Deserialize;
use serde_json::Value;
use ugc_common::{PipelineError, Result};

/// Known face-swap output shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum ImageOutput {
    Keyed { image_url: String },
    Legacy { image: String },
}

pub(crate) fn image_url(output: &Value) -> Result<String> {
    match serde_json::from_value(output.clone()) {
        Ok(ImageOutput::Keyed { image_url }) => Ok(image_url),
        Ok(ImageOutput::Legacy { image }) => Ok(image),
        Err(_) => Err(unexpected("face-swap", output)),
    }
}

/// Known video-generation output shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum VideoOutput {
    Keyed { video_url: String },
    Legacy { video: String },
}

pub(crate) fn video_url(output: &Value) -> Result<String> {
    match serde_json::from_value(output.clone()) {
        Ok(VideoOutput::Keyed { video_url }) => Ok(video_url),
        Ok(VideoOutput::Legacy { video }) => Ok(video),
        Err(_) => Err(unexpected("video-generation", output)),
    }
}

/// Known lip-sync output shapes: top-level `output_url` or nested under
/// `output`
#[derive(Deserialize)]
struct SyncInner {
    output_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SyncOutput {
    Flat { output_url: String },
    Nested { output: SyncInner },
}

pub(crate) fn sync_output_url(output: &Value) -> Result<String> {
    match serde_json::from_value(output.clone()) {
        Ok(SyncOutput::Flat { output_url }) => Ok(output_url),
        Ok(SyncOutput::Nested { output }) => Ok(output.output_url),
        Err(_) => Err(unexpected("lip-sync", output)),
    }
}

fn unexpected(capability: &str, output: &Value) -> PipelineError {
    let rendered = output.to_string();
    let shown: String = rendered.chars().take(200).collect();
    PipelineError::UnexpectedOutputShape(format!("{capability} output: {shown}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_output_shapes() {
        assert_eq!(
            image_url(&json!({"image_url": "https://cdn.example/a.jpg"})).unwrap(),
            "https://cdn.example/a.jpg"
        );
        assert_eq!(
            image_url(&json!({"image": "https://cdn.example/b.jpg"})).unwrap(),
            "https://cdn.example/b.jpg"
        );
        assert!(matches!(
            image_url(&json!({"picture": "nope"})).unwrap_err(),
            PipelineError::UnexpectedOutputShape(_)
        ));
    }

    #[test]
    fn test_video_output_shapes() {
        assert_eq!(
            video_url(&json!({"video_url": "https://cdn.example/v.mp4", "works_id": "w1"})).unwrap(),
            "https://cdn.example/v.mp4"
        );
        assert_eq!(
            video_url(&json!({"video": "https://cdn.example/w.mp4"})).unwrap(),
            "https://cdn.example/w.mp4"
        );
        assert!(matches!(
            video_url(&json!(null)).unwrap_err(),
            PipelineError::UnexpectedOutputShape(_)
        ));
    }

    #[test]
    fn test_sync_output_shapes() {
        assert_eq!(
            sync_output_url(&json!({"id": "j1", "output_url": "https://cdn.example/s.mp4"})).unwrap(),
            "https://cdn.example/s.mp4"
        );
        assert_eq!(
            sync_output_url(&json!({"output": {"output_url": "https://cdn.example/t.mp4"}})).unwrap(),
            "https://cdn.example/t.mp4"
        );
        assert!(matches!(
            sync_output_url(&json!({"result": "x"})).unwrap_err(),
            PipelineError::UnexpectedOutputShape(_)
        ));
    }
}
