//! Provider task API client
//!
//! One HTTP client shape covers every provider: create a task (JSON or
//! multipart), upload an input artifact to the provider's ephemeral storage,
//! and fetch a normalized status envelope. Providers do not share a response
//! shape, so the expected envelopes are modeled as explicit serde variants
//! and anything else fails loudly instead of returning partial data.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use ugc_common::{PipelineError, RemoteTask, Result, TaskKind, TaskStatus};

/// How a provider expects credentials on each request
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// API key in a named header, e.g. `x-api-key`
    Header(&'static str),
    /// `Authorization: Bearer <key>`
    Bearer,
}

/// One field of a multipart task submission
#[derive(Debug, Clone)]
pub enum MultipartField {
    Text { name: String, value: String },
    File { name: String, path: PathBuf },
}

/// Task submission payload, JSON or multipart depending on the provider
#[derive(Debug, Clone)]
pub enum TaskPayload {
    Json(Value),
    Multipart(Vec<MultipartField>),
}

/// Normalized point-in-time view of a remote task
///
/// A provider-reported business failure arrives here as `status: Failed`
/// plus `error`, never as an `Err` from the fetch itself.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status: TaskStatus,
    /// Task output payload, once the provider reports one
    pub output: Option<Value>,
    /// Provider failure message, if any
    pub error: Option<String>,
}

/// Provider task API surface
///
/// Implemented over HTTP by [`TaskClient`]; adapters and the poller depend on
/// this trait so stage logic is testable without a live provider.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Submit a task description to the provider
    async fn submit(&self, kind: TaskKind, payload: TaskPayload) -> Result<RemoteTask>;

    /// Push a local file to the provider's ephemeral storage
    async fn upload(&self, file: &Path) -> Result<String>;

    /// Fetch the current status of a submitted task
    async fn fetch_status(&self, task_id: &str) -> Result<StatusSnapshot>;
}

/// HTTP implementation of [`TaskApi`]
pub struct TaskClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    auth: AuthScheme,
    submit_path: String,
    status_path: String,
    upload_path: String,
}

impl TaskClient {
    /// Create a client for one provider API
    ///
    /// # Errors
    /// Returns `Config` if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, auth: AuthScheme) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            auth,
            submit_path: "/task".to_string(),
            status_path: "/task".to_string(),
            upload_path: "/upload".to_string(),
        })
    }

    /// Override the task creation / status / upload paths
    #[must_use]
    pub fn with_paths(mut self, submit: &str, status: &str, upload: &str) -> Self {
        self.submit_path = submit.to_string();
        self.status_path = status.to_string();
        self.upload_path = upload.to_string();
        self
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            AuthScheme::Header(name) => req.header(name, &self.api_key),
            AuthScheme::Bearer => req.bearer_auth(&self.api_key),
        }
    }

    async fn build_form(&self, fields: Vec<MultipartField>) -> Result<multipart::Form> {
        let mut form = multipart::Form::new();
        for field in fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name, value),
                MultipartField::File { name, path } => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "file".to_string());
                    let bytes = tokio::fs::read(&path).await?;
                    form.part(name, multipart::Part::bytes(bytes).file_name(file_name))
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl TaskApi for TaskClient {
    async fn submit(&self, kind: TaskKind, payload: TaskPayload) -> Result<RemoteTask> {
        let url = format!("{}{}", self.base_url, self.submit_path);
        debug!("Submitting {} task to {}", kind, url);

        let request = match payload {
            TaskPayload::Json(body) => self.authorize(self.http.post(&url)).json(&body),
            TaskPayload::Multipart(fields) => {
                let form = self.build_form(fields).await?;
                self.authorize(self.http.post(&url)).multipart(form)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::ProviderRejected(format!("{kind} submission failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::ProviderRejected(format!("{kind} submission response unreadable: {e}")))?;

        if !status.is_success() {
            return Err(PipelineError::ProviderRejected(format!(
                "{kind} submission returned {status}: {}",
                excerpt(&body)
            )));
        }

        let task_id = parse_submit_envelope(&body)?;
        debug!("Provider accepted {} task: {}", kind, task_id);

        Ok(RemoteTask {
            provider_task_id: task_id,
            kind,
            submitted_at: Utc::now(),
        })
    }

    async fn upload(&self, file: &Path) -> Result<String> {
        let url = format!("{}{}", self.base_url, self.upload_path);
        debug!("Uploading {} to {}", file.display(), url);

        let form = self
            .build_form(vec![MultipartField::File {
                name: "file".to_string(),
                path: file.to_path_buf(),
            }])
            .await?;

        let response = self
            .authorize(self.http.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::UploadFailed(format!("{}: {e}", file.display())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::UploadFailed(format!("{}: response unreadable: {e}", file.display())))?;

        if !status.is_success() {
            return Err(PipelineError::UploadFailed(format!(
                "{}: provider returned {status}: {}",
                file.display(),
                excerpt(&body)
            )));
        }

        parse_upload_envelope(&body)
    }

    async fn fetch_status(&self, task_id: &str) -> Result<StatusSnapshot> {
        let url = format!("{}{}/{}", self.base_url, self.status_path, task_id);

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| PipelineError::ProviderRejected(format!("status fetch for {task_id} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::ProviderRejected(format!("status body for {task_id} unreadable: {e}")))?;

        if !status.is_success() {
            return Err(PipelineError::ProviderRejected(format!(
                "status fetch for {task_id} returned {status}: {}",
                excerpt(&body)
            )));
        }

        parse_status_envelope(&body)
    }
}

/// Task creation response, `{task_id}` / `{id}` flat or wrapped in `data`
#[derive(Deserialize)]
struct SubmitBody {
    #[serde(alias = "id")]
    task_id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubmitEnvelope {
    Wrapped { data: SubmitBody },
    Flat(SubmitBody),
}

fn parse_submit_envelope(body: &str) -> Result<String> {
    let envelope: SubmitEnvelope = serde_json::from_str(body).map_err(|_| {
        PipelineError::ProviderRejected(format!("unrecognized submit envelope: {}", excerpt(body)))
    })?;
    Ok(match envelope {
        SubmitEnvelope::Wrapped { data } | SubmitEnvelope::Flat(data) => data.task_id,
    })
}

/// Upload response, `{url}` flat or wrapped in `data`
#[derive(Deserialize)]
struct UploadBody {
    url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UploadEnvelope {
    Wrapped { data: UploadBody },
    Flat(UploadBody),
}

fn parse_upload_envelope(body: &str) -> Result<String> {
    let envelope: UploadEnvelope = serde_json::from_str(body).map_err(|_| {
        PipelineError::UploadFailed(format!("unrecognized upload envelope: {}", excerpt(body)))
    })?;
    Ok(match envelope {
        UploadEnvelope::Wrapped { data } | UploadEnvelope::Flat(data) => data.url,
    })
}

/// Status response body
///
/// Fields the envelope does not name explicitly (e.g. a lip-sync provider's
/// top-level `output_url`) are collected and exposed as the output payload
/// when no `output` object is present.
#[derive(Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusEnvelope {
    Wrapped { data: StatusBody },
    Flat(StatusBody),
}

fn parse_status_envelope(body: &str) -> Result<StatusSnapshot> {
    let envelope: StatusEnvelope = serde_json::from_str(body).map_err(|_| {
        PipelineError::UnexpectedOutputShape(format!("unrecognized status envelope: {}", excerpt(body)))
    })?;
    let body = match envelope {
        StatusEnvelope::Wrapped { data } | StatusEnvelope::Flat(data) => data,
    };

    let status = TaskStatus::parse(&body.status)?;
    let output = body
        .output
        .or_else(|| (!body.rest.is_empty()).then(|| Value::Object(body.rest)));

    Ok(StatusSnapshot {
        status,
        output,
        error: body.error,
    })
}

/// Truncate a response body for error messages
fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.len() <= LIMIT {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < LIMIT)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}…", &body[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_envelope_flat_task_id() {
        assert_eq!(parse_submit_envelope(r#"{"task_id":"t-1"}"#).unwrap(), "t-1");
    }

    #[test]
    fn test_submit_envelope_flat_id() {
        assert_eq!(parse_submit_envelope(r#"{"id":"abc"}"#).unwrap(), "abc");
    }

    #[test]
    fn test_submit_envelope_wrapped() {
        assert_eq!(
            parse_submit_envelope(r#"{"code":200,"data":{"task_id":"t-2"}}"#).unwrap(),
            "t-2"
        );
    }

    #[test]
    fn test_submit_envelope_rejects_garbage() {
        let err = parse_submit_envelope(r#"{"ok":true}"#).unwrap_err();
        assert!(matches!(err, PipelineError::ProviderRejected(_)));
    }

    #[test]
    fn test_upload_envelope() {
        assert_eq!(
            parse_upload_envelope(r#"{"url":"https://cdn.example/u/1.jpg"}"#).unwrap(),
            "https://cdn.example/u/1.jpg"
        );
        assert_eq!(
            parse_upload_envelope(r#"{"data":{"url":"https://cdn.example/u/2.jpg"}}"#).unwrap(),
            "https://cdn.example/u/2.jpg"
        );
    }

    #[test]
    fn test_status_envelope_with_output_object() {
        let snapshot = parse_status_envelope(
            r#"{"status":"completed","output":{"image_url":"https://cdn.example/out.jpg"}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.status, TaskStatus::Completed);
        assert_eq!(
            snapshot.output.unwrap()["image_url"],
            "https://cdn.example/out.jpg"
        );
    }

    #[test]
    fn test_status_envelope_flat_extra_fields_become_output() {
        // Lip-sync style: uppercase status, output_url at the top level
        let snapshot = parse_status_envelope(
            r#"{"id":"j-1","status":"COMPLETED","output_url":"https://cdn.example/synced.mp4"}"#,
        )
        .unwrap();
        assert_eq!(snapshot.status, TaskStatus::Completed);
        assert_eq!(
            snapshot.output.unwrap()["output_url"],
            "https://cdn.example/synced.mp4"
        );
    }

    #[test]
    fn test_status_envelope_wrapped_with_error() {
        let snapshot = parse_status_envelope(
            r#"{"data":{"status":"failed","error":"face not detected"}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.status, TaskStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("face not detected"));
    }

    #[test]
    fn test_status_envelope_running_has_no_output() {
        let snapshot = parse_status_envelope(r#"{"status":"processing"}"#).unwrap();
        assert_eq!(snapshot.status, TaskStatus::Running);
        assert!(snapshot.output.is_none());
    }

    #[test]
    fn test_status_envelope_unknown_status_word() {
        let err = parse_status_envelope(r#"{"status":"exploded"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::UnexpectedOutputShape(_)));
    }

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        assert!(excerpt(&long).len() < 500);
        assert_eq!(excerpt("short"), "short");
    }
}
