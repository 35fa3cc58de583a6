//! Bounded poll-until-terminal loop
//!
//! The single source of truth for "did the remote job finish". No other
//! component re-implements polling.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use ugc_common::{PipelineError, Result, TaskStatus};

use crate::client::TaskApi;

/// Polls a remote task until it reaches a terminal status
///
/// An explicit attempt counter bounds the loop: at most `max_attempts` status
/// fetches, `interval` apart, giving a hard ceiling of
/// `max_attempts × interval` on wait time.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    max_attempts: u32,
}

impl Poller {
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Wait for the task to reach a terminal status and return its output
    ///
    /// `Failed` surfaces immediately as `TaskFailed` with the provider's
    /// message; no further poll is issued after a terminal status. Transport
    /// errors from the status fetch are retryable while attempts remain.
    ///
    /// # Errors
    /// `TaskFailed` on a provider-reported failure, `PollTimeout` once the
    /// attempt budget is exhausted without a terminal status.
    pub async fn await_completion(&self, api: &dyn TaskApi, task_id: &str) -> Result<Value> {
        for attempt in 1..=self.max_attempts {
            match api.fetch_status(task_id).await {
                Ok(snapshot) => match snapshot.status {
                    TaskStatus::Completed => {
                        debug!("Task {} completed after {} attempts", task_id, attempt);
                        return Ok(snapshot.output.unwrap_or(Value::Null));
                    }
                    TaskStatus::Failed => {
                        return Err(PipelineError::TaskFailed(
                            snapshot
                                .error
                                .unwrap_or_else(|| format!("task {task_id} failed without a message")),
                        ));
                    }
                    TaskStatus::Queued | TaskStatus::Running => {
                        debug!(
                            "Task {} still {:?} (attempt {}/{})",
                            task_id, snapshot.status, attempt, self.max_attempts
                        );
                    }
                },
                // Transient transport failure: keep polling while budget remains
                Err(PipelineError::ProviderRejected(reason)) if attempt < self.max_attempts => {
                    warn!(
                        "Status fetch for {} failed (attempt {}/{}), will retry: {}",
                        task_id, attempt, self.max_attempts, reason
                    );
                }
                Err(e) => return Err(e),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(PipelineError::PollTimeout {
            attempts: self.max_attempts,
        })
    }
}
