use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{GenError, Result};
use crate::transport::{HttpTransport, RequestOptions};
use crate::types::{Task, TaskCreate, TaskStatus};

/// Operations exposed by a task-based generation server.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Submit a new generation. The returned task is usually QUEUED or PROCESSING.
    async fn create_task(&self, request: &TaskCreate) -> Result<Task>;

    /// Fetch the current state of a task.
    async fn get_task(&self, id: &str) -> Result<Task>;

    /// Fetch a page of past tasks, newest first.
    async fn list_history(&self, limit: usize, offset: usize) -> Result<Vec<Task>>;
}

/// HTTP client for the `/api/v1` task server.
#[derive(Debug, Clone)]
pub struct TaskClient {
    transport: HttpTransport,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>, transport: HttpTransport) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.api_base.clone(),
            HttpTransport::new(config.request_timeout),
        )
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TaskApi for TaskClient {
    async fn create_task(&self, request: &TaskCreate) -> Result<Task> {
        let url = format!("{}/api/v1/generate", self.base_url);
        self.transport
            .post(&url, request, &RequestOptions::default())
            .await
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        let url = format!("{}/api/v1/tasks/{}", self.base_url, id);
        self.transport.get(&url, &RequestOptions::default()).await
    }

    async fn list_history(&self, limit: usize, offset: usize) -> Result<Vec<Task>> {
        let url = format!(
            "{}/api/v1/history?limit={}&offset={}",
            self.base_url, limit, offset
        );
        self.transport.get(&url, &RequestOptions::default()).await
    }
}

/// Polling cadence for [`poll_task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::from_budget(Duration::from_secs(2), Duration::from_secs(600))
    }
}

impl PollOptions {
    /// Derive the attempt count as `ceil(budget / interval)`, at least one.
    pub fn from_budget(interval: Duration, budget: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let attempts = budget.as_millis().div_ceil(interval_ms).max(1);
        Self {
            interval,
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::from_budget(config.poll_interval, config.poll_timeout)
    }
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenError::Cancelled),
        result = fut => result,
    }
}

/// Poll a task until it reaches a terminal state.
///
/// `on_progress` sees every fetched task, terminal or not. The first terminal
/// observation ends the loop. Running out of attempts yields
/// [`GenError::PollTimeout`]; the budget counts fetches, so slow responses
/// stretch the wall-clock time past `interval * max_attempts`.
pub async fn poll_task<A, F>(
    api: &A,
    id: &str,
    options: &PollOptions,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<Task>
where
    A: TaskApi + ?Sized,
    F: FnMut(&Task),
{
    for attempt in 1..=options.max_attempts {
        if cancel.is_cancelled() {
            return Err(GenError::Cancelled);
        }

        let task = cancellable(cancel, api.get_task(id)).await?;
        tracing::debug!(
            task_id = id,
            attempt,
            status = task.status.as_str(),
            progress = task.progress,
            "Polled task"
        );
        on_progress(&task);

        match task.status {
            TaskStatus::Completed => {
                if task.result().is_none() {
                    return Err(GenError::IncompleteResult {
                        task_id: task.id.clone(),
                    });
                }
                return Ok(task);
            }
            TaskStatus::Failed => {
                let message = task
                    .error_msg
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Task failed".to_string());
                return Err(GenError::TaskFailed(message));
            }
            TaskStatus::Queued | TaskStatus::Processing => {}
        }

        if attempt < options.max_attempts {
            cancellable(cancel, async {
                tokio::time::sleep(options.interval).await;
                Ok(())
            })
            .await?;
        }
    }

    tracing::warn!(task_id = id, attempts = options.max_attempts, "Task polling timed out");
    Err(GenError::PollTimeout {
        attempts: options.max_attempts,
    })
}

/// Create a task and poll it to completion.
pub async fn generate_image<A, F>(
    api: &A,
    request: &TaskCreate,
    options: &PollOptions,
    cancel: &CancellationToken,
    on_progress: F,
) -> Result<Task>
where
    A: TaskApi + ?Sized,
    F: FnMut(&Task),
{
    let created = cancellable(cancel, api.create_task(request)).await?;
    tracing::info!(task_id = %created.id, status = created.status.as_str(), "Task created");
    poll_task(api, &created.id, options, cancel, on_progress).await
}
