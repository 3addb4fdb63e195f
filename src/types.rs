use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task status lifecycle: Queued -> Processing -> Completed/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Completed and Failed are terminal; the other states are still pending.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A generation task as reported by the task server.
///
/// The client never writes these fields; every value comes from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub seed: i64,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub prompt_id: Option<String>,
}

impl Task {
    /// Progress clamped into `0..=100` for display.
    pub fn progress_percent(&self) -> u8 {
        self.progress.clamp(0, 100) as u8
    }

    /// The result URL, if present and non-empty.
    pub fn result(&self) -> Option<&str> {
        self.result_url.as_deref().filter(|u| !u.is_empty())
    }

    /// Creation time in milliseconds since the Unix epoch.
    ///
    /// Accepts RFC 3339 as well as the naive ISO form many Python backends
    /// emit (assumed UTC). Returns `None` when the field can't be parsed.
    pub fn created_at_millis(&self) -> Option<i64> {
        let raw = self.created_at.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.timestamp_millis());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc().timestamp_millis())
    }

    pub fn progress_update(&self) -> ProgressUpdate {
        ProgressUpdate {
            percent: self.progress_percent(),
            step: self.current_step.clone(),
        }
    }
}

/// Body for `POST /api/v1/generate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCreate {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl TaskCreate {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Aspect ratios offered to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "21:9")]
    Wide,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Classic => "4:3",
            AspectRatio::Wide => "21:9",
        }
    }
}

/// A finished image in the client-side history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: String,
    pub url: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl GeneratedImage {
    /// Project a task into a history record.
    ///
    /// Returns `None` unless the task completed with a non-empty result.
    pub fn from_task(task: &Task) -> Option<Self> {
        if task.status != TaskStatus::Completed {
            return None;
        }
        let url = task.result()?;
        Some(Self {
            id: task.id.clone(),
            url: url.to_string(),
            prompt: task.prompt.clone(),
            negative_prompt: None,
            aspect_ratio: None,
            width: (task.width > 0).then_some(task.width),
            height: (task.height > 0).then_some(task.height),
            timestamp: task
                .created_at_millis()
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
        })
    }
}

/// User-adjustable backend settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub use_custom_backend: bool,
    pub custom_backend_url: String,
}

impl AppSettings {
    /// The custom URL to use, if the override is enabled.
    pub fn custom_url(&self) -> Option<&str> {
        if self.use_custom_backend {
            Some(self.custom_backend_url.as_str())
        } else {
            None
        }
    }
}

/// Incremental progress reported while a generation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Always within `0..=100`.
    pub percent: u8,
    pub step: Option<String>,
}

impl ProgressUpdate {
    pub fn percent(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
            step: None,
        }
    }
}

/// What the user asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seed: Option<i64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn negative(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = negative.into();
        self
    }

    pub fn aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Result of a successful backend submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    /// Server-side id, when the backend has one.
    pub task_id: Option<String>,
    pub image_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Milliseconds since the Unix epoch, when the backend reports it.
    pub created_at: Option<i64>,
}

impl GenerationOutcome {
    pub fn from_url(image_url: impl Into<String>) -> Self {
        Self {
            task_id: None,
            image_url: image_url.into(),
            width: None,
            height: None,
            created_at: None,
        }
    }
}
