use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::backend::ImageBackend;
use crate::error::{GenError, Result};
use crate::state::AppState;
use crate::types::{GeneratedImage, GenerationOutcome, GenerationRequest, ProgressUpdate};

/// Lifecycle notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Started,
    Progress(ProgressUpdate),
    /// The image was added to the front of the history.
    Completed(GeneratedImage),
    /// The generation failed; `message` is suitable for showing to the user.
    Failed { message: String },
}

/// Restores idle state when a generation ends, including when the future is dropped.
struct IdleGuard<'a> {
    generating: &'a AtomicBool,
    progress: &'a AtomicU8,
}

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        self.progress.store(0, Ordering::Release);
        self.generating.store(false, Ordering::Release);
    }
}

/// Runs one generation at a time through a backend and records the result.
pub struct Generator {
    backend: Arc<dyn ImageBackend>,
    generating: AtomicBool,
    progress: AtomicU8,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("backend", &self.backend.kind())
            .field("generating", &self.is_generating())
            .field("progress", &self.progress())
            .finish()
    }
}

impl Generator {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            backend,
            generating: AtomicBool::new(false),
            progress: AtomicU8::new(0),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ImageBackend> {
        &self.backend
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// Current progress in percent; 0 when idle.
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    /// Generate an image and prepend it to `state`'s history.
    ///
    /// Fails with [`GenError::EmptyPrompt`] for a blank prompt and
    /// [`GenError::Busy`] while another generation is running; neither emits
    /// events. Any other failure emits [`GenerationEvent::Failed`] and leaves
    /// the history untouched.
    pub async fn generate<F>(
        &self,
        state: &AppState,
        mut request: GenerationRequest,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<GeneratedImage>
    where
        F: FnMut(GenerationEvent) + Send,
    {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(GenError::EmptyPrompt);
        }
        request.prompt = prompt;

        if self
            .generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GenError::Busy);
        }
        let _idle = IdleGuard {
            generating: &self.generating,
            progress: &self.progress,
        };
        self.progress.store(0, Ordering::Release);
        on_event(GenerationEvent::Started);

        let result = self.run(state, &request, cancel, &mut on_event).await;
        match &result {
            Ok(image) => {
                tracing::info!(image_id = %image.id, backend = ?self.backend.kind(), "Generation completed");
                on_event(GenerationEvent::Completed(image.clone()));
            }
            Err(e) => {
                tracing::error!(backend = ?self.backend.kind(), error = %e, "Generation failed");
                on_event(GenerationEvent::Failed {
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn run<F>(
        &self,
        state: &AppState,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        on_event: &mut F,
    ) -> Result<GeneratedImage>
    where
        F: FnMut(GenerationEvent) + Send,
    {
        let progress = &self.progress;
        let mut on_progress = |update: ProgressUpdate| {
            let update = ProgressUpdate {
                percent: update.percent.min(100),
                ..update
            };
            progress.store(update.percent, Ordering::Release);
            on_event(GenerationEvent::Progress(update));
        };

        let outcome = self.backend.submit(request, cancel, &mut on_progress).await?;
        let image = to_history_entry(request, outcome);
        state.prepend_image(image.clone())?;
        Ok(image)
    }
}

fn to_history_entry(request: &GenerationRequest, outcome: GenerationOutcome) -> GeneratedImage {
    let negative = request.negative_prompt.trim();
    GeneratedImage {
        id: outcome
            .task_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        url: outcome.image_url,
        prompt: request.prompt.clone(),
        negative_prompt: (!negative.is_empty()).then(|| negative.to_string()),
        aspect_ratio: Some(request.aspect_ratio),
        width: outcome.width.or(request.width),
        height: outcome.height.or(request.height),
        timestamp: outcome
            .created_at
            .unwrap_or_else(|| Utc::now().timestamp_millis()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AspectRatio;

    #[test]
    fn test_history_entry_from_sync_outcome() {
        let request = GenerationRequest::new("a fox")
            .negative("  ")
            .aspect_ratio(AspectRatio::Portrait);
        let image = to_history_entry(&request, GenerationOutcome::from_url("https://img/fox.png"));
        assert_eq!(image.url, "https://img/fox.png");
        assert_eq!(image.prompt, "a fox");
        assert!(image.negative_prompt.is_none());
        assert_eq!(image.aspect_ratio, Some(AspectRatio::Portrait));
        assert!(uuid::Uuid::parse_str(&image.id).is_ok());
        assert!(image.timestamp > 0);
    }

    #[test]
    fn test_history_entry_borrows_task_id() {
        let request = GenerationRequest::new("a fox").negative("blurry").size(512, 512);
        let outcome = GenerationOutcome {
            task_id: Some("task-9".into()),
            image_url: "https://img/9.png".into(),
            width: Some(1024),
            height: None,
            created_at: Some(1_700_000_000_000),
        };
        let image = to_history_entry(&request, outcome);
        assert_eq!(image.id, "task-9");
        assert_eq!(image.negative_prompt.as_deref(), Some("blurry"));
        assert_eq!(image.width, Some(1024));
        assert_eq!(image.height, Some(512));
        assert_eq!(image.timestamp, 1_700_000_000_000);
    }
}
