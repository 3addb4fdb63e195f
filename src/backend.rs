use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::endpoint::{resolve_endpoint, WebhookEndpoints};
use crate::error::{GenError, Result};
use crate::normalize::{extract_image_field, normalize, CUSTOM_ENDPOINT_FIELDS};
use crate::tasks::{cancellable, generate_image, PollOptions, TaskApi, TaskClient};
use crate::transport::{HttpTransport, RequestOptions};
use crate::types::{
    AppSettings, AspectRatio, GenerationOutcome, GenerationRequest, ProgressUpdate, TaskCreate,
};

/// Progress sink handed to a backend for the duration of one submission.
pub type ProgressSink<'a> = &'a mut (dyn FnMut(ProgressUpdate) + Send);

/// The backend shapes a generation request can go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// A hosted image model called directly with an API key.
    DirectModel,
    /// A workflow engine webhook that answers synchronously.
    Webhook,
    /// A task server that is polled until the task finishes.
    TaskBased,
    /// Any HTTP endpoint the user configured.
    CustomUserEndpoint,
}

impl BackendKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "direct-model" | "gemini" => Some(BackendKind::DirectModel),
            "webhook" | "n8n" => Some(BackendKind::Webhook),
            "task" | "tasks" | "task-based" => Some(BackendKind::TaskBased),
            "custom" => Some(BackendKind::CustomUserEndpoint),
            _ => None,
        }
    }
}

/// A backend that can turn a prompt into an image URL.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Submit `request` and wait for the final image.
    async fn submit(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        on_progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome>;
}

/// Pick the backend implementation for a config and the user's settings.
pub fn build_backend(config: &ClientConfig, settings: &AppSettings) -> Result<Arc<dyn ImageBackend>> {
    let transport = HttpTransport::new(config.request_timeout);
    let backend: Arc<dyn ImageBackend> = match config.backend {
        BackendKind::DirectModel => Arc::new(DirectModelBackend::new(
            transport,
            config.api_key.clone(),
            &config.model_base,
            &config.model,
        )?),
        BackendKind::Webhook => Arc::new(WebhookBackend::new(
            transport,
            config.webhook.clone(),
            settings.custom_url().map(str::to_string),
        )),
        BackendKind::TaskBased => Arc::new(TaskBackend::new(
            TaskClient::new(config.api_base.clone(), transport),
            PollOptions::from_config(config),
        )),
        BackendKind::CustomUserEndpoint => {
            Arc::new(CustomEndpointBackend::new(transport, &settings.custom_backend_url)?)
        }
    };
    Ok(backend)
}

// ── Webhook ─────────────────────────────────────────────────────────

/// Posts `{prompt}` to a workflow webhook and normalizes whatever comes back.
#[derive(Debug, Clone)]
pub struct WebhookBackend {
    transport: HttpTransport,
    endpoints: WebhookEndpoints,
    custom_url: Option<String>,
}

impl WebhookBackend {
    pub fn new(transport: HttpTransport, endpoints: WebhookEndpoints, custom_url: Option<String>) -> Self {
        Self {
            transport,
            endpoints,
            custom_url,
        }
    }

    pub fn endpoint(&self) -> String {
        resolve_endpoint(self.custom_url.as_deref(), &self.endpoints)
    }
}

#[async_trait]
impl ImageBackend for WebhookBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Webhook
    }

    async fn submit(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        on_progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome> {
        let url = self.endpoint();
        on_progress(ProgressUpdate::percent(0));

        let body = json!({ "prompt": request.prompt });
        let payload: Value = cancellable(
            cancel,
            self.transport.post(&url, &body, &RequestOptions::default()),
        )
        .await?;

        let image_url = normalize(&payload)?;
        on_progress(ProgressUpdate::percent(100));
        Ok(GenerationOutcome::from_url(image_url))
    }
}

// ── Custom user endpoint ────────────────────────────────────────────

/// Posts the full request to a user-supplied URL expecting `{image}` or `{url}`.
#[derive(Debug, Clone)]
pub struct CustomEndpointBackend {
    transport: HttpTransport,
    url: String,
}

impl CustomEndpointBackend {
    pub fn new(transport: HttpTransport, url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(GenError::InvalidConfig(
                "custom backend is enabled but no URL is set".into(),
            ));
        }
        Ok(Self {
            transport,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ImageBackend for CustomEndpointBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CustomUserEndpoint
    }

    async fn submit(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        on_progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome> {
        on_progress(ProgressUpdate::percent(0));

        let body = json!({
            "prompt": request.prompt,
            "negative_prompt": request.negative_prompt,
            "aspect_ratio": request.aspect_ratio.as_str(),
        });
        let payload: Value = cancellable(
            cancel,
            self.transport.post(&self.url, &body, &RequestOptions::default()),
        )
        .await?;

        let image_url = extract_image_field(&payload, &CUSTOM_ENDPOINT_FIELDS)?;
        on_progress(ProgressUpdate::percent(100));
        Ok(GenerationOutcome {
            width: request.width,
            height: request.height,
            ..GenerationOutcome::from_url(image_url)
        })
    }
}

// ── Task server ─────────────────────────────────────────────────────

/// Creates a task and polls it, forwarding the server's progress.
pub struct TaskBackend<A: ?Sized = TaskClient> {
    api: Arc<A>,
    poll: PollOptions,
}

impl<A: TaskApi> TaskBackend<A> {
    pub fn new(api: A, poll: PollOptions) -> Self {
        Self {
            api: Arc::new(api),
            poll,
        }
    }
}

impl<A: TaskApi + ?Sized> TaskBackend<A> {
    pub fn from_shared(api: Arc<A>, poll: PollOptions) -> Self {
        Self { api, poll }
    }
}

#[async_trait]
impl<A: TaskApi + ?Sized + 'static> ImageBackend for TaskBackend<A> {
    fn kind(&self) -> BackendKind {
        BackendKind::TaskBased
    }

    async fn submit(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        on_progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome> {
        let create = TaskCreate {
            prompt: request.prompt.clone(),
            width: request.width,
            height: request.height,
            seed: request.seed,
        };

        let task = generate_image(self.api.as_ref(), &create, &self.poll, cancel, |task| {
            on_progress(task.progress_update())
        })
        .await?;

        let image_url = task.result().unwrap_or_default().to_string();
        Ok(GenerationOutcome {
            task_id: Some(task.id.clone()),
            image_url,
            width: (task.width > 0).then_some(task.width),
            height: (task.height > 0).then_some(task.height),
            created_at: task.created_at_millis(),
        })
    }
}

// ── Direct model ────────────────────────────────────────────────────

/// Calls a hosted Gemini image model and returns the image as a data URL.
#[derive(Clone)]
pub struct DirectModelBackend {
    transport: HttpTransport,
    api_key: String,
    url: String,
}

impl std::fmt::Debug for DirectModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectModelBackend")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl DirectModelBackend {
    /// Fails with [`GenError::MissingCredential`] when no API key is configured.
    pub fn new(
        transport: HttpTransport,
        api_key: Option<String>,
        model_base: &str,
        model: &str,
    ) -> Result<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            GenError::MissingCredential(
                "API key is missing. Set GEMINI_API_KEY or API_KEY.".into(),
            )
        })?;
        Ok(Self {
            transport,
            api_key,
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                model_base.trim_end_matches('/'),
                model
            ),
        })
    }
}

/// The model accepts 1:1, 3:4, 4:3, 9:16 and 16:9 only.
fn model_aspect_ratio(ratio: AspectRatio) -> &'static str {
    match ratio {
        AspectRatio::Wide => AspectRatio::Landscape.as_str(),
        other => other.as_str(),
    }
}

fn model_prompt(request: &GenerationRequest) -> String {
    let negative = request.negative_prompt.trim();
    if negative.is_empty() {
        request.prompt.clone()
    } else {
        format!("{} --no {}", request.prompt, negative)
    }
}

/// First inline image part of a `generateContent` response, as a data URL.
fn extract_inline_image(response: &Value) -> Option<String> {
    response
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .find_map(|part| {
            let inline = part.get("inlineData")?;
            let data = inline.get("data")?.as_str().filter(|d| !d.is_empty())?;
            let mime = inline
                .get("mimeType")
                .and_then(|m| m.as_str())
                .unwrap_or("image/png");
            Some(format!("data:{};base64,{}", mime, data))
        })
}

#[async_trait]
impl ImageBackend for DirectModelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectModel
    }

    async fn submit(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        on_progress: ProgressSink<'_>,
    ) -> Result<GenerationOutcome> {
        on_progress(ProgressUpdate::percent(0));

        let body = json!({
            "contents": [{ "parts": [{ "text": model_prompt(request) }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": model_aspect_ratio(request.aspect_ratio) },
            },
        });
        let options = RequestOptions::default().header("x-goog-api-key", self.api_key.as_str());
        let response: Value =
            cancellable(cancel, self.transport.post(&self.url, &body, &options)).await?;

        let image_url = extract_inline_image(&response)
            .ok_or_else(|| GenError::InvalidResponse("No image data received from the model.".into()))?;
        on_progress(ProgressUpdate::percent(100));
        Ok(GenerationOutcome::from_url(image_url))
    }
}
