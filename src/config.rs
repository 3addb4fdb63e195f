use std::time::Duration;

use crate::backend::BackendKind;
use crate::endpoint::{BuildMode, WebhookEndpoints};
use crate::error::{GenError, Result};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_MODEL_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_HISTORY_KEY: &str = "z-image-history";
pub const DEFAULT_SETTINGS_KEY: &str = "z-image-settings";

/// Configuration for the generation client.
///
/// Use [`ClientConfig::builder()`] for ergonomic construction,
/// [`ClientConfig::from_env()`] to read the process environment, or
/// [`ClientConfig::default()`] for the webhook backend in production mode.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Which backend strategy generation requests go through.
    pub backend: BackendKind,

    /// Default webhook location, selected by build mode.
    pub webhook: WebhookEndpoints,

    /// Base URL of the task server (`/api/v1/...`).
    pub api_base: String,

    /// API key for the direct model backend.
    pub api_key: Option<String>,

    /// Base URL and model name for the direct model backend.
    pub model_base: String,
    pub model: String,

    /// Delay between task status checks.
    pub poll_interval: Duration,

    /// Total polling budget; the attempt count is derived from it.
    pub poll_timeout: Duration,

    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,

    /// Rows requested by the first history load.
    pub initial_page_size: usize,

    /// Rows requested by each subsequent history load.
    pub page_size: usize,

    /// Storage keys for the persisted history and settings blobs.
    pub history_key: String,
    pub settings_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Webhook,
            webhook: WebhookEndpoints::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model_base: DEFAULT_MODEL_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: Duration::from_secs(2),
            poll_timeout: Duration::from_secs(600),
            request_timeout: Duration::from_secs(120),
            initial_page_size: 15,
            page_size: 5,
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            settings_key: DEFAULT_SETTINGS_KEY.to_string(),
        }
    }
}

impl ClientConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build a config from `ZIMAGE_*` environment variables.
    ///
    /// Unset variables keep their defaults. Unrecognized values for
    /// `ZIMAGE_BACKEND` or `ZIMAGE_MODE` are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = var("ZIMAGE_BACKEND") {
            config.backend = BackendKind::parse(&raw).ok_or_else(|| {
                GenError::InvalidConfig(format!("unknown ZIMAGE_BACKEND '{}'", raw))
            })?;
        }
        if let Some(raw) = var("ZIMAGE_MODE") {
            config.webhook.mode = BuildMode::parse(&raw).ok_or_else(|| {
                GenError::InvalidConfig(format!("unknown ZIMAGE_MODE '{}'", raw))
            })?;
        }
        if let Some(id) = var("ZIMAGE_WEBHOOK_ID") {
            config.webhook.webhook_id = id;
        }
        if let Some(base) = var("ZIMAGE_API_BASE") {
            config.api_base = base;
        }
        if let Some(model) = var("ZIMAGE_MODEL") {
            config.model = model;
        }
        config.api_key = var("GEMINI_API_KEY").or_else(|| var("API_KEY"));

        Ok(config)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Select the development or production webhook base.
    pub fn with_build_mode(mut self, mode: BuildMode) -> Self {
        self.config.webhook.mode = mode;
        self
    }

    pub fn with_webhook(mut self, webhook: WebhookEndpoints) -> Self {
        self.config.webhook = webhook;
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, base: impl Into<String>, model: impl Into<String>) -> Self {
        self.config.model_base = base.into();
        self.config.model = model.into();
        self
    }

    /// Set the delay between task status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the overall polling budget.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the initial and subsequent history page sizes.
    pub fn with_page_sizes(mut self, initial: usize, subsequent: usize) -> Self {
        self.config.initial_page_size = initial;
        self.config.page_size = subsequent;
        self
    }

    pub fn with_storage_keys(
        mut self,
        history_key: impl Into<String>,
        settings_key: impl Into<String>,
    ) -> Self {
        self.config.history_key = history_key.into();
        self.config.settings_key = settings_key.into();
        self
    }

    /// Build the final [`ClientConfig`].
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
